//! Schema node constructors and the synthesizer.
pub mod synth;

use indexmap::IndexMap;

use crate::definition::{Definition, Field, Kind};
use crate::fields;

pub use synth::Synthesizer;

/// A schema leaf of `kind` with its fixed `type`/`format` pair, plus any
/// `extra` fields (unrecognized ones are dropped by the guard).
pub fn leaf<I>(kind: Kind, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    let mut fields = discriminant(kind);
    fields.extend(extra);
    Definition::new(kind, fields)
}

fn discriminant(kind: Kind) -> Vec<(String, Field)> {
    match kind.discriminant() {
        Some((ty, Some(format))) => fields!["type" => ty, "format" => format],
        Some((ty, None)) => fields!["type" => ty],
        None => fields![],
    }
}

pub fn boolean() -> Definition {
    leaf(Kind::Boolean, fields![])
}

pub fn integer() -> Definition {
    leaf(Kind::Integer, fields![])
}

pub fn long() -> Definition {
    leaf(Kind::Long, fields![])
}

pub fn float() -> Definition {
    leaf(Kind::Float, fields![])
}

pub fn double() -> Definition {
    leaf(Kind::Double, fields![])
}

pub fn string() -> Definition {
    leaf(Kind::String, fields![])
}

pub fn byte() -> Definition {
    leaf(Kind::Byte, fields![])
}

pub fn binary() -> Definition {
    leaf(Kind::Binary, fields![])
}

pub fn date() -> Definition {
    leaf(Kind::Date, fields![])
}

pub fn time() -> Definition {
    leaf(Kind::Time, fields![])
}

pub fn date_time() -> Definition {
    leaf(Kind::DateTime, fields![])
}

pub fn password() -> Definition {
    leaf(Kind::Password, fields![])
}

pub fn email() -> Definition {
    leaf(Kind::Email, fields![])
}

/// Bare schema standing for "unknown, may be null".
pub fn nullable() -> Definition {
    Definition::new(Kind::Schema, fields!["nullable" => true])
}

/// Bare schema holding a union of `variants`.
pub fn one_of(variants: Vec<Definition>) -> Definition {
    Definition::new(Kind::Schema, fields!["oneOf" => variants])
}

/// Object with no declared properties.
pub fn open_object() -> Definition {
    leaf(Kind::Object, fields![])
}

pub fn object(properties: IndexMap<String, Definition>) -> Definition {
    leaf(Kind::Object, fields!["properties" => properties])
}

/// Object whose property names are free and whose values follow `values`.
pub fn dictionary(values: Definition) -> Definition {
    leaf(Kind::Object, fields!["additionalProperties" => values])
}

pub fn array(items: Definition) -> Definition {
    leaf(Kind::Array, fields!["items" => items])
}

pub fn reference(path: impl Into<String>) -> Definition {
    Definition::new(Kind::Reference, fields!["$ref" => path.into()])
}

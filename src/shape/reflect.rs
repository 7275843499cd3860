//! Field reflection for structured types.
use indexmap::IndexMap;

use super::{Shape, Structured};

/// Name → shape of every schema-eligible field of `structured`.
///
/// Declared fields come first, in declaration order, each described by its
/// declared type. Instance-level extras follow when they are not declared
/// already. Names with a leading underscore are private and skipped.
/// Nothing is cached; callers that need sharing memoize the result.
pub fn fields(structured: &Structured) -> IndexMap<String, Shape> {
    let mut out = structured
        .ty()
        .fields()
        .iter()
        .map(|decl| (wire_name(decl.name), decl.shape))
        .filter(|(name, _)| is_public(name))
        .map(|(name, shape)| (name.to_owned(), shape()))
        .collect::<IndexMap<_, _>>();

    for (name, shape) in structured.extras() {
        let name = wire_name(name);
        if is_public(name) && !out.contains_key(name) {
            out.insert(name.to_owned(), shape.clone());
        }
    }
    out
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}

// `stringify!(r#type)` keeps the raw-identifier prefix.
fn wire_name(name: &str) -> &str {
    name.strip_prefix("r#").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Reflect;

    #[allow(dead_code)]
    struct Hidden {
        visible: i32,
        _secret: String,
        r#type: String,
    }

    crate::reflect_struct! { Hidden { visible: i32, _secret: String, r#type: String } }

    fn structured(shape: Shape) -> Structured {
        match shape {
            Shape::Structured(structured) => structured,
            other => panic!("structured shape expected, got {other:?}"),
        }
    }

    #[test]
    fn private_fields_are_excluded() {
        let fields = fields(&structured(Hidden::shape_of()));
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["visible", "type"]);
        assert!(matches!(fields["visible"], Shape::Integer(None)));
    }

    #[test]
    fn extras_follow_declared_fields_without_overriding_them() {
        let shape = structured(Hidden::shape_of())
            .with_extra("visible", Shape::Text(Some("shadow".into())))
            .with_extra("note", Shape::Text(Some("hi".into())))
            .with_extra("_tmp", Shape::Bool(Some(true)));
        let fields = fields(&shape);
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["visible", "type", "note"]);
        assert!(matches!(fields["visible"], Shape::Integer(None)));
    }

    #[test]
    fn reflection_is_recomputed_per_call() {
        let shape = structured(Hidden::shape_of());
        assert_eq!(fields(&shape).len(), fields(&shape).len());
    }
}

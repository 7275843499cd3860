//! Schema synthesis from value shapes.
//!
//! A [`Synthesizer`] is one synthesis session. It memoizes the Object schema
//! of every structured type it has seen, keyed by `TypeId`, so a type always
//! maps to the same node within the session. The node is registered before
//! its fields are visited: self-referential and mutually referential types
//! resolve to the node under construction instead of recursing forever.
//! Instances carrying extra attributes are synthesized outside the memo.
use std::any::TypeId;
use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::{array, dictionary, leaf, nullable, object, one_of, open_object};
use crate::definition::{Definition, Field, Kind};
use crate::fields;
use crate::shape::{reflect, Elements, Entries, Reflect, Shape, Structured};

#[derive(Debug, Default)]
pub struct Synthesizer {
    objects: HashMap<TypeId, Definition>,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for one value. Scalars carry the literal as `default`.
    pub fn make<T: Reflect + ?Sized>(&mut self, value: &T) -> Definition {
        self.make_shape(value.shape())
    }

    /// Schema for a type, without any default.
    pub fn make_type<T: Reflect>(&mut self) -> Definition {
        self.make_shape(T::shape_of())
    }

    pub fn make_shape(&mut self, shape: Shape) -> Definition {
        trace!(?shape, "synthesizing");
        match shape {
            Shape::Schema(definition) => definition,
            Shape::Null => nullable(),
            Shape::Bool(literal) => leaf(Kind::Boolean, defaulted(literal)),
            Shape::Integer(literal) => leaf(Kind::Integer, defaulted(literal)),
            Shape::Float(literal) => leaf(Kind::Float, defaulted(literal)),
            Shape::Text(literal) => leaf(Kind::String, defaulted(literal)),
            Shape::Bytes => leaf(Kind::Byte, fields![]),
            Shape::ByteBuffer => leaf(Kind::Binary, fields![]),
            Shape::Date => leaf(Kind::Date, fields![]),
            Shape::Time => leaf(Kind::Time, fields![]),
            Shape::DateTime => leaf(Kind::DateTime, fields![]),
            Shape::AnyObject => open_object(),
            Shape::Sequence(elements) => array(self.items(elements)),
            Shape::Range(bounds) => array(bounded_integer(bounds)),
            Shape::Mapping(entries) => self.mapping(entries),
            Shape::Structured(structured) => self.structured(structured),
        }
    }

    /// Memoized schema of `T`, if this session has synthesized it.
    pub fn cached<T: 'static>(&self) -> Option<&Definition> {
        self.objects.get(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Start a new session: forget every memoized type.
    pub fn reset(&mut self) {
        debug!(cached = self.objects.len(), "resetting synthesis session");
        self.objects.clear();
    }

    fn items(&mut self, elements: Elements) -> Definition {
        match elements {
            Elements::Unknown => nullable(),
            Elements::Of(element) => self.make_shape(*element),
            Elements::Values(mut values) if values.len() <= 1 => {
                values.pop().map_or_else(nullable, |only| self.make_shape(only))
            }
            Elements::Values(values) => {
                let mut variants: Vec<Definition> = Vec::with_capacity(values.len());
                for value in values {
                    let variant = self.make_shape(value);
                    if !variants.contains(&variant) {
                        variants.push(variant);
                    }
                }
                one_of(variants)
            }
        }
    }

    fn mapping(&mut self, entries: Entries) -> Definition {
        match entries {
            Entries::Open => open_object(),
            Entries::Of(value) => dictionary(self.make_shape(*value)),
            Entries::Values(values) => object(
                values
                    .into_iter()
                    .map(|(name, value)| (name, self.make_shape(value)))
                    .collect(),
            ),
        }
    }

    fn structured(&mut self, structured: Structured) -> Definition {
        let ty = *structured.ty();
        if !structured.extras().is_empty() {
            // Instance attributes must not leak into the type's canonical node.
            debug!(ty = ty.name(), extras = structured.extras().len(), "synthesizing instance outside the memo");
            let properties = self.properties(&structured);
            return Definition::new(Kind::Object, object_fields(properties));
        }
        if let Some(hit) = self.objects.get(&ty.id()) {
            debug!(ty = ty.name(), "reusing memoized object schema");
            return hit.clone();
        }

        let node = Definition::placeholder(Kind::Object, ty.name());
        self.objects.insert(ty.id(), node.clone());
        debug!(ty = ty.name(), "registered object placeholder");

        let properties = self.properties(&structured);
        node.fill(object_fields(properties));
        node
    }

    fn properties(&mut self, structured: &Structured) -> IndexMap<String, Definition> {
        reflect::fields(structured)
            .into_iter()
            .map(|(name, shape)| (name, self.make_shape(shape)))
            .collect()
    }
}

fn object_fields(properties: IndexMap<String, Definition>) -> Vec<(String, Field)> {
    fields!["type" => "object", "properties" => properties]
}

fn defaulted<T>(literal: Option<T>) -> Vec<(String, Field)>
where
    Field: From<T>,
{
    literal.map_or_else(Vec::new, |value| fields!["default" => value])
}

fn bounded_integer(bounds: Option<(i64, i64)>) -> Definition {
    match bounds {
        Some((min, max)) => leaf(Kind::Integer, fields!["minimum" => min, "maximum" => max]),
        None => leaf(Kind::Integer, fields![]),
    }
}

// ------------------------------- Tests ------------------------------------ //

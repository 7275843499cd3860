//! Named, referenceable component registries.
//!
//! Registration is explicit and last write wins. [`ComponentsBuilder::maybe_ref`]
//! is the only place where inline type occurrences become `$ref` pointers.
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::definition::{Definition, Field, Fields, Kind};
use crate::schema::{self, Synthesizer};
use crate::shape::{Reflect, Shape};

/// Component section, one per `#/components/<segment>` pointer prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
}

impl Category {
    pub const ALL: [Self; 9] = [
        Self::Schemas,
        Self::Responses,
        Self::Parameters,
        Self::Examples,
        Self::RequestBodies,
        Self::Headers,
        Self::SecuritySchemes,
        Self::Links,
        Self::Callbacks,
    ];

    pub const fn segment(self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::Responses => "responses",
            Self::Parameters => "parameters",
            Self::Examples => "examples",
            Self::RequestBodies => "requestBodies",
            Self::Headers => "headers",
            Self::SecuritySchemes => "securitySchemes",
            Self::Links => "links",
            Self::Callbacks => "callbacks",
        }
    }

    /// Reference path of `name` inside this section.
    pub fn path(self, name: &str) -> String {
        format!("#/components/{}/{name}", self.segment())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

#[derive(Debug, Default)]
pub struct ComponentsBuilder {
    sections: BTreeMap<Category, IndexMap<String, Definition>>,
}

impl ComponentsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, category: Category, name: impl Into<String>, definition: Definition) {
        let name = name.into();
        let section = self.sections.entry(category).or_default();
        if section.contains_key(&name) {
            debug!(%category, %name, "replacing registered component");
        }
        section.insert(name, definition);
    }

    pub fn schema(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Schemas, name, definition);
    }

    pub fn response(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Responses, name, definition);
    }

    pub fn parameter(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Parameters, name, definition);
    }

    pub fn example(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Examples, name, definition);
    }

    pub fn request_body(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::RequestBodies, name, definition);
    }

    pub fn header(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Headers, name, definition);
    }

    pub fn security(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::SecuritySchemes, name, definition);
    }

    pub fn link(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Links, name, definition);
    }

    pub fn callback(&mut self, name: impl Into<String>, definition: Definition) {
        self.register(Category::Callbacks, name, definition);
    }

    /// Synthesize `T` and register it under its reflected name. Types
    /// without a name (non-structured) are registered under their Rust
    /// type name.
    pub fn register_type<T: Reflect>(&mut self, category: Category, synth: &mut Synthesizer) -> String {
        let shape = T::shape_of();
        let name = shape.type_name().map_or_else(short_type_name::<T>, str::to_owned);
        let definition = synth.make_shape(shape);
        self.register(category, name.clone(), definition);
        name
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&Definition> {
        self.sections.get(&category).and_then(|section| section.get(name))
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.get(category, name).is_some()
    }

    /// Name `definition` (the node itself, not an equal one) is registered
    /// under in `category`.
    pub fn name_of(&self, category: Category, definition: &Definition) -> Option<&str> {
        self.sections
            .get(&category)?
            .iter()
            .find(|(_, registered)| registered.ptr_eq(definition))
            .map(|(name, _)| name.as_str())
    }

    /// `base`, or `base` with the smallest numeric suffix from 2 that is not
    /// registered in `category` yet.
    pub fn unused_name(&self, category: Category, base: &str) -> String {
        if !self.contains(category, base) {
            return base.to_owned();
        }
        let mut suffix = 2_usize;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.contains(category, &candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Every registered node, section by section.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.sections.values().flat_map(IndexMap::values)
    }

    /// Replace a structured type token registered under `category` with a
    /// reference to it. Everything else passes through unchanged.
    pub fn maybe_ref(&self, category: Category, shape: Shape) -> Shape {
        if !shape.is_type_token() {
            return shape;
        }
        match shape.type_name() {
            Some(name) if self.contains(category, name) => {
                Shape::Schema(schema::reference(category.path(name)))
            }
            _ => shape,
        }
    }

    /// Reference node for an already registered `name`.
    pub fn reference_to(&self, category: Category, name: &str) -> Option<Definition> {
        self.contains(category, name)
            .then(|| schema::reference(category.path(name)))
    }

    pub fn build(&self) -> Definition {
        let fields = self.sections.iter().map(|(category, section)| {
            let entries = section
                .iter()
                .map(|(name, definition)| (name.clone(), Field::from(definition.clone())))
                .collect::<Fields>();
            (category.segment().to_owned(), Field::Map(entries))
        });
        Definition::new(Kind::Components, fields)
    }
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect_struct;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[allow(dead_code)]
    struct Pet {
        name: String,
    }

    #[allow(dead_code)]
    struct Owner {
        pet: Pet,
    }

    reflect_struct! {
        Pet { name: String }
        Owner { pet: Pet }
    }

    #[test]
    fn paths_use_section_segments() {
        assert_eq!(Category::Schemas.path("Pet"), "#/components/schemas/Pet");
        assert_eq!(Category::RequestBodies.path("New"), "#/components/requestBodies/New");
        assert_eq!(Category::SecuritySchemes.to_string(), "securitySchemes");
    }

    #[test]
    fn maybe_ref_substitutes_registered_tokens_only() {
        let mut components = ComponentsBuilder::new();
        let mut synth = Synthesizer::new();
        assert_eq!(components.register_type::<Pet>(Category::Schemas, &mut synth), "Pet");

        let Shape::Schema(reference) = components.maybe_ref(Category::Schemas, Pet::shape_of()) else {
            panic!("reference expected");
        };
        assert_eq!(reference.to_value(), json!({"$ref": "#/components/schemas/Pet"}));

        let instance = Pet { name: "rex".into() }.shape();
        assert!(matches!(
            components.maybe_ref(Category::Schemas, instance),
            Shape::Structured(_)
        ));
        assert!(matches!(
            components.maybe_ref(Category::Schemas, Owner::shape_of()),
            Shape::Structured(_)
        ));
        assert!(matches!(
            components.maybe_ref(Category::Responses, Pet::shape_of()),
            Shape::Structured(_)
        ));
        assert!(matches!(
            components.maybe_ref(Category::Schemas, Shape::of::<i32>()),
            Shape::Integer(None)
        ));
    }

    #[test]
    fn last_registration_wins() {
        let mut components = ComponentsBuilder::new();
        components.schema("Id", schema::integer());
        components.schema("Id", schema::long());
        assert_eq!(components.get(Category::Schemas, "Id"), Some(&schema::long()));
    }

    #[test]
    fn reference_to_requires_registration() {
        let mut components = ComponentsBuilder::new();
        assert!(components.reference_to(Category::Schemas, "Pet").is_none());
        components.schema("Pet", schema::open_object());
        let reference = components.reference_to(Category::Schemas, "Pet").unwrap();
        assert_eq!(reference.kind(), Kind::Reference);
    }

    #[test]
    fn build_groups_by_section() {
        let mut components = ComponentsBuilder::new();
        components.security("bearer", Definition::new(Kind::SecurityScheme, crate::fields!["type" => "http", "scheme" => "bearer"]));
        components.schema("Id", schema::integer());
        assert_eq!(
            components.build().to_value(),
            json!({
                "schemas": {"Id": {"type": "integer", "format": "int32"}},
                "securitySchemes": {"bearer": {"type": "http", "scheme": "bearer"}},
            })
        );
    }

    #[test]
    fn payload_registries_serialize_under_their_sections() {
        use crate::document;

        let mut components = ComponentsBuilder::new();
        components.example(
            "rex",
            document::example(json!({"name": "rex"}), crate::fields!["summary" => "A dog", "origin" => "x"]),
        );
        components.header(
            "RateLimit",
            document::header(schema::integer(), crate::fields!["description" => "Calls left", "required" => true]),
        );
        components.link(
            "owner",
            document::link(crate::fields!["operationId" => "getOwner", "target" => "dropped"]),
        );
        let hook = document::operation(crate::fields!["operationId" => "onEvent"]);
        components.callback(
            "onEvent",
            document::path_item(IndexMap::from([("post".to_owned(), hook)]), crate::fields![]),
        );

        assert_eq!(
            components.build().to_value(),
            json!({
                "examples": {"rex": {"summary": "A dog", "value": {"name": "rex"}}},
                "headers": {"RateLimit": {
                    "description": "Calls left",
                    "required": true,
                    "schema": {"type": "integer", "format": "int32"},
                }},
                "links": {"owner": {"operationId": "getOwner"}},
                "callbacks": {"onEvent": {"post": {"operationId": "onEvent"}}},
            })
        );
    }

    #[test]
    fn recursive_helpers_find_nodes_and_free_names() {
        let mut components = ComponentsBuilder::new();
        let id = schema::integer();
        components.schema("Id", id.clone());
        assert_eq!(components.name_of(Category::Schemas, &id), Some("Id"));
        assert_eq!(components.name_of(Category::Schemas, &schema::integer()), None);
        assert_eq!(components.name_of(Category::Headers, &id), None);
        assert_eq!(components.unused_name(Category::Schemas, "Tree"), "Tree");
        components.schema("Id2", schema::long());
        assert_eq!(components.unused_name(Category::Schemas, "Id"), "Id3");
        assert_eq!(components.definitions().count(), 2);
    }

    #[test]
    fn unnamed_types_register_under_their_rust_name() {
        let mut components = ComponentsBuilder::new();
        let mut synth = Synthesizer::new();
        let name = components.register_type::<Vec<String>>(Category::Schemas, &mut synth);
        assert_eq!(name, "Vec");
    }
}

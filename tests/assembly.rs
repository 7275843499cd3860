//! End-to-end document assembly through the public API.
use openapi_synth::builders::{Content, OperationBuilder, SpecificationBuilder};
use openapi_synth::document::Location;
use openapi_synth::shape::{Reflect, Shape};
use openapi_synth::{fields, reflect_struct, Category, ComponentsBuilder, Synthesizer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[allow(dead_code)]
struct Species {
    name: String,
    parent: Option<Box<Species>>,
}

#[allow(dead_code)]
struct Pet {
    id: i64,
    name: String,
    tags: Vec<String>,
    category: Species,
}

#[allow(dead_code)]
struct Tree {
    label: String,
    children: Vec<Tree>,
}

#[allow(dead_code)]
struct ApiError {
    code: i32,
    message: String,
}

reflect_struct! {
    Species { name: String, parent: Option<Box<Species>> }
    Pet { id: i64, name: String, tags: Vec<String>, category: Species }
    Tree { label: String, children: Vec<Tree> }
    ApiError { code: i32, message: String }
}

fn collect_refs<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(entries) => {
            if let Some(Value::String(target)) = entries.get("$ref") {
                out.push(target);
            }
            entries.values().for_each(|entry| collect_refs(entry, out));
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

fn assert_refs_resolve(doc: &Value) {
    let mut refs = Vec::new();
    collect_refs(doc, &mut refs);
    assert!(!refs.is_empty());
    for target in refs {
        let pointer = target.strip_prefix('#').unwrap();
        assert!(doc.pointer(pointer).is_some(), "dangling reference {target}");
    }
}

fn tree_schema(reference: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "label": {"type": "string"},
            "children": {"type": "array", "items": {"$ref": reference}},
        },
    })
}

fn pet_store() -> SpecificationBuilder {
    let mut spec = SpecificationBuilder::new(ComponentsBuilder::new());
    spec.describe("Pet Store", "1.0.0", Some("A sample store"), Some("https://example.com/terms"))
        .contact(Some("API team"), None, Some("api@example.com"))
        .license("Apache 2.0", Some("https://www.apache.org/licenses/LICENSE-2.0"))
        .server("https://petstore.example.com/v1", fields!["description" => "production"]);
    spec.register_schema::<Pet>();
    spec.register_schema::<ApiError>();
    spec.components_mut().security(
        "bearer",
        openapi_synth::document::security_scheme("http", fields!["scheme" => "bearer", "bearerFormat" => "JWT"]),
    );

    spec.operation(
        "/pets",
        "GET",
        OperationBuilder::new()
            .name("listPets")
            .describe(Some("List all pets"), None)
            .tag(["pets"])
            .parameter("limit", Shape::of::<i32>(), Location::Query, fields!["description" => "page size"])
            .response("200", Content::of::<Vec<Pet>>(), Some("A page of pets"), vec![])
            .response("default", Content::of::<ApiError>(), Some("unexpected error"), vec![]),
    );
    spec.operation(
        "/pets/{petId}",
        "get",
        OperationBuilder::new()
            .tag(["pets"])
            .secured([("bearer", vec![])])
            .response("200", Content::of::<Pet>(), None, vec![]),
    );
    spec.operation(
        "/pets",
        "post",
        OperationBuilder::new()
            .tag(["pets", "admin"])
            .body(
                Content::Empty.with_media("application/json", Pet::shape_of()),
                fields!["required" => true],
            )
            .response("201", Content::Empty, Some("Created"), vec![]),
    );
    spec
}

#[test]
fn pet_store_document() {
    let doc = pet_store().build().to_value();

    assert_eq!(doc["openapi"], json!("3.0.0"));
    assert_eq!(
        doc["info"],
        json!({
            "title": "Pet Store",
            "description": "A sample store",
            "termsOfService": "https://example.com/terms",
            "contact": {"name": "API team", "email": "api@example.com"},
            "license": {"name": "Apache 2.0", "url": "https://www.apache.org/licenses/LICENSE-2.0"},
            "version": "1.0.0",
        })
    );
    assert_eq!(
        doc["servers"],
        json!([{"url": "https://petstore.example.com/v1", "description": "production"}])
    );
    assert_eq!(doc["tags"], json!([{"name": "pets"}, {"name": "admin"}]));

    let list = &doc["paths"]["/pets"]["get"];
    assert_eq!(list["operationId"], json!("listPets"));
    assert_eq!(
        list["responses"]["200"]["content"]["*/*"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/Pet"}})
    );
    assert_eq!(
        list["responses"]["default"]["content"]["*/*"]["schema"],
        json!({"$ref": "#/components/schemas/ApiError"})
    );

    let fetch = &doc["paths"]["/pets/{petId}"]["get"];
    assert_eq!(fetch["operationId"], json!("/pets/{petId}.get"));
    assert_eq!(fetch["security"], json!([{"bearer": []}]));
    assert_eq!(
        fetch["parameters"],
        json!([{"name": "petId", "schema": {"type": "string"}, "in": "path", "required": true}])
    );
    assert_eq!(fetch["responses"]["200"]["description"], json!("Default Response"));

    let create = &doc["paths"]["/pets"]["post"];
    assert_eq!(
        create["requestBody"],
        json!({
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}},
            "required": true,
        })
    );
    assert_eq!(create["responses"]["201"], json!({"description": "Created"}));
}

#[test]
fn registered_components_are_written_inline_once() {
    let doc = pet_store().build().to_value();
    let schemas = &doc["components"]["schemas"];
    assert_eq!(
        schemas["Pet"],
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "format": "int32"},
                "name": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "category": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "parent": {"$ref": "#/components/schemas/Species"},
                    },
                },
            },
        })
    );
    assert_eq!(
        schemas["Species"],
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "parent": {"$ref": "#/components/schemas/Species"},
            },
        })
    );
    assert_eq!(
        schemas.as_object().unwrap().keys().collect::<Vec<_>>(),
        ["Pet", "ApiError", "Species"]
    );
    assert_refs_resolve(&doc);
    assert_eq!(
        doc["components"]["securitySchemes"]["bearer"],
        json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
    );
}

#[test]
fn serialization_is_stable() {
    let spec = pet_store().build();
    assert_eq!(spec.to_value(), spec.to_value());
    assert_eq!(spec.to_string(), serde_json::to_string(&spec).unwrap());
}

#[test]
fn standalone_components_resolve_references() {
    let mut synth = Synthesizer::new();
    let mut components = ComponentsBuilder::new();
    components.register_type::<ApiError>(Category::Schemas, &mut synth);

    let substituted = components.maybe_ref(Category::Schemas, ApiError::shape_of());
    assert_eq!(
        synth.make_shape(substituted).to_value(),
        json!({"$ref": "#/components/schemas/ApiError"})
    );

    let inline = components.maybe_ref(Category::Schemas, ApiError { code: 1, message: "x".into() }.shape());
    assert_eq!(
        synth.make_shape(inline).to_value(),
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "integer", "format": "int32"},
                "message": {"type": "string"},
            },
        })
    );
}

#[test]
fn inline_recursive_types_gain_a_schema_component() {
    let mut spec = SpecificationBuilder::default();
    spec.operation(
        "/trees",
        "get",
        OperationBuilder::new().response("200", Content::of::<Tree>(), None, vec![]),
    );
    let doc = spec.build().to_value();

    assert_eq!(doc["components"]["schemas"]["Tree"], tree_schema("#/components/schemas/Tree"));
    assert_eq!(
        doc["paths"]["/trees"]["get"]["responses"]["200"]["content"]["*/*"]["schema"],
        tree_schema("#/components/schemas/Tree")
    );
    assert_refs_resolve(&doc);
}

#[test]
fn recursive_types_point_at_their_registered_name() {
    let mut spec = SpecificationBuilder::default();
    let tree = spec.synthesizer_mut().make_type::<Tree>();
    spec.components_mut().schema("Node", tree);
    spec.operation(
        "/nodes",
        "get",
        OperationBuilder::new().response("200", Content::of::<Tree>(), None, vec![]),
    );
    let doc = spec.build().to_value();

    let schemas = &doc["components"]["schemas"];
    assert_eq!(schemas.as_object().unwrap().keys().collect::<Vec<_>>(), ["Node"]);
    assert_eq!(schemas["Node"], tree_schema("#/components/schemas/Node"));
    assert_eq!(
        doc["paths"]["/nodes"]["get"]["responses"]["200"]["content"]["*/*"]["schema"],
        tree_schema("#/components/schemas/Node")
    );
    assert_refs_resolve(&doc);
}

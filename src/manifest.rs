//! JSON manifests: a whole document described by example payloads.
//!
//! ```json
//! {
//!   "info": {"title": "Pets", "version": "1.0.0"},
//!   "components": {"schemas": {"Pet": {"id": 1, "name": "rex"}}},
//!   "paths": {
//!     "/pets/{id}": {
//!       "get": {"responses": {"200": {"content": {"$component": "Pet"}}}}
//!     }
//!   }
//! }
//! ```
//!
//! A payload is an example value, `{"$component": "Name"}` for a declared
//! schema, or `{"$media": {"application/json": <payload>}}` to pick media
//! types explicitly.
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::builders::{Content, Extra, OperationBuilder, SecurityRequirement, SpecificationBuilder};
use crate::components::{Category, ComponentsBuilder};
use crate::definition::Definition;
use crate::document::{self, Location};
use crate::error::{Error, Result};
use crate::fields;
use crate::path_de;
use crate::schema;
use crate::shape::Shape;

const COMPONENT_KEY: &str = "$component";
const MEDIA_KEY: &str = "$media";

// ————————————————————————————————————————————————————————————————————————————
// FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub info: InfoSpec,
    #[serde(default)]
    pub servers: Vec<ServerSpec>,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    pub external_docs: Option<ExternalDocsSpec>,
    #[serde(default)]
    pub components: ComponentsSpec,
    #[serde(default)]
    pub paths: IndexMap<String, IndexMap<String, OperationSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoSpec {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<ContactSpec>,
    pub license: Option<LicenseSpec>,
}

impl Default for InfoSpec {
    fn default() -> Self {
        Self {
            title: crate::builders::DEFAULT_TITLE.to_owned(),
            version: crate::builders::DEFAULT_VERSION.to_owned(),
            description: None,
            terms_of_service: None,
            contact: None,
            license: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSpec {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseSpec {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalDocsSpec {
    pub url: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSpec {
    pub url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub variables: IndexMap<String, ServerVariableSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerVariableSpec {
    pub default: String,
    #[serde(default, rename = "enum")]
    pub values: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSpec {
    pub name: String,
    pub description: Option<String>,
    pub external_docs: Option<ExternalDocsSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsSpec {
    /// Schema name → example value.
    #[serde(default)]
    pub schemas: IndexMap<String, Value>,
    #[serde(default)]
    pub security_schemes: IndexMap<String, SecuritySchemeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySchemeSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub location: Option<Location>,
    pub open_id_connect_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSpec {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    pub external_docs: Option<ExternalDocsSpec>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Option<RequestBodySpec>,
    #[serde(default)]
    pub responses: IndexMap<String, ResponseSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default, rename = "in")]
    pub location: Location,
    /// Example value; the parameter schema is synthesized from it. Strings
    /// when absent.
    pub example: Option<Value>,
    pub description: Option<String>,
    pub required: Option<bool>,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBodySpec {
    pub content: Option<Value>,
    pub description: Option<String>,
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseSpec {
    pub description: Option<String>,
    pub content: Option<Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl Manifest {
    pub fn parse(origin: &str, src: &str) -> Result<Self> {
        path_de::from_str_with_path(origin, src)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let manifest = Self::parse(&path.to_string_lossy(), &src)?;
        info!(
            path = %path.display(),
            schemas = manifest.components.schemas.len(),
            paths = manifest.paths.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Assemble the document. Fails only on `$component` payloads naming
    /// schemas the manifest does not declare.
    pub fn build(&self) -> Result<Definition> {
        let mut spec = SpecificationBuilder::new(ComponentsBuilder::new());

        for (name, example) in &self.components.schemas {
            let definition = spec.synthesizer_mut().make(example);
            spec.components_mut().schema(name.clone(), definition);
        }
        for (name, scheme) in &self.components.security_schemes {
            spec.components_mut().security(name.clone(), scheme.build());
        }

        let info = &self.info;
        spec.describe(
            &info.title,
            &info.version,
            info.description.as_deref(),
            info.terms_of_service.as_deref(),
        );
        if let Some(contact) = &info.contact {
            spec.contact(contact.name.as_deref(), contact.url.as_deref(), contact.email.as_deref());
        }
        if let Some(license) = &info.license {
            spec.license(&license.name, license.url.as_deref());
        }
        if let Some(docs) = &self.external_docs {
            spec.document(&docs.url, docs.description.as_deref());
        }
        for server in &self.servers {
            spec.server(&server.url, server.extra());
        }
        for tag in &self.tags {
            spec.tag(&tag.name, tag.extra());
        }
        for requirement in &self.security {
            spec.secured(requirement.clone());
        }

        for (path, methods) in &self.paths {
            for (method, operation) in methods {
                let at = format!("paths.{path}.{method}");
                let builder = operation.builder(spec.components(), &at)?;
                debug!(%path, %method, "mounting operation");
                spec.operation(path, method, builder);
            }
        }

        Ok(spec.build())
    }
}

impl ServerSpec {
    fn extra(&self) -> Extra {
        let variables = self
            .variables
            .iter()
            .map(|(name, variable)| {
                let node = document::server_variable(
                    &variable.default,
                    fields![
                        "enum" => variable.values.clone(),
                        "description" => variable.description.clone(),
                    ],
                );
                (name.clone(), node)
            })
            .collect::<IndexMap<_, _>>();
        fields!["description" => self.description.clone(), "variables" => variables]
    }
}

impl TagSpec {
    fn extra(&self) -> Extra {
        fields![
            "description" => self.description.clone(),
            "externalDocs" => self.external_docs.as_ref().map(ExternalDocsSpec::build),
        ]
    }
}

impl ExternalDocsSpec {
    fn build(&self) -> Definition {
        document::external_docs(&self.url, self.description.as_deref())
    }
}

impl SecuritySchemeSpec {
    fn build(&self) -> Definition {
        document::security_scheme(
            &self.kind,
            fields![
                "description" => self.description.clone(),
                "scheme" => self.scheme.clone(),
                "bearerFormat" => self.bearer_format.clone(),
                "name" => self.name.clone(),
                "location" => self.location,
                "openIdConnectUrl" => self.open_id_connect_url.clone(),
            ],
        )
    }
}

impl OperationSpec {
    fn builder(&self, components: &ComponentsBuilder, at: &str) -> Result<OperationBuilder> {
        let mut builder = OperationBuilder::new()
            .describe(self.summary.as_deref(), self.description.as_deref())
            .tag(self.tags.iter().cloned());
        if let Some(operation_id) = &self.operation_id {
            builder = builder.name(operation_id.clone());
        }
        if self.deprecated {
            builder = builder.deprecate();
        }
        if let Some(docs) = &self.external_docs {
            builder = builder.document(&docs.url, docs.description.as_deref());
        }
        for requirement in &self.security {
            builder = builder.secured(requirement.clone());
        }

        for parameter in &self.parameters {
            let shape = parameter
                .example
                .as_ref()
                .map_or_else(|| Shape::Schema(schema::string()), Shape::from_value);
            let extra = fields![
                "description" => parameter.description.clone(),
                "required" => parameter.required,
                "deprecated" => parameter.deprecated,
            ];
            builder = builder.parameter(parameter.name.clone(), shape, parameter.location, extra);
        }

        if let Some(body) = &self.request_body {
            let content = payload(components, body.content.as_ref(), &format!("{at}.requestBody"))?;
            let extra = fields![
                "description" => body.description.clone(),
                "required" => body.required,
            ];
            builder = builder.body(content, extra);
        }

        for (status, response) in &self.responses {
            let content = payload(
                components,
                response.content.as_ref(),
                &format!("{at}.responses.{status}"),
            )?;
            builder = builder.response(status.clone(), content, response.description.as_deref(), fields![]);
        }
        Ok(builder)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PAYLOADS
// ————————————————————————————————————————————————————————————————————————————

fn payload(components: &ComponentsBuilder, value: Option<&Value>, at: &str) -> Result<Content> {
    let Some(value) = value else {
        return Ok(Content::Empty);
    };
    if let Some(by_media) = single_key(value, MEDIA_KEY).and_then(Value::as_object) {
        let mut shapes = IndexMap::with_capacity(by_media.len());
        for (media, inner) in by_media {
            shapes.insert(media.clone(), shape(components, inner, &format!("{at}.{media}"))?);
        }
        return Ok(Content::ByMedia(shapes));
    }
    Ok(Content::Single(shape(components, value, at)?))
}

fn shape(components: &ComponentsBuilder, value: &Value, at: &str) -> Result<Shape> {
    match single_key(value, COMPONENT_KEY).and_then(Value::as_str) {
        Some(name) => components
            .reference_to(Category::Schemas, name)
            .map(Shape::Schema)
            .ok_or_else(|| Error::UnknownComponent { name: name.to_owned(), at: at.to_owned() }),
        None => Ok(Shape::from_value(value)),
    }
}

// `{"<key>": x}` and nothing else.
fn single_key<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    value
        .as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(manifest: Value) -> Result<Value> {
        let manifest = Manifest::parse("test.json", &manifest.to_string())?;
        Ok(manifest.build()?.to_value())
    }

    #[test]
    fn components_are_synthesized_from_examples() {
        let doc = build(json!({
            "info": {"title": "Pets", "version": "2.0"},
            "components": {"schemas": {"Pet": {"id": 1, "name": "rex"}}},
        }))
        .unwrap();
        assert_eq!(
            doc["components"]["schemas"]["Pet"],
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "format": "int32", "default": 1},
                    "name": {"type": "string", "default": "rex"},
                },
            })
        );
        assert_eq!(doc["info"], json!({"title": "Pets", "version": "2.0"}));
    }

    #[test]
    fn component_payloads_become_references() {
        let doc = build(json!({
            "components": {"schemas": {"Pet": {"name": "rex"}}},
            "paths": {"/pets": {"post": {
                "requestBody": {"content": {"$media": {"application/json": {"$component": "Pet"}}}, "required": true},
                "responses": {"201": {"content": {"$component": "Pet"}}},
            }}},
        }))
        .unwrap();
        let post = &doc["paths"]["/pets"]["post"];
        assert_eq!(
            post["requestBody"],
            json!({
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}},
                "required": true,
            })
        );
        assert_eq!(
            post["responses"]["201"],
            json!({
                "content": {"*/*": {"schema": {"$ref": "#/components/schemas/Pet"}}},
                "description": "Default Response",
            })
        );
    }

    #[test]
    fn unknown_components_are_reported_with_their_location() {
        let err = build(json!({
            "paths": {"/x": {"get": {"responses": {"200": {"content": {"$component": "Ghost"}}}}}},
        }))
        .unwrap_err();
        let Error::UnknownComponent { name, at } = &err else {
            panic!("unknown component expected, got {err:?}");
        };
        assert_eq!(name, "Ghost");
        assert_eq!(at, "paths./x.get.responses.200");
    }

    #[test]
    fn parameters_and_security_schemes_use_in() {
        let doc = build(json!({
            "components": {"securitySchemes": {"key": {"type": "apiKey", "name": "X-Key", "in": "header"}}},
            "security": [{"key": []}],
            "paths": {"/items/{id}": {"GET": {
                "parameters": [{"name": "q", "example": "abc"}],
            }}},
        }))
        .unwrap();
        assert_eq!(
            doc["components"]["securitySchemes"]["key"],
            json!({"type": "apiKey", "name": "X-Key", "in": "header"})
        );
        assert_eq!(doc["security"], json!([{"key": []}]));
        let get = &doc["paths"]["/items/{id}"]["get"];
        assert_eq!(get["operationId"], json!("/items/{id}.get"));
        assert_eq!(
            get["parameters"],
            json!([
                {"name": "q", "schema": {"type": "string", "default": "abc"}, "in": "query"},
                {"name": "id", "schema": {"type": "string"}, "in": "path", "required": true},
            ])
        );
    }

    #[test]
    fn structural_errors_carry_the_json_path() {
        let err = Manifest::parse("m.json", r#"{"servers": [{"url": 3}]}"#).unwrap_err();
        let Error::Json { path, .. } = &err else {
            panic!("json error expected, got {err:?}");
        };
        assert_eq!(path, "servers[0].url");
    }

    #[test]
    fn servers_keep_their_variables() {
        let doc = build(json!({
            "servers": [{"url": "https://{env}.example.com", "variables": {"env": {"default": "prod", "enum": ["prod", "dev"]}}}],
        }))
        .unwrap();
        assert_eq!(
            doc["servers"],
            json!([{"url": "https://{env}.example.com", "variables": {"env": {"enum": ["prod", "dev"], "default": "prod"}}}])
        );
    }
}

//! Factories for OpenAPI 3.0 document nodes.
//!
//! Each factory takes the node's required parts positionally and everything
//! optional as `extra` fields, which go through the same field guard as any
//! other definition: names the kind does not know are dropped.
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{Definition, Field, Kind};
use crate::fields;

/// Version written into every document.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Description given to responses that do not provide one.
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Default Response";

/// Where a parameter or API key lives. Serialized under the `in` key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Query,
    Header,
    Path,
    Cookie,
}

impl Location {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Header => "header",
            Self::Path => "path",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Location> for Field {
    fn from(value: Location) -> Self {
        Field::from(value.as_str())
    }
}

fn with<I>(kind: Kind, mut head: Vec<(String, Field)>, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    head.extend(extra);
    Definition::new(kind, head)
}

// ------------------------------- Info ------------------------------------- //

pub fn contact(name: Option<&str>, url: Option<&str>, email: Option<&str>) -> Definition {
    Definition::new(Kind::Contact, fields!["name" => name, "url" => url, "email" => email])
}

pub fn license(name: &str, url: Option<&str>) -> Definition {
    Definition::new(Kind::License, fields!["name" => name, "url" => url])
}

/// `extra`: description, termsOfService, contact, license.
pub fn info<I>(title: &str, version: &str, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::Info, fields!["title" => title, "version" => version], extra)
}

pub fn external_docs(url: &str, description: Option<&str>) -> Definition {
    Definition::new(
        Kind::ExternalDocumentation,
        fields!["url" => url, "description" => description],
    )
}

pub fn tag<I>(name: &str, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::Tag, fields!["name" => name], extra)
}

pub fn server_variable<I>(default: &str, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::ServerVariable, fields!["default" => default], extra)
}

pub fn server<I>(url: &str, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::Server, fields!["url" => url], extra)
}

// ------------------------------ Payloads ---------------------------------- //

pub fn example<I>(value: Value, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::Example, fields!["value" => value], extra)
}

pub fn media_type<I>(schema: Definition, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::MediaType, fields!["schema" => schema], extra)
}

/// A response. `content` maps media types to [`media_type`] nodes; an empty
/// map leaves the response without content.
pub fn response<I>(content: IndexMap<String, Definition>, description: Option<&str>, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    let description = description
        .filter(|text| !text.is_empty())
        .unwrap_or(DEFAULT_RESPONSE_DESCRIPTION);
    with(
        Kind::Response,
        fields!["content" => content, "description" => description],
        extra,
    )
}

pub fn request_body<I>(content: IndexMap<String, Definition>, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::RequestBody, fields!["content" => content], extra)
}

// ----------------------------- Parameters --------------------------------- //

/// A parameter. Path parameters are always required.
pub fn parameter<I>(name: &str, schema: Definition, location: Location, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    let mut fields = fields!["name" => name, "schema" => schema, "location" => location];
    fields.extend(extra);
    if location == Location::Path {
        fields.push(("required".to_owned(), Field::from(true)));
    }
    Definition::new(Kind::Parameter, fields)
}

pub fn header<I>(schema: Definition, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::Header, fields!["schema" => schema], extra)
}

/// `extra`: operationRef, operationId, parameters, requestBody, description, server.
pub fn link<I>(extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    Definition::new(Kind::Link, extra)
}

/// `extra`: description, name, location, scheme, bearerFormat, flows,
/// openIdConnectUrl.
pub fn security_scheme<I>(ty: &str, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(Kind::SecurityScheme, fields!["type" => ty], extra)
}

// ------------------------------ Structure --------------------------------- //

pub fn operation<I>(fields: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    Definition::new(Kind::Operation, fields)
}

/// `operations` maps lowercase HTTP methods to operations. Methods a path
/// item cannot hold are dropped.
pub fn path_item<I>(operations: IndexMap<String, Definition>, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    let head = operations
        .into_iter()
        .map(|(method, operation)| (method, Field::from(operation)))
        .collect();
    with(Kind::PathItem, head, extra)
}

/// The document root. `extra`: servers, components, security, tags,
/// externalDocs.
pub fn openapi<I>(info: Definition, paths: IndexMap<String, Definition>, extra: I) -> Definition
where
    I: IntoIterator<Item = (String, Field)>,
{
    with(
        Kind::OpenApi,
        fields!["openapi" => OPENAPI_VERSION, "info" => info, "paths" => paths],
        extra,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn path_parameters_are_required() {
        let id = parameter("id", schema::integer(), Location::Path, fields!["required" => false]);
        assert_eq!(
            id.to_value(),
            json!({
                "name": "id",
                "schema": {"type": "integer", "format": "int32"},
                "in": "path",
                "required": true,
            })
        );
        let page = parameter("page", schema::integer(), Location::Query, fields![]);
        assert!(!page.contains("required"));
    }

    #[test]
    fn response_without_description_gets_the_default() {
        let empty = response(IndexMap::new(), None, fields![]);
        assert_eq!(empty.to_value(), json!({"description": "Default Response"}));
        let described = response(IndexMap::new(), Some("Gone"), fields![]);
        assert_eq!(described.to_value(), json!({"description": "Gone"}));
    }

    #[test]
    fn api_key_location_is_written_as_in() {
        let scheme = security_scheme("apiKey", fields!["name" => "X-Key", "location" => Location::Header]);
        assert_eq!(scheme.to_value(), json!({"type": "apiKey", "name": "X-Key", "in": "header"}));
    }

    #[test]
    fn path_items_keep_known_methods_only() {
        let ops = IndexMap::from([
            ("get".to_owned(), operation(fields!["operationId" => "list"])),
            ("fetch".to_owned(), operation(fields!["operationId" => "nope"])),
        ]);
        assert_eq!(path_item(ops, fields![]).to_value(), json!({"get": {"operationId": "list"}}));
    }

    #[test]
    fn document_root_carries_the_version() {
        let doc = openapi(info("Pets", "1.0", fields![]), IndexMap::new(), fields![]);
        assert_eq!(doc.to_value(), json!({"openapi": "3.0.0", "info": {"title": "Pets", "version": "1.0"}}));
    }

    #[test]
    fn location_round_trips_through_serde() {
        let parsed: Location = serde_json::from_value(json!("cookie")).unwrap();
        assert_eq!(parsed, Location::Cookie);
        assert_eq!(Location::default(), Location::Query);
    }
}

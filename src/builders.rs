//! Fluent assembly of operations and whole documents.
//!
//! Builders only record what they are given. Payload shapes become schemas
//! when the document is built, so a type registered as a component at any
//! point before [`SpecificationBuilder::build`] is written as a `$ref`.
use std::collections::BTreeSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::components::{Category, ComponentsBuilder};
use crate::definition::{Definition, Field};
use crate::document::{self, Location};
use crate::fields;
use crate::schema::{self, Synthesizer};
use crate::shape::{Elements, Entries, Reflect, Shape};

/// `{name}` segments of a path template.
static PATH_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}/]+)\}").expect("path variable pattern is valid"));

/// Media type used when a payload is given without one.
pub const ANY_MEDIA: &str = "*/*";

/// Extra, optional fields handed to a document factory.
pub type Extra = Vec<(String, Field)>;

/// Scheme name → required scopes. One requirement is satisfied when all of
/// its schemes are.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

// ————————————————————————————————————————————————————————————————————————————
// CONTENT
// ————————————————————————————————————————————————————————————————————————————

/// Payload of a request body or response.
#[derive(Clone, Debug, Default)]
pub enum Content {
    #[default]
    Empty,
    /// One payload served as `*/*`.
    Single(Shape),
    /// Payloads keyed by media type.
    ByMedia(IndexMap<String, Shape>),
}

impl Content {
    /// Payload given by its type.
    pub fn of<T: Reflect>() -> Self {
        Self::Single(T::shape_of())
    }

    /// Payload given by an example value.
    pub fn from_value<T: Reflect + ?Sized>(value: &T) -> Self {
        Self::Single(value.shape())
    }

    #[must_use]
    pub fn with_media(self, media: impl Into<String>, shape: Shape) -> Self {
        let mut by_media = match self {
            Self::Empty => IndexMap::new(),
            Self::Single(single) => IndexMap::from([(ANY_MEDIA.to_owned(), single)]),
            Self::ByMedia(by_media) => by_media,
        };
        by_media.insert(media.into(), shape);
        Self::ByMedia(by_media)
    }
}

impl From<Shape> for Content {
    fn from(value: Shape) -> Self {
        Self::Single(value)
    }
}

impl From<Definition> for Content {
    fn from(value: Definition) -> Self {
        Self::Single(Shape::Schema(value))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLVER
// ————————————————————————————————————————————————————————————————————————————

/// Turns recorded shapes into schemas: registered type tokens become
/// references, at the top level or as container elements. Everything else
/// is synthesized.
pub struct Resolver<'a> {
    synth: &'a mut Synthesizer,
    components: &'a ComponentsBuilder,
}

impl<'a> Resolver<'a> {
    pub fn new(synth: &'a mut Synthesizer, components: &'a ComponentsBuilder) -> Self {
        Self { synth, components }
    }

    pub fn schema(&mut self, shape: Shape) -> Definition {
        let shape = self.substitute(shape);
        self.synth.make_shape(shape)
    }

    // Container element and value shapes are substituted too, so that a
    // `Vec<T>` of a registered `T` points at the component.
    fn substitute(&self, shape: Shape) -> Shape {
        match shape {
            Shape::Sequence(Elements::Of(element)) => {
                Shape::Sequence(Elements::Of(Box::new(self.substitute(*element))))
            }
            Shape::Sequence(Elements::Values(values)) => Shape::Sequence(Elements::Values(
                values.into_iter().map(|value| self.substitute(value)).collect(),
            )),
            Shape::Mapping(Entries::Of(value)) => {
                Shape::Mapping(Entries::Of(Box::new(self.substitute(*value))))
            }
            Shape::Mapping(Entries::Values(values)) => Shape::Mapping(Entries::Values(
                values.into_iter().map(|(name, value)| (name, self.substitute(value))).collect(),
            )),
            other => self.components.maybe_ref(Category::Schemas, other),
        }
    }

    /// Media type → MediaType node. `Empty` yields an empty map.
    pub fn content(&mut self, content: Content) -> IndexMap<String, Definition> {
        let by_media = match content {
            Content::Empty => IndexMap::new(),
            Content::Single(shape) => IndexMap::from([(ANY_MEDIA.to_owned(), shape)]),
            Content::ByMedia(by_media) => by_media,
        };
        by_media
            .into_iter()
            .map(|(media, shape)| (media, document::media_type(self.schema(shape), fields![])))
            .collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OPERATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug)]
struct PendingParameter {
    name: String,
    shape: Shape,
    location: Location,
    extra: Extra,
}

#[derive(Clone, Debug)]
struct PendingPayload {
    content: Content,
    description: Option<String>,
    extra: Extra,
}

#[derive(Clone, Debug, Default)]
pub struct OperationBuilder {
    operation_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    external_docs: Option<Definition>,
    tags: Vec<String>,
    deprecated: bool,
    body: Option<PendingPayload>,
    parameters: Vec<PendingParameter>,
    responses: IndexMap<String, PendingPayload>,
    security: Vec<SecurityRequirement>,
}

impl OperationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `operationId`.
    #[must_use]
    pub fn name(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Set summary and description. Empty values leave the current ones.
    #[must_use]
    pub fn describe(mut self, summary: Option<&str>, description: Option<&str>) -> Self {
        if let Some(summary) = summary.filter(|s| !s.is_empty()) {
            self.summary = Some(summary.to_owned());
        }
        if let Some(description) = description.filter(|s| !s.is_empty()) {
            self.description = Some(description.to_owned());
        }
        self
    }

    #[must_use]
    pub fn document(mut self, url: &str, description: Option<&str>) -> Self {
        self.external_docs = Some(document::external_docs(url, description));
        self
    }

    #[must_use]
    pub fn tag<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn deprecate(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Request body. `extra`: description, required.
    #[must_use]
    pub fn body(mut self, content: impl Into<Content>, extra: Extra) -> Self {
        self.body = Some(PendingPayload { content: content.into(), description: None, extra });
        self
    }

    /// Parameter typed by `shape`. Path parameters are always required.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, shape: Shape, location: Location, extra: Extra) -> Self {
        self.parameters.push(PendingParameter { name: name.into(), shape, location, extra });
        self
    }

    /// Response for `status`. A later call for the same status replaces it.
    #[must_use]
    pub fn response(
        mut self,
        status: impl Into<String>,
        content: impl Into<Content>,
        description: Option<&str>,
        extra: Extra,
    ) -> Self {
        let payload = PendingPayload {
            content: content.into(),
            description: description.map(str::to_owned),
            extra,
        };
        self.responses.insert(status.into(), payload);
        self
    }

    /// Add one security requirement made of `gates` (scheme name → scopes).
    #[must_use]
    pub fn secured<I, S>(mut self, gates: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        self.security.push(gates.into_iter().map(|(name, scopes)| (name.into(), scopes)).collect());
        self
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Build the operation served at `path`. Template variables of `path`
    /// with no declared path parameter get a required string parameter.
    pub fn build(&self, path: &str, resolver: &mut Resolver<'_>) -> Definition {
        let mut parameters = self
            .parameters
            .iter()
            .map(|pending| {
                let schema = resolver.schema(pending.shape.clone());
                document::parameter(&pending.name, schema, pending.location, pending.extra.clone())
            })
            .collect::<Vec<_>>();

        let declared = self
            .parameters
            .iter()
            .filter(|pending| pending.location == Location::Path)
            .map(|pending| pending.name.as_str())
            .collect::<BTreeSet<_>>();
        for name in path_variables(path) {
            if !declared.contains(name) {
                debug!(path, name, "adding implicit path parameter");
                parameters.push(document::parameter(name, schema::string(), Location::Path, fields![]));
            }
        }

        let request_body = self.body.as_ref().map(|pending| {
            document::request_body(resolver.content(pending.content.clone()), pending.extra.clone())
        });

        let responses = self
            .responses
            .iter()
            .map(|(status, pending)| {
                let content = resolver.content(pending.content.clone());
                let response = document::response(content, pending.description.as_deref(), pending.extra.clone());
                (status.clone(), response)
            })
            .collect::<IndexMap<_, _>>();

        document::operation(fields![
            "tags" => self.tags.clone(),
            "summary" => self.summary.clone(),
            "description" => self.description.clone(),
            "externalDocs" => self.external_docs.clone(),
            "operationId" => self.operation_id.clone(),
            "parameters" => parameters,
            "requestBody" => request_body,
            "responses" => responses,
            "deprecated" => self.deprecated,
            "security" => security_field(&self.security),
        ])
    }
}

/// Template variables of `path`, in order of appearance.
pub fn path_variables(path: &str) -> Vec<&str> {
    PATH_VARIABLE
        .captures_iter(path)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str())
        .collect()
}

// Empty scope lists are meaningful, so requirements bypass falsy pruning.
fn security_field(requirements: &[SecurityRequirement]) -> Option<Field> {
    if requirements.is_empty() {
        return None;
    }
    let value = requirements
        .iter()
        .map(|gates| {
            Value::Object(
                gates
                    .iter()
                    .map(|(name, scopes)| (name.clone(), Value::from(scopes.clone())))
                    .collect(),
            )
        })
        .collect::<Vec<_>>();
    Some(Field::Raw(Value::Array(value)))
}

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENTS
// ————————————————————————————————————————————————————————————————————————————

pub const DEFAULT_TITLE: &str = "API";
pub const DEFAULT_VERSION: &str = "0.1.0";
/// Component name for a recursive schema with no origin type.
const RECURSIVE_SCHEMA: &str = "Schema";

#[derive(Debug)]
pub struct SpecificationBuilder {
    title: String,
    version: String,
    description: Option<String>,
    terms: Option<String>,
    contact: Option<Definition>,
    license: Option<Definition>,
    external_docs: Option<Definition>,
    servers: Vec<Definition>,
    tags: IndexMap<String, Definition>,
    security: Vec<SecurityRequirement>,
    paths: IndexMap<String, IndexMap<String, OperationBuilder>>,
    components: ComponentsBuilder,
    synth: Synthesizer,
}

impl Default for SpecificationBuilder {
    fn default() -> Self {
        Self::new(ComponentsBuilder::new())
    }
}

impl SpecificationBuilder {
    pub fn new(components: ComponentsBuilder) -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            version: DEFAULT_VERSION.to_owned(),
            description: None,
            terms: None,
            contact: None,
            license: None,
            external_docs: None,
            servers: Vec::new(),
            tags: IndexMap::new(),
            security: Vec::new(),
            paths: IndexMap::new(),
            components,
            synth: Synthesizer::new(),
        }
    }

    pub fn components(&self) -> &ComponentsBuilder {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentsBuilder {
        &mut self.components
    }

    pub fn synthesizer_mut(&mut self) -> &mut Synthesizer {
        &mut self.synth
    }

    /// Synthesize `T` with this document's session and register it as a
    /// schema component. Returns the registered name.
    pub fn register_schema<T: Reflect>(&mut self) -> String {
        self.components.register_type::<T>(Category::Schemas, &mut self.synth)
    }

    /// Synthesize a schema in this document's session, substituting
    /// references for registered types.
    pub fn schema(&mut self, shape: Shape) -> Definition {
        Resolver::new(&mut self.synth, &self.components).schema(shape)
    }

    pub fn describe(&mut self, title: &str, version: &str, description: Option<&str>, terms: Option<&str>) -> &mut Self {
        self.title = title.to_owned();
        self.version = version.to_owned();
        self.description = description.map(str::to_owned);
        self.terms = terms.map(str::to_owned);
        self
    }

    /// Declare a tag. Redeclaring a name replaces it.
    pub fn tag(&mut self, name: &str, extra: Extra) -> &mut Self {
        self.tags.insert(name.to_owned(), document::tag(name, extra));
        self
    }

    pub fn contact(&mut self, name: Option<&str>, url: Option<&str>, email: Option<&str>) -> &mut Self {
        self.contact = Some(document::contact(name, url, email));
        self
    }

    pub fn license(&mut self, name: &str, url: Option<&str>) -> &mut Self {
        self.license = Some(document::license(name, url));
        self
    }

    pub fn document(&mut self, url: &str, description: Option<&str>) -> &mut Self {
        self.external_docs = Some(document::external_docs(url, description));
        self
    }

    pub fn server(&mut self, url: &str, extra: Extra) -> &mut Self {
        self.servers.push(document::server(url, extra));
        self
    }

    /// Document-wide security requirement.
    pub fn secured<I, S>(&mut self, gates: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        self.security.push(gates.into_iter().map(|(name, scopes)| (name.into(), scopes)).collect());
        self
    }

    /// Mount `operation` at `path` under `method`. The method is lowercased,
    /// a missing `operationId` becomes `<path>.<method>` and undeclared tags
    /// are declared.
    pub fn operation(&mut self, path: &str, method: &str, mut operation: OperationBuilder) -> &mut Self {
        let method = method.to_lowercase();
        if operation.operation_id().is_none() {
            operation = operation.name(format!("{path}.{method}"));
        }
        for name in operation.tags() {
            if !self.tags.contains_key(name) {
                self.tags.insert(name.clone(), document::tag(name, fields![]));
            }
        }
        let methods = self.paths.entry(path.to_owned()).or_default();
        if methods.insert(method.clone(), operation).is_some() {
            warn!(path, %method, "operation replaced");
        }
        self
    }

    pub fn build(&mut self) -> Definition {
        let info = document::info(
            &self.title,
            &self.version,
            fields![
                "description" => self.description.clone(),
                "termsOfService" => self.terms.clone(),
                "contact" => self.contact.clone(),
                "license" => self.license.clone(),
            ],
        );

        let mut resolver = Resolver::new(&mut self.synth, &self.components);
        let paths = self
            .paths
            .iter()
            .map(|(path, methods)| {
                let operations = methods
                    .iter()
                    .map(|(method, operation)| (method.clone(), operation.build(path, &mut resolver)))
                    .collect();
                (path.clone(), document::path_item(operations, fields![]))
            })
            .collect::<IndexMap<_, _>>();

        self.register_recursive_schemas(&paths);

        let tags = self.tags.values().cloned().collect::<Vec<_>>();
        document::openapi(
            info,
            paths,
            fields![
                "servers" => self.servers.clone(),
                "components" => self.components.build(),
                "security" => security_field(&self.security),
                "tags" => tags,
                "externalDocs" => self.external_docs.clone(),
            ],
        )
    }

    /// Self-referencing schemas are written with a `$ref` back to
    /// themselves. Register each one that has no schema component yet under
    /// its origin type name.
    fn register_recursive_schemas(&mut self, paths: &IndexMap<String, Definition>) {
        let recursive = Definition::recursive_nodes(paths.values().chain(self.components.definitions()));
        for node in recursive {
            if self.components.name_of(Category::Schemas, &node).is_some() {
                continue;
            }
            let name = self
                .components
                .unused_name(Category::Schemas, node.origin().unwrap_or(RECURSIVE_SCHEMA));
            debug!(%name, "registering recursive schema");
            self.components.schema(name, node);
        }
    }
}

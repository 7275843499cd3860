//! Shared node type for every schema and document definition.
//!
//! A [`Definition`] is a kind tag plus a guarded field map: only names the
//! kind recognizes are stored, everything else is dropped on construction.
//! Nodes are shared through `Rc`, so a synthesized type graph can point back
//! at itself; serialization and equality both tolerate such cycles.
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};

use crate::components::Category;

/// Guarded, ordered field map of a definition.
pub type Fields = IndexMap<String, Field>;

// ————————————————————————————————————————————————————————————————————————————
// KINDS
// ————————————————————————————————————————————————————————————————————————————

/// Every node kind the document graph knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    // schema kinds
    Schema,
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    String,
    Byte,
    Binary,
    Date,
    Time,
    DateTime,
    Password,
    Email,
    Object,
    Array,
    Reference,
    // document kinds
    Contact,
    License,
    Info,
    Example,
    MediaType,
    Response,
    RequestBody,
    ExternalDocumentation,
    Parameter,
    Header,
    Link,
    SecurityScheme,
    ServerVariable,
    Server,
    Operation,
    PathItem,
    Components,
    Tag,
    OpenApi,
}

const SCHEMA_FIELDS: &[&str] = &[
    "type", "format", "title", "description", "nullable", "default", "example", "enum",
    "oneOf", "anyOf", "allOf", "not", "readOnly", "writeOnly", "deprecated",
];

const NUMBER_FIELDS: &[&str] = &[
    "type", "format", "title", "description", "nullable", "default", "example", "enum",
    "oneOf", "anyOf", "allOf", "not", "readOnly", "writeOnly", "deprecated",
    "minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf",
];

const STRING_FIELDS: &[&str] = &[
    "type", "format", "title", "description", "nullable", "default", "example", "enum",
    "oneOf", "anyOf", "allOf", "not", "readOnly", "writeOnly", "deprecated",
    "minLength", "maxLength", "pattern",
];

const OBJECT_FIELDS: &[&str] = &[
    "type", "format", "title", "description", "nullable", "default", "example", "enum",
    "oneOf", "anyOf", "allOf", "not", "readOnly", "writeOnly", "deprecated",
    "properties", "required", "additionalProperties", "minProperties", "maxProperties",
];

const ARRAY_FIELDS: &[&str] = &[
    "type", "format", "title", "description", "nullable", "default", "example", "enum",
    "oneOf", "anyOf", "allOf", "not", "readOnly", "writeOnly", "deprecated",
    "items", "minItems", "maxItems", "uniqueItems",
];

/// Internal attribute name → wire name. `in` is a reserved word on the host side.
const LOCATION_RENAMES: &[(&str, &str)] = &[("location", "in")];

impl Kind {
    /// Ordered list of field names this kind keeps.
    pub const fn recognized(self) -> &'static [&'static str] {
        match self {
            Self::Schema | Self::Boolean => SCHEMA_FIELDS,
            Self::Integer | Self::Long | Self::Float | Self::Double => NUMBER_FIELDS,
            Self::String
            | Self::Byte
            | Self::Binary
            | Self::Date
            | Self::Time
            | Self::DateTime
            | Self::Password
            | Self::Email => STRING_FIELDS,
            Self::Object => OBJECT_FIELDS,
            Self::Array => ARRAY_FIELDS,
            Self::Reference => &["$ref"],
            Self::Contact => &["name", "url", "email"],
            Self::License => &["name", "url"],
            Self::Info => &["title", "description", "termsOfService", "contact", "license", "version"],
            Self::Example => &["summary", "description", "value", "externalValue"],
            Self::MediaType => &["schema", "example", "examples"],
            Self::Response => &["description", "headers", "content", "links"],
            Self::RequestBody => &["description", "content", "required"],
            Self::ExternalDocumentation => &["description", "url"],
            Self::Parameter => &[
                "name", "location", "description", "required", "deprecated", "allowEmptyValue",
                "style", "explode", "schema", "example", "examples",
            ],
            Self::Header => &[
                "description", "required", "deprecated", "allowEmptyValue", "schema", "example",
            ],
            Self::Link => &[
                "operationRef", "operationId", "parameters", "requestBody", "description", "server",
            ],
            Self::SecurityScheme => &[
                "type", "description", "name", "location", "scheme", "bearerFormat", "flows",
                "openIdConnectUrl",
            ],
            Self::ServerVariable => &["enum", "default", "description"],
            Self::Server => &["url", "description", "variables"],
            Self::Operation => &[
                "tags", "summary", "description", "externalDocs", "operationId", "parameters",
                "requestBody", "responses", "callbacks", "deprecated", "security", "servers",
            ],
            Self::PathItem => &[
                "summary", "description", "get", "put", "post", "delete", "options", "head",
                "patch", "trace", "servers", "parameters",
            ],
            Self::Components => &[
                "schemas", "responses", "parameters", "examples", "requestBodies", "headers",
                "securitySchemes", "links", "callbacks",
            ],
            Self::Tag => &["name", "description", "externalDocs"],
            Self::OpenApi => &[
                "openapi", "info", "servers", "paths", "components", "security", "tags",
                "externalDocs",
            ],
        }
    }

    /// Whether a constructor argument named `name` survives the field guard.
    /// References keep everything.
    pub fn recognizes(self, name: &str) -> bool {
        matches!(self, Self::Reference) || self.recognized().contains(&name)
    }

    /// The fixed `type`/`format` pair of a schema leaf kind.
    pub const fn discriminant(self) -> Option<(&'static str, Option<&'static str>)> {
        match self {
            Self::Boolean => Some(("boolean", None)),
            Self::Integer => Some(("integer", Some("int32"))),
            Self::Long => Some(("integer", Some("int64"))),
            Self::Float => Some(("number", Some("float"))),
            Self::Double => Some(("number", Some("double"))),
            Self::String => Some(("string", None)),
            Self::Byte => Some(("string", Some("byte"))),
            Self::Binary => Some(("string", Some("binary"))),
            Self::Date => Some(("string", Some("date"))),
            Self::Time => Some(("string", Some("time"))),
            Self::DateTime => Some(("string", Some("date-time"))),
            Self::Password => Some(("string", Some("password"))),
            Self::Email => Some(("string", Some("email"))),
            Self::Object => Some(("object", None)),
            Self::Array => Some(("array", None)),
            _ => None,
        }
    }

    const fn renames(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Parameter | Self::SecurityScheme => LOCATION_RENAMES,
            _ => &[],
        }
    }

    /// Name a stored field is written under.
    pub fn wire_name(self, name: &str) -> &str {
        self.renames()
            .iter()
            .find(|(internal, _)| *internal == name)
            .map_or(name, |(_, wire)| *wire)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FIELD VALUES
// ————————————————————————————————————————————————————————————————————————————

/// One field value of a definition.
#[derive(Clone, Debug)]
pub enum Field {
    /// Plain JSON (scalars or literal trees).
    Value(Value),
    /// JSON written out as-is, exempt from falsy pruning.
    Raw(Value),
    Definition(Definition),
    List(Vec<Field>),
    Map(Fields),
}

impl Field {
    fn is_absent(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// `null`, `false`, zero, empty strings and empty collections.
    /// A nested definition is never falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Value(value) | Self::Raw(value) => is_falsy(value),
            Self::Definition(_) => false,
            Self::List(items) => items.is_empty(),
            Self::Map(entries) => entries.is_empty(),
        }
    }

    pub const fn as_definition(&self) -> Option<&Definition> {
        match self {
            Self::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    pub const fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

macro_rules! numeric_fields {
    ($($t:ty),*) => {
        $(impl From<$t> for Field {
            fn from(value: $t) -> Self {
                Self::Value(Value::from(value))
            }
        })*
    };
}

numeric_fields!(i32, i64, u32, u64, usize, f64);

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<Vec<String>> for Field {
    fn from(value: Vec<String>) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<Definition> for Field {
    fn from(value: Definition) -> Self {
        Self::Definition(value)
    }
}

impl From<Vec<Definition>> for Field {
    fn from(value: Vec<Definition>) -> Self {
        Self::List(value.into_iter().map(Self::Definition).collect())
    }
}

impl From<IndexMap<String, Definition>> for Field {
    fn from(value: IndexMap<String, Definition>) -> Self {
        Self::Map(value.into_iter().map(|(k, v)| (k, Self::Definition(v))).collect())
    }
}

impl From<Vec<Field>> for Field {
    fn from(value: Vec<Field>) -> Self {
        Self::List(value)
    }
}

impl From<Fields> for Field {
    fn from(value: Fields) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Value(Value::Null), Into::into)
    }
}

/// Build a `Vec<(String, Field)>` constructor argument list.
///
/// ```
/// use openapi_synth::{fields, definition::{Definition, Kind}};
/// let contact = Definition::new(Kind::Contact, fields!["name" => "API team", "phone" => "n/a"]);
/// assert!(contact.get("phone").is_none());
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        ::std::vec::Vec::<(::std::string::String, $crate::definition::Field)>::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$((
            ::std::string::String::from($name),
            $crate::definition::Field::from($value),
        )),+]
    };
}

// ————————————————————————————————————————————————————————————————————————————
// DEFINITION
// ————————————————————————————————————————————————————————————————————————————

/// Shared handle to one node of the document graph. Cloning is cheap and
/// keeps node identity.
#[derive(Clone)]
pub struct Definition(Rc<Node>);

struct Node {
    kind: Kind,
    origin: Option<String>,
    fields: OnceCell<Fields>,
}

impl Definition {
    /// Construct a node, keeping only the fields `kind` recognizes.
    pub fn new<I>(kind: Kind, fields: I) -> Self
    where
        I: IntoIterator<Item = (String, Field)>,
    {
        Self(Rc::new(Node {
            kind,
            origin: None,
            fields: OnceCell::with_value(guard(kind, fields)),
        }))
    }

    /// Allocate a node whose fields are populated later, exactly once.
    /// `origin` names the host type the node stands for.
    pub fn placeholder(kind: Kind, origin: impl Into<String>) -> Self {
        Self(Rc::new(Node {
            kind,
            origin: Some(origin.into()),
            fields: OnceCell::new(),
        }))
    }

    pub(crate) fn fill<I>(&self, fields: I)
    where
        I: IntoIterator<Item = (String, Field)>,
    {
        if self.0.fields.set(guard(self.0.kind, fields)).is_err() {
            tracing::warn!(kind = %self.0.kind, origin = ?self.0.origin, "definition already populated, ignoring");
        }
    }

    pub fn kind(&self) -> Kind {
        self.0.kind
    }

    pub fn origin(&self) -> Option<&str> {
        self.0.origin.as_deref()
    }

    pub fn is_populated(&self) -> bool {
        self.0.fields.get().is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.fields.get().and_then(|fields| fields.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0
            .fields
            .get()
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(name, field)| (name.as_str(), field)))
    }

    pub fn len(&self) -> usize {
        self.0.fields.get().map_or(0, IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same node, not merely equal fields.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Plain JSON tree with falsy entries dropped at every level.
    ///
    /// A node met again while it is still being written becomes a `$ref`.
    /// When `self` is a document or a components section, the pointer uses
    /// the name the node is registered under in `schemas`; otherwise it
    /// names the node's origin type.
    pub fn to_value(&self) -> Value {
        Emitter::for_root(self).definition(self)
    }

    /// Nodes reachable from `roots` that contain a path back to themselves,
    /// in discovery order. These are the nodes serialization writes as
    /// back-references.
    pub fn recursive_nodes<'a, I>(roots: I) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut finder = CycleFinder::default();
        for root in roots {
            finder.definition(root);
        }
        finder.found
    }

    fn addr(&self) -> *const Node {
        Rc::as_ptr(&self.0)
    }
}

fn guard<I>(kind: Kind, fields: I) -> Fields
where
    I: IntoIterator<Item = (String, Field)>,
{
    fields
        .into_iter()
        .filter(|(name, value)| !value.is_absent() && kind.recognizes(name))
        .collect()
}

// ------------------------------ Serialize -------------------------------- //

#[derive(Default)]
struct Emitter {
    active: Vec<*const Node>,
    /// Registered schema node → its reference path.
    names: HashMap<*const Node, String>,
}

impl Emitter {
    fn for_root(root: &Definition) -> Self {
        let mut emitter = Self::default();
        let components = match root.kind() {
            Kind::OpenApi => root.get("components").and_then(Field::as_definition),
            Kind::Components => Some(root),
            _ => None,
        };
        let schemas = components
            .and_then(|components| components.get(Category::Schemas.segment()))
            .and_then(Field::as_map);
        for (name, field) in schemas.into_iter().flatten() {
            if let Field::Definition(definition) = field {
                emitter
                    .names
                    .entry(definition.addr())
                    .or_insert_with(|| Category::Schemas.path(name));
            }
        }
        emitter
    }

    fn definition(&mut self, definition: &Definition) -> Value {
        let addr = definition.addr();
        if self.active.contains(&addr) {
            return self.back_reference(definition);
        }
        self.active.push(addr);
        let kind = definition.kind();
        let out = definition
            .iter()
            .filter(|(_, field)| !field.is_falsy())
            .map(|(name, field)| (kind.wire_name(name).to_owned(), self.field(field)))
            .collect::<Map<String, Value>>();
        self.active.pop();
        Value::Object(out)
    }

    fn field(&mut self, field: &Field) -> Value {
        match field {
            Field::Value(value) => prune(value),
            Field::Raw(value) => value.clone(),
            Field::Definition(definition) => self.definition(definition),
            Field::List(items) => Value::Array(
                items
                    .iter()
                    .filter(|item| !item.is_falsy())
                    .map(|item| self.field(item))
                    .collect(),
            ),
            Field::Map(entries) => Value::Object(
                entries
                    .iter()
                    .filter(|(_, item)| !item.is_falsy())
                    .map(|(name, item)| (name.clone(), self.field(item)))
                    .collect(),
            ),
        }
    }

    fn back_reference(&self, definition: &Definition) -> Value {
        let target = self.names.get(&definition.addr()).cloned().unwrap_or_else(|| {
            Category::Schemas.path(definition.origin().unwrap_or_default())
        });
        let mut out = Map::new();
        out.insert("$ref".into(), Value::String(target));
        Value::Object(out)
    }
}

/// Walks a graph the way [`Emitter`] does, collecting the nodes it would
/// write as back-references.
#[derive(Default)]
struct CycleFinder {
    active: Vec<*const Node>,
    found: Vec<Definition>,
}

impl CycleFinder {
    fn definition(&mut self, definition: &Definition) {
        let addr = definition.addr();
        if self.active.contains(&addr) {
            if !self.found.iter().any(|seen| seen.ptr_eq(definition)) {
                self.found.push(definition.clone());
            }
            return;
        }
        self.active.push(addr);
        for (_, field) in definition.iter() {
            self.field(field);
        }
        self.active.pop();
    }

    fn field(&mut self, field: &Field) {
        match field {
            Field::Value(_) | Field::Raw(_) => {}
            Field::Definition(definition) => self.definition(definition),
            Field::List(items) => items.iter().for_each(|item| self.field(item)),
            Field::Map(entries) => entries.values().for_each(|item| self.field(item)),
        }
    }
}

fn prune(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().filter(|x| !is_falsy(x)).map(prune).collect())
        }
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .filter(|(_, x)| !is_falsy(x))
                .map(|(k, x)| (k.clone(), prune(x)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl serde::Serialize for Definition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0.kind, self.to_value())
    }
}

// ------------------------------- Equality -------------------------------- //

impl PartialEq for Definition {
    fn eq(&self, other: &Self) -> bool {
        Comparison::default().definitions(self, other)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        Comparison::default().fields(self, other)
    }
}

/// Structural comparison over guarded fields. Pairs already under comparison
/// are assumed equal, which makes cyclic graphs terminate.
#[derive(Default)]
struct Comparison {
    assumed: Vec<(*const Node, *const Node)>,
}

impl Comparison {
    fn definitions(&mut self, a: &Definition, b: &Definition) -> bool {
        if a.ptr_eq(b) {
            return true;
        }
        if a.kind() != b.kind() || a.len() != b.len() {
            return false;
        }
        let pair = (a.addr(), b.addr());
        if self.assumed.contains(&pair) {
            return true;
        }
        self.assumed.push(pair);
        a.iter()
            .all(|(name, left)| b.get(name).is_some_and(|right| self.fields(left, right)))
    }

    fn fields(&mut self, a: &Field, b: &Field) -> bool {
        match (a, b) {
            (Field::Value(x) | Field::Raw(x), Field::Value(y) | Field::Raw(y)) => x == y,
            (Field::Definition(x), Field::Definition(y)) => self.definitions(x, y),
            (Field::List(xs), Field::List(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.fields(x, y))
            }
            (Field::Map(xs), Field::Map(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| self.fields(x, y)))
            }
            _ => false,
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

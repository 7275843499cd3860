//! Synthesize OpenAPI 3.0 schemas from Rust types and example values, and
//! assemble them into documents with referenceable components.
//!
//! ```
//! use openapi_synth::builders::{Content, OperationBuilder, SpecificationBuilder};
//! use openapi_synth::reflect_struct;
//!
//! struct Pet { id: i64, name: String }
//! reflect_struct! { Pet { id: i64, name: String } }
//!
//! let mut spec = SpecificationBuilder::default();
//! spec.describe("Pets", "1.0.0", None, None);
//! spec.register_schema::<Pet>();
//! spec.operation(
//!     "/pets/{id}",
//!     "get",
//!     OperationBuilder::new().response("200", Content::of::<Pet>(), None, vec![]),
//! );
//! let doc = spec.build().to_value();
//! assert_eq!(
//!     doc["paths"]["/pets/{id}"]["get"]["responses"]["200"]["content"]["*/*"]["schema"]["$ref"],
//!     "#/components/schemas/Pet",
//! );
//! ```
pub mod builders;
pub mod cli;
pub mod components;
pub mod definition;
pub mod document;
pub mod error;
pub mod manifest;
pub mod path_de;
pub mod schema;
pub mod shape;

pub use builders::{Content, OperationBuilder, SpecificationBuilder};
pub use components::{Category, ComponentsBuilder};
pub use definition::{Definition, Field, Kind};
pub use error::{Error, Result};
pub use schema::Synthesizer;
pub use shape::{Reflect, Shape};

//! Schema subsystem
//!
//! Declarative value schemas, their translation into storage attribute
//! descriptors, and validation of records against them.
//!
//! # Design Principles
//!
//! - Schemas are fixed when a model is configured
//! - Unsupported node kinds fail at configuration time, never at first write
//! - Validation is strict on writes: no undeclared fields, no coercion
//! - Every failing field is reported, not just the first

mod errors;
mod loader;
mod mapper;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult, ValidationDetails, ValidationReport};
pub use loader::SchemaLoader;
pub use mapper::{AttributeDescriptor, AttributeKind, ScalarType, SchemaTypeMapper};
pub use types::{
    Refinement, Schema, SchemaNode, DATE_CREATED_FIELD, DATE_UPDATED_FIELD, ID_FIELD,
};
pub use validator::{SchemaValidator, ValidationMode};
pub(crate) use validator::json_type_name;

//! Schema types and parsing.
//!
//! This module defines the complete schema type system including
//! primitives, complex types, logical-type bindings, JSON parsing,
//! named-type resolution, and canonical-form fingerprints.

mod context;
mod fingerprint;
mod parser;
mod types;

pub use context::SchemaContext;
pub use fingerprint::{fingerprint64, fingerprint_bytes, parsing_canonical_form};
pub use parser::{parse_schema, parse_schema_with_options, SchemaParser};
pub use types::*;

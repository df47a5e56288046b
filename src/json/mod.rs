//! Extended JSON codec.
//!
//! A projection of the binary format into JSON: records as objects with
//! fields in any order, reader defaults filling missing fields, nullable
//! single-branch unions unwrapped, bytes riding in ISO-8859-1 strings or
//! numeric tokens, and logical types free to take over the representation
//! through the extension hooks.

mod decoder;
mod encoder;
pub mod tokens;

pub use decoder::JsonDecoder;
pub use encoder::JsonEncoder;
pub use tokens::{JsonToken, TokenCursor};

//! Grammar-driven data serialization engine
//!
//! This library implements an Avro-style serialization core: the schema
//! model with named-type resolution and logical-type bindings, the
//! binary codec, a field-order-agnostic extended JSON codec with
//! reader-default injection, a resolving decoder that reconciles writer
//! and reader schemas, and the conversion layer that surfaces typed
//! views over primitive wire values. All parser-based codecs are driven
//! by one symbol grammar compiled per schema.

pub mod binary;
pub mod codec;
pub mod datum;
pub mod error;
pub mod grammar;
pub mod json;
pub mod logical;
pub mod resolving;
pub mod schema;
pub mod value;

// Re-export main types
pub use binary::{BinaryDecoder, BinaryEncoder, Limits};
pub use codec::{Decoder, Encoder, FieldBinding, JsonExtensionDecoder, JsonExtensionEncoder};
pub use datum::{
    decode_binary, decode_binary_resolved, decode_json, decode_json_strict, encode_binary,
    encode_json, DatumReader, DatumWriter,
};
pub use error::{CodecError, SchemaError};
pub use json::{JsonDecoder, JsonEncoder};
pub use logical::{
    Conversion, ConversionRegistry, DatumModel, StringRepresentation,
};
pub use resolving::ResolvingDecoder;
pub use schema::{
    fingerprint64, parse_schema, parse_schema_with_options, parsing_canonical_form, EnumSchema,
    FieldOrder, FieldSchema, FixedSchema, LogicalSchema, RecordSchema, Schema, SchemaContext,
    SchemaParser,
};
pub use value::{AnyTemporal, Decimal, Value};

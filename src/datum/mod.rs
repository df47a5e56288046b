//! Datum orchestration.
//!
//! [`DatumReader`] and [`DatumWriter`] drive the codecs over a value
//! tree, with logical-type dispatch at every node. The helpers below
//! cover the common whole-datum paths.

mod reader;
mod writer;

pub use reader::DatumReader;
pub use writer::DatumWriter;

use crate::binary::{BinaryDecoder, BinaryEncoder};
use crate::error::CodecError;
use crate::json::{JsonDecoder, JsonEncoder};
use crate::resolving::ResolvingDecoder;
use crate::schema::Schema;
use crate::value::Value;

/// Encode one value to binary under `schema`.
pub fn encode_binary(value: &Value, schema: &Schema) -> Result<Vec<u8>, CodecError> {
    let mut encoder = BinaryEncoder::new();
    DatumWriter::new(schema.clone()).write(value, &mut encoder)?;
    Ok(encoder.into_bytes())
}

/// Decode one binary value written and read under the same schema.
pub fn decode_binary(bytes: &[u8], schema: &Schema) -> Result<Value, CodecError> {
    let mut decoder = BinaryDecoder::new(bytes);
    DatumReader::new(schema.clone()).read(&mut decoder)
}

/// Decode one binary value written under `writer` into the shape of
/// `reader`, applying the full resolution rules.
pub fn decode_binary_resolved(
    bytes: &[u8],
    writer: &Schema,
    reader: &Schema,
) -> Result<Value, CodecError> {
    let mut inner = BinaryDecoder::new(bytes);
    let mut resolving = ResolvingDecoder::new(writer, reader, &mut inner)?;
    DatumReader::new(reader.clone()).read(&mut resolving)
}

/// Encode one value to the extended JSON form under `schema`.
pub fn encode_json(value: &Value, schema: &Schema) -> Result<String, CodecError> {
    let mut encoder = JsonEncoder::new(schema)?;
    DatumWriter::new(schema.clone()).write(value, &mut encoder)?;
    encoder.into_string()
}

/// Decode one extended JSON value under `schema`, tolerating unknown
/// trailing fields.
pub fn decode_json(text: &str, schema: &Schema) -> Result<Value, CodecError> {
    let mut decoder = JsonDecoder::new(schema, text)?;
    DatumReader::new(schema.clone()).read(&mut decoder)
}

/// Decode one extended JSON value under `schema`, rejecting unknown
/// fields.
pub fn decode_json_strict(text: &str, schema: &Schema) -> Result<Value, CodecError> {
    let mut decoder = JsonDecoder::strict(schema, text)?;
    DatumReader::new(schema.clone()).read(&mut decoder)
}

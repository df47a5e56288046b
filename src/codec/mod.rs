//! Decoder and encoder capability traits.
//!
//! All codecs expose the same pull-based surface: primitive reads and
//! writes, union branch selection, and the blocked array/map protocol.
//! Resolution-aware decoders additionally surface the reader-shaped field
//! order; JSON codecs advertise extension hooks that logical-type
//! conversions may use to take over the representation entirely.

use num_bigint::BigInt;
use serde_json::Value as JsonValue;

use crate::error::CodecError;
use crate::schema::Schema;
use crate::value::Decimal;

/// A reader field surfaced by a resolving decoder, in decode order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// The reader-side field name
    pub name: String,
    /// The reader-side declaration position the value belongs in
    pub position: usize,
}

/// Pull-based value decoder.
///
/// One instance decodes one stream; instances are single-threaded and
/// never shared. All reads fail fast on the first malformed input and
/// leave the stream positioned at the failure.
pub trait Decoder {
    /// Read a null value.
    fn read_null(&mut self) -> Result<(), CodecError>;
    /// Read a boolean value.
    fn read_boolean(&mut self) -> Result<bool, CodecError>;
    /// Read a 32-bit integer.
    fn read_int(&mut self) -> Result<i32, CodecError>;
    /// Read a 64-bit integer.
    fn read_long(&mut self) -> Result<i64, CodecError>;
    /// Read a 32-bit float.
    fn read_float(&mut self) -> Result<f32, CodecError>;
    /// Read a 64-bit float.
    fn read_double(&mut self) -> Result<f64, CodecError>;
    /// Read a length-prefixed byte array.
    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError>;
    /// Read a string.
    fn read_string(&mut self) -> Result<String, CodecError>;
    /// Read exactly `size` raw bytes.
    fn read_fixed(&mut self, size: usize) -> Result<Vec<u8>, CodecError>;
    /// Read an enum ordinal.
    fn read_enum(&mut self) -> Result<usize, CodecError>;
    /// Read a union branch index.
    fn read_index(&mut self) -> Result<usize, CodecError>;

    /// Begin reading an array; returns the first block's item count.
    fn read_array_start(&mut self) -> Result<u64, CodecError>;
    /// Advance to the next array block; 0 means the array is finished.
    fn array_next(&mut self) -> Result<u64, CodecError>;
    /// Begin reading a map; returns the first block's entry count.
    fn read_map_start(&mut self) -> Result<u64, CodecError>;
    /// Advance to the next map block; 0 means the map is finished.
    fn map_next(&mut self) -> Result<u64, CodecError>;

    /// Skip a length-prefixed byte array.
    fn skip_bytes(&mut self) -> Result<(), CodecError>;
    /// Skip a string.
    fn skip_string(&mut self) -> Result<(), CodecError>;
    /// Skip exactly `size` raw bytes.
    fn skip_fixed(&mut self, size: usize) -> Result<(), CodecError>;
    /// Skip array blocks wholesale where the wire allows; returns the
    /// number of items the caller must skip one by one, 0 when the array
    /// is fully consumed.
    fn skip_array(&mut self) -> Result<u64, CodecError>;
    /// Map analogue of [`Decoder::skip_array`].
    fn skip_map(&mut self) -> Result<u64, CodecError>;

    /// The reader-shaped field order for the record being read, when this
    /// decoder performs writer/reader resolution. `None` means fields
    /// arrive in reader declaration order.
    fn read_field_order(&mut self) -> Result<Option<Vec<FieldBinding>>, CodecError> {
        Ok(None)
    }

    /// Run any trailing resolution actions (writer-side fields to skip
    /// after the last reader field). A no-op for plain decoders.
    fn drain(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    /// Downcast to the JSON extension surface, when this decoder has one.
    fn json_extension(&mut self) -> Option<&mut dyn JsonExtensionDecoder> {
        None
    }
}

/// Pull-based value encoder.
pub trait Encoder {
    /// Write a null value.
    fn write_null(&mut self) -> Result<(), CodecError>;
    /// Write a boolean value.
    fn write_boolean(&mut self, value: bool) -> Result<(), CodecError>;
    /// Write a 32-bit integer.
    fn write_int(&mut self, value: i32) -> Result<(), CodecError>;
    /// Write a 64-bit integer.
    fn write_long(&mut self, value: i64) -> Result<(), CodecError>;
    /// Write a 32-bit float.
    fn write_float(&mut self, value: f32) -> Result<(), CodecError>;
    /// Write a 64-bit float.
    fn write_double(&mut self, value: f64) -> Result<(), CodecError>;
    /// Write a length-prefixed byte array.
    fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError>;
    /// Write a string.
    fn write_string(&mut self, value: &str) -> Result<(), CodecError>;
    /// Write raw bytes with no length prefix.
    fn write_fixed(&mut self, value: &[u8]) -> Result<(), CodecError>;
    /// Write an enum ordinal.
    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError>;
    /// Write a union branch index.
    fn write_index(&mut self, index: usize) -> Result<(), CodecError>;

    /// Begin an array.
    fn write_array_start(&mut self) -> Result<(), CodecError>;
    /// Declare how many items the next block holds.
    fn set_item_count(&mut self, count: u64) -> Result<(), CodecError>;
    /// Begin one item within the current block.
    fn start_item(&mut self) -> Result<(), CodecError>;
    /// End the array.
    fn write_array_end(&mut self) -> Result<(), CodecError>;
    /// Begin a map.
    fn write_map_start(&mut self) -> Result<(), CodecError>;
    /// End the map.
    fn write_map_end(&mut self) -> Result<(), CodecError>;

    /// Downcast to the JSON extension surface, when this encoder has one.
    fn json_extension(&mut self) -> Option<&mut dyn JsonExtensionEncoder> {
        None
    }
}

/// Extended reads only a JSON decoder can provide.
///
/// Logical-type conversions probe for this surface first; when it is
/// present they may consume the JSON representation directly instead of
/// the primitive wire value.
pub trait JsonExtensionDecoder {
    /// Read a decimal from a string or number token.
    fn read_big_decimal(&mut self, schema: &Schema) -> Result<Decimal, CodecError>;
    /// Read an arbitrary-precision integer from a string or integer token.
    fn read_big_integer(&mut self, schema: &Schema) -> Result<BigInt, CodecError>;
    /// Read the next value as a raw JSON tree, advancing the grammar past
    /// the `schema`-shaped region it occupies.
    fn read_value_as_tree(&mut self, schema: &Schema) -> Result<JsonValue, CodecError>;
}

/// Extended writes only a JSON encoder can provide.
pub trait JsonExtensionEncoder {
    /// Emit a decimal as a plain JSON number.
    fn write_decimal(&mut self, value: &Decimal, schema: &Schema) -> Result<(), CodecError>;
    /// Emit an arbitrary-precision integer as a plain JSON number.
    fn write_big_integer(&mut self, value: &BigInt, schema: &Schema) -> Result<(), CodecError>;
    /// Emit a raw JSON tree in place of the `schema`-shaped region.
    fn write_json_value(&mut self, value: &JsonValue, schema: &Schema) -> Result<(), CodecError>;
}

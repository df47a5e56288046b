//! Binary encoder for the wire format.
//!
//! The write-side inverse of the binary decoder. Arrays and maps are
//! written as a single block followed by the zero terminator; block byte
//! sizes are not emitted.

use crate::binary::varint::{encode_varint, encode_zigzag};
use crate::codec::Encoder;
use crate::error::CodecError;

/// Encoder into an owned byte buffer.
#[derive(Debug, Default)]
pub struct BinaryEncoder {
    out: Vec<u8>,
    /// Pending item count for the current array/map block.
    block_count: u64,
    /// Whether the pending block count has been written yet.
    block_open: bool,
}

impl BinaryEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish encoding and take the output buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    fn flush_block_count(&mut self) {
        if self.block_open && self.block_count > 0 {
            encode_zigzag(self.block_count as i64, &mut self.out);
            self.block_open = false;
        }
    }
}

impl Encoder for BinaryEncoder {
    #[inline]
    fn write_null(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    #[inline]
    fn write_boolean(&mut self, value: bool) -> Result<(), CodecError> {
        self.out.push(u8::from(value));
        Ok(())
    }

    #[inline]
    fn write_int(&mut self, value: i32) -> Result<(), CodecError> {
        encode_zigzag(value as i64, &mut self.out);
        Ok(())
    }

    #[inline]
    fn write_long(&mut self, value: i64) -> Result<(), CodecError> {
        encode_zigzag(value, &mut self.out);
        Ok(())
    }

    #[inline]
    fn write_float(&mut self, value: f32) -> Result<(), CodecError> {
        self.out.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    #[inline]
    fn write_double(&mut self, value: f64) -> Result<(), CodecError> {
        self.out.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        encode_zigzag(value.len() as i64, &mut self.out);
        self.out.extend_from_slice(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    fn write_fixed(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.out.extend_from_slice(value);
        Ok(())
    }

    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError> {
        self.write_int(ordinal as i32)
    }

    fn write_index(&mut self, index: usize) -> Result<(), CodecError> {
        self.write_long(index as i64)
    }

    fn write_array_start(&mut self) -> Result<(), CodecError> {
        self.block_count = 0;
        self.block_open = true;
        Ok(())
    }

    fn set_item_count(&mut self, count: u64) -> Result<(), CodecError> {
        self.block_count = count;
        self.block_open = true;
        Ok(())
    }

    fn start_item(&mut self) -> Result<(), CodecError> {
        // The first item flushes the block's count onto the wire
        self.flush_block_count();
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<(), CodecError> {
        self.flush_block_count();
        // Zero count terminates the blocks
        encode_varint(0, &mut self.out);
        self.block_open = false;
        Ok(())
    }

    fn write_map_start(&mut self) -> Result<(), CodecError> {
        self.write_array_start()
    }

    fn write_map_end(&mut self) -> Result<(), CodecError> {
        self.write_array_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryDecoder;
    use crate::codec::Decoder;

    #[test]
    fn test_write_int_zigzag() {
        let mut enc = BinaryEncoder::new();
        enc.write_int(300).unwrap();
        assert_eq!(enc.into_bytes(), vec![0xD8, 0x04]);
    }

    #[test]
    fn test_write_string() {
        let mut enc = BinaryEncoder::new();
        enc.write_string("abc").unwrap();
        assert_eq!(enc.into_bytes(), vec![0x06, b'a', b'b', b'c']);
    }

    #[test]
    fn test_array_block_roundtrip() {
        let mut enc = BinaryEncoder::new();
        enc.write_array_start().unwrap();
        enc.set_item_count(3).unwrap();
        for v in [1, 2, 3] {
            enc.start_item().unwrap();
            enc.write_int(v).unwrap();
        }
        enc.write_array_end().unwrap();

        let bytes = enc.into_bytes();
        let mut dec = BinaryDecoder::new(&bytes);
        assert_eq!(dec.read_array_start().unwrap(), 3);
        assert_eq!(dec.read_int().unwrap(), 1);
        assert_eq!(dec.read_int().unwrap(), 2);
        assert_eq!(dec.read_int().unwrap(), 3);
        assert_eq!(dec.array_next().unwrap(), 0);
    }

    #[test]
    fn test_empty_array() {
        let mut enc = BinaryEncoder::new();
        enc.write_array_start().unwrap();
        enc.write_array_end().unwrap();
        assert_eq!(enc.into_bytes(), vec![0x00]);
    }
}

//! Binary decoder for the wire format.
//!
//! Decodes the binary encoding into primitive values: zigzag varints for
//! ints and longs, little-endian IEEE 754 for floats and doubles,
//! length-prefixed bytes and strings, blocked arrays and maps with an
//! optional negative-count byte-size prefix, union indices as longs, and
//! enums as ordinals.

use crate::binary::varint::decode_zigzag;
use crate::codec::Decoder;
use crate::error::CodecError;

/// Safety limits applied while decoding.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Ceiling on any single declared array/map block count.
    pub max_collection_items: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Generous for real data, small enough that a hostile count
            // cannot drive allocation
            max_collection_items: 1 << 28,
        }
    }
}

/// Decoder over an in-memory byte slice.
///
/// The cursor is advanced in place; after a failed read the cursor is
/// positioned where the failure was detected and the stream must be
/// treated as unusable.
#[derive(Debug)]
pub struct BinaryDecoder<'a> {
    data: &'a [u8],
    limits: Limits,
}

impl<'a> BinaryDecoder<'a> {
    /// Create a decoder over `data` with default limits.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            limits: Limits::default(),
        }
    }

    /// Create a decoder with explicit limits.
    pub fn with_limits(data: &'a [u8], limits: Limits) -> Self {
        Self { data, limits }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    fn eof() -> CodecError {
        CodecError::Malformed("unexpected end of input".to_string())
    }

    /// Read a block count, resolving the negative-count-plus-byte-size
    /// form and enforcing the collection limit.
    fn read_block_count(&mut self) -> Result<u64, CodecError> {
        let count = self.read_long()?;
        let count = if count < 0 {
            // Negative count: the block byte size follows, enabling skip
            let _byte_size = self.read_long()?;
            count.unsigned_abs()
        } else {
            count as u64
        };
        if count > self.limits.max_collection_items {
            return Err(CodecError::Capacity {
                declared: count,
                limit: self.limits.max_collection_items,
            });
        }
        Ok(count)
    }

    /// Read a block count for skipping: when the wire carries a byte
    /// size, consume the whole block and return 0 items to skip.
    fn skip_block_count(&mut self) -> Result<u64, CodecError> {
        loop {
            let count = self.read_long()?;
            if count == 0 {
                return Ok(0);
            }
            if count < 0 {
                let byte_size = self.read_long()?;
                if byte_size < 0 {
                    return Err(CodecError::Malformed(format!(
                        "negative block byte size: {}",
                        byte_size
                    )));
                }
                self.skip_fixed(byte_size as usize)?;
                continue;
            }
            if count as u64 > self.limits.max_collection_items {
                return Err(CodecError::Capacity {
                    declared: count as u64,
                    limit: self.limits.max_collection_items,
                });
            }
            return Ok(count as u64);
        }
    }
}

impl Decoder for BinaryDecoder<'_> {
    #[inline]
    fn read_null(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    #[inline]
    fn read_boolean(&mut self) -> Result<bool, CodecError> {
        match self.data.split_first() {
            Some((&0, rest)) => {
                self.data = rest;
                Ok(false)
            }
            Some((&1, rest)) => {
                self.data = rest;
                Ok(true)
            }
            Some((&other, _)) => Err(CodecError::Malformed(format!(
                "invalid boolean byte: {}",
                other
            ))),
            None => Err(Self::eof()),
        }
    }

    #[inline]
    fn read_int(&mut self) -> Result<i32, CodecError> {
        let long = self.read_long()?;
        i32::try_from(long)
            .map_err(|_| CodecError::Malformed(format!("int overflow: {}", long)))
    }

    #[inline]
    fn read_long(&mut self) -> Result<i64, CodecError> {
        decode_zigzag(&mut self.data)
    }

    #[inline]
    fn read_float(&mut self) -> Result<f32, CodecError> {
        if self.data.len() < 4 {
            return Err(Self::eof());
        }
        let (bytes, rest) = self.data.split_at(4);
        self.data = rest;
        Ok(f32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }

    #[inline]
    fn read_double(&mut self) -> Result<f64, CodecError> {
        if self.data.len() < 8 {
            return Err(Self::eof());
        }
        let (bytes, rest) = self.data.split_at(8);
        self.data = rest;
        Ok(f64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_long()?;
        if len < 0 {
            return Err(CodecError::Malformed(format!(
                "negative bytes length: {}",
                len
            )));
        }
        let len = len as usize;
        if self.data.len() < len {
            return Err(Self::eof());
        }
        let (bytes, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(bytes.to_vec())
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| CodecError::Malformed(format!("invalid UTF-8: {}", e)))
    }

    fn read_fixed(&mut self, size: usize) -> Result<Vec<u8>, CodecError> {
        if self.data.len() < size {
            return Err(Self::eof());
        }
        let (bytes, rest) = self.data.split_at(size);
        self.data = rest;
        Ok(bytes.to_vec())
    }

    fn read_enum(&mut self) -> Result<usize, CodecError> {
        let ordinal = self.read_int()?;
        usize::try_from(ordinal)
            .map_err(|_| CodecError::Malformed(format!("negative enum ordinal: {}", ordinal)))
    }

    fn read_index(&mut self) -> Result<usize, CodecError> {
        let index = self.read_long()?;
        usize::try_from(index)
            .map_err(|_| CodecError::Malformed(format!("negative union index: {}", index)))
    }

    fn read_array_start(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn array_next(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn read_map_start(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn map_next(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn skip_bytes(&mut self) -> Result<(), CodecError> {
        let len = self.read_long()?;
        if len < 0 {
            return Err(CodecError::Malformed(format!(
                "negative bytes length: {}",
                len
            )));
        }
        self.skip_fixed(len as usize)
    }

    fn skip_string(&mut self) -> Result<(), CodecError> {
        self.skip_bytes()
    }

    fn skip_fixed(&mut self, size: usize) -> Result<(), CodecError> {
        if self.data.len() < size {
            return Err(Self::eof());
        }
        self.data = &self.data[size..];
        Ok(())
    }

    fn skip_array(&mut self) -> Result<u64, CodecError> {
        self.skip_block_count()
    }

    fn skip_map(&mut self) -> Result<u64, CodecError> {
        self.skip_block_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        // boolean true, int 300 (0xD8 0x04), float 1.0, double 2.0
        let mut data = vec![0x01, 0xD8, 0x04];
        data.extend_from_slice(&1.0f32.to_le_bytes());
        data.extend_from_slice(&2.0f64.to_le_bytes());

        let mut dec = BinaryDecoder::new(&data);
        assert!(dec.read_boolean().unwrap());
        assert_eq!(dec.read_int().unwrap(), 300);
        assert_eq!(dec.read_float().unwrap(), 1.0);
        assert_eq!(dec.read_double().unwrap(), 2.0);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_read_string() {
        // length 3, "abc"
        let data = [0x06, b'a', b'b', b'c'];
        let mut dec = BinaryDecoder::new(&data);
        assert_eq!(dec.read_string().unwrap(), "abc");
    }

    #[test]
    fn test_truncated_bytes_fails() {
        let data = [0x06, b'a'];
        let mut dec = BinaryDecoder::new(&data);
        assert!(matches!(dec.read_bytes(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_capacity_limit() {
        // declared block count 1000 with a 2-item limit
        let mut data = Vec::new();
        crate::binary::varint::encode_zigzag(1000, &mut data);
        let mut dec = BinaryDecoder::with_limits(
            &data,
            Limits {
                max_collection_items: 2,
            },
        );
        assert!(matches!(
            dec.read_array_start(),
            Err(CodecError::Capacity {
                declared: 1000,
                limit: 2
            })
        ));
    }

    #[test]
    fn test_negative_block_count_reads_byte_size() {
        // count -2, byte size 2, then two 1-byte items
        let mut data = Vec::new();
        crate::binary::varint::encode_zigzag(-2, &mut data);
        crate::binary::varint::encode_zigzag(2, &mut data);
        data.extend_from_slice(&[0x02, 0x04]);
        crate::binary::varint::encode_zigzag(0, &mut data);

        let mut dec = BinaryDecoder::new(&data);
        assert_eq!(dec.read_array_start().unwrap(), 2);
        assert_eq!(dec.read_int().unwrap(), 1);
        assert_eq!(dec.read_int().unwrap(), 2);
        assert_eq!(dec.array_next().unwrap(), 0);
    }
}

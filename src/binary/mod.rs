//! Binary wire codec.
//!
//! Variable-length integer primitives plus the [`BinaryDecoder`] and
//! [`BinaryEncoder`] implementations of the codec traits.

mod decoder;
mod encoder;
pub mod varint;

pub use decoder::{BinaryDecoder, Limits};
pub use encoder::BinaryEncoder;
pub use varint::{decode_varint, decode_zigzag, encode_varint, encode_zigzag, skip_varint};

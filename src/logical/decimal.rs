//! Decimal and big-integer logical types.
//!
//! `decimal` rides bytes or fixed holding the two's-complement unscaled
//! value, with the scale fixed by the schema; writes emit the
//! minimal-length big-endian form, padded only for fixed bases.
//! `big-integer` rides bytes holding a two's-complement value.

use num_bigint::{BigInt, Sign};

use crate::codec::{JsonExtensionDecoder, JsonExtensionEncoder};
use crate::error::CodecError;
use crate::logical::Conversion;
use crate::schema::{LogicalSchema, Schema};
use crate::value::{Decimal, Value};

/// `decimal` over bytes or fixed.
pub struct DecimalConversion;

impl DecimalConversion {
    fn check_precision(decimal: &Decimal, logical: &LogicalSchema) -> Result<(), CodecError> {
        let Some(precision) = logical.precision() else {
            return Ok(());
        };
        let digits = decimal.unscaled.magnitude().to_string().len() as u32;
        if digits > precision {
            return Err(CodecError::logical(
                "decimal",
                format!("{} digits exceed precision {}", digits, precision),
            ));
        }
        Ok(())
    }

    /// Sign-extend the minimal encoding up to a fixed size.
    fn pad_to(bytes: Vec<u8>, size: usize, sign: Sign) -> Result<Vec<u8>, CodecError> {
        if bytes.len() > size {
            return Err(CodecError::logical(
                "decimal",
                format!("unscaled value needs {} bytes, fixed holds {}", bytes.len(), size),
            ));
        }
        let fill = if sign == Sign::Minus { 0xFF } else { 0x00 };
        let mut out = vec![fill; size - bytes.len()];
        out.extend_from_slice(&bytes);
        Ok(out)
    }
}

impl Conversion for DecimalConversion {
    fn logical_type_name(&self) -> &'static str {
        "decimal"
    }

    fn from_wire(&self, wire: Value, logical: &LogicalSchema) -> Result<Value, CodecError> {
        let bytes = match wire {
            Value::Bytes(b) | Value::Fixed(b) => b,
            other => {
                return Err(CodecError::logical(
                    "decimal",
                    format!("expected bytes wire value, found {}", other.type_name()),
                ))
            }
        };
        let decimal = Decimal::from_be_bytes(&bytes, logical.scale());
        Self::check_precision(&decimal, logical)?;
        Ok(Value::Decimal(decimal))
    }

    fn to_wire(&self, value: &Value, logical: &LogicalSchema) -> Result<Value, CodecError> {
        let decimal = match value {
            Value::Decimal(d) => d.clone(),
            other => {
                return Err(CodecError::logical(
                    "decimal",
                    format!("cannot serialize {} as decimal", other.type_name()),
                ))
            }
        };
        let scaled = decimal.with_scale(logical.scale()).ok_or_else(|| {
            CodecError::logical(
                "decimal",
                format!(
                    "scale {} does not fit schema scale {}",
                    decimal.scale,
                    logical.scale()
                ),
            )
        })?;
        Self::check_precision(&scaled, logical)?;

        let bytes = scaled.to_be_bytes();
        match logical.base.as_ref() {
            Schema::Fixed(f) => {
                let sign = scaled.unscaled.sign();
                Ok(Value::Fixed(Self::pad_to(bytes, f.size, sign)?))
            }
            _ => Ok(Value::Bytes(bytes)),
        }
    }

    fn direct_json_decode(
        &self,
        decoder: &mut dyn JsonExtensionDecoder,
        logical: &LogicalSchema,
    ) -> Option<Result<Value, CodecError>> {
        let decimal = match decoder.read_big_decimal(&logical.base) {
            Ok(d) => d,
            Err(e) => return Some(Err(e)),
        };
        let scaled = match decimal.with_scale(logical.scale()) {
            Some(d) => d,
            None => {
                return Some(Err(CodecError::logical(
                    "decimal",
                    format!(
                        "scale {} does not fit schema scale {}",
                        decimal.scale,
                        logical.scale()
                    ),
                )))
            }
        };
        if let Err(e) = Self::check_precision(&scaled, logical) {
            return Some(Err(e));
        }
        Some(Ok(Value::Decimal(scaled)))
    }

    fn direct_json_encode(
        &self,
        value: &Value,
        encoder: &mut dyn JsonExtensionEncoder,
        logical: &LogicalSchema,
    ) -> Result<bool, CodecError> {
        let Value::Decimal(decimal) = value else {
            return Ok(false);
        };
        let scaled = decimal.with_scale(logical.scale()).ok_or_else(|| {
            CodecError::logical(
                "decimal",
                format!(
                    "scale {} does not fit schema scale {}",
                    decimal.scale,
                    logical.scale()
                ),
            )
        })?;
        encoder.write_decimal(&scaled, &logical.base)?;
        Ok(true)
    }
}

/// `big-integer` over bytes: two's complement.
pub struct BigIntegerConversion;

impl Conversion for BigIntegerConversion {
    fn logical_type_name(&self) -> &'static str {
        "big-integer"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::Bytes(b) => Ok(Value::BigInteger(BigInt::from_signed_bytes_be(&b))),
            other => Err(CodecError::logical(
                "big-integer",
                format!("expected bytes wire value, found {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::BigInteger(big) => Ok(Value::Bytes(big.to_signed_bytes_be())),
            Value::Long(v) => Ok(Value::Bytes(BigInt::from(*v).to_signed_bytes_be())),
            other => Err(CodecError::logical(
                "big-integer",
                format!("cannot serialize {} as big-integer", other.type_name()),
            )),
        }
    }

    fn direct_json_decode(
        &self,
        decoder: &mut dyn JsonExtensionDecoder,
        logical: &LogicalSchema,
    ) -> Option<Result<Value, CodecError>> {
        Some(
            decoder
                .read_big_integer(&logical.base)
                .map(Value::BigInteger),
        )
    }

    fn direct_json_encode(
        &self,
        value: &Value,
        encoder: &mut dyn JsonExtensionEncoder,
        logical: &LogicalSchema,
    ) -> Result<bool, CodecError> {
        let Value::BigInteger(big) = value else {
            return Ok(false);
        };
        encoder.write_big_integer(big, &logical.base)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decimal_schema(precision: u64, scale: u64) -> LogicalSchema {
        LogicalSchema::new(Schema::Bytes, "decimal")
            .with_property("precision", json!(precision))
            .with_property("scale", json!(scale))
    }

    #[test]
    fn test_decimal_wire_roundtrip() {
        let lt = decimal_schema(10, 2);
        let conv = DecimalConversion;
        let value = Value::Decimal(Decimal::new(12345, 2));

        let wire = conv.to_wire(&value, &lt).unwrap();
        assert_eq!(wire, Value::Bytes(vec![0x30, 0x39]));
        assert_eq!(conv.from_wire(wire, &lt).unwrap(), value);
    }

    #[test]
    fn test_decimal_scale_mismatch() {
        let lt = decimal_schema(10, 1);
        let conv = DecimalConversion;
        let value = Value::Decimal(Decimal::new(12345, 2));
        assert!(matches!(
            conv.to_wire(&value, &lt),
            Err(CodecError::LogicalType { .. })
        ));
    }

    #[test]
    fn test_decimal_precision_overflow() {
        let lt = decimal_schema(3, 2);
        let conv = DecimalConversion;
        let value = Value::Decimal(Decimal::new(12345, 2));
        assert!(matches!(
            conv.to_wire(&value, &lt),
            Err(CodecError::LogicalType { .. })
        ));
    }

    #[test]
    fn test_decimal_fixed_padding() {
        let lt = LogicalSchema::new(
            Schema::Fixed(crate::schema::FixedSchema::new("Dec", 4)),
            "decimal",
        )
        .with_property("precision", json!(10))
        .with_property("scale", json!(2));
        let conv = DecimalConversion;

        let wire = conv
            .to_wire(&Value::Decimal(Decimal::new(-2, 2)), &lt)
            .unwrap();
        assert_eq!(wire, Value::Fixed(vec![0xFF, 0xFF, 0xFF, 0xFE]));
    }

    #[test]
    fn test_big_integer_roundtrip() {
        let lt = LogicalSchema::new(Schema::Bytes, "big-integer");
        let conv = BigIntegerConversion;
        let value = Value::BigInteger(BigInt::from(-1234567890123456789i64));
        let wire = conv.to_wire(&value, &lt).unwrap();
        assert_eq!(conv.from_wire(wire, &lt).unwrap(), value);
    }
}

//! Decoded value tree.
//!
//! [`Value`] covers the wire shapes of every schema type plus the typed
//! views produced by logical-type conversions. Wire variants mirror the
//! binary encoding; typed variants are what conversions hand back once a
//! registered logical type has interpreted the wire value.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use num_bigint::BigInt;
use uuid::Uuid;

use crate::schema::Schema;

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Record fields in declaration order
    Record(Vec<(String, Value)>),
    /// Enum ordinal and symbol name
    Enum(u32, String),
    /// Array of values
    Array(Vec<Value>),
    /// Map with string keys, in encounter order
    Map(Vec<(String, Value)>),
    /// Union branch index and value
    Union(usize, Box<Value>),
    /// Fixed-size byte array
    Fixed(Vec<u8>),

    // Typed views produced by logical-type conversions
    /// Calendar date (`date` over int epoch days)
    Date(NaiveDate),
    /// Point on the UTC timeline (`timestamp-millis`/`-micros`, `instant`)
    Timestamp(DateTime<Utc>),
    /// A temporal value of varying granularity (`any_temporal`)
    Temporal(AnyTemporal),
    /// Arbitrary-precision fixed-scale decimal (`decimal`)
    Decimal(Decimal),
    /// Arbitrary-precision integer (`big-integer`)
    BigInteger(BigInt),
    /// UUID (`uuid` over string)
    Uuid(Uuid),
    /// Self-describing embedded value (`any` escape record)
    Any {
        /// The embedded value's schema
        schema: Box<Schema>,
        /// The decoded embedded value
        value: Box<Value>,
    },
}

impl Value {
    /// A short name for the value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Record(_) => "record",
            Value::Enum(..) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Union(..) => "union",
            Value::Fixed(_) => "fixed",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Temporal(_) => "temporal",
            Value::Decimal(_) => "decimal",
            Value::BigInteger(_) => "big-integer",
            Value::Uuid(_) => "uuid",
            Value::Any { .. } => "any",
        }
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Arbitrary-precision fixed-scale decimal number.
///
/// The unscaled value is exact; the numeric value is
/// `unscaled * 10^(-scale)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    /// The unscaled integer value
    pub unscaled: BigInt,
    /// Number of digits after the decimal point
    pub scale: u32,
}

impl Decimal {
    /// Create a decimal from an unscaled value and scale.
    pub fn new(unscaled: impl Into<BigInt>, scale: u32) -> Self {
        Self {
            unscaled: unscaled.into(),
            scale,
        }
    }

    /// Decode from big-endian two's complement unscaled bytes.
    pub fn from_be_bytes(bytes: &[u8], scale: u32) -> Self {
        Self {
            unscaled: BigInt::from_signed_bytes_be(bytes),
            scale,
        }
    }

    /// Encode the unscaled value as minimal-length big-endian two's
    /// complement bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.unscaled.to_signed_bytes_be()
    }

    /// Parse from decimal text such as `"123.45"` or `"-0.001"`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        if frac_part.contains(['e', 'E']) || int_part.contains(['e', 'E']) {
            // Exponent notation would silently shift the scale
            return None;
        }
        let digits: String = format!("{}{}", int_part, frac_part);
        let unscaled: BigInt = digits.parse().ok()?;
        Some(Self {
            unscaled,
            scale: frac_part.len() as u32,
        })
    }

    /// Rescale to `scale`, failing when digits would be dropped.
    pub fn with_scale(&self, scale: u32) -> Option<Self> {
        use num_bigint::Sign;
        if scale == self.scale {
            return Some(self.clone());
        }
        if scale > self.scale {
            let factor = BigInt::from(10u32).pow(scale - self.scale);
            return Some(Self {
                unscaled: &self.unscaled * factor,
                scale,
            });
        }
        let factor = BigInt::from(10u32).pow(self.scale - scale);
        let (quot, rem) = (&self.unscaled / &factor, &self.unscaled % &factor);
        if rem.sign() != Sign::NoSign {
            return None;
        }
        Some(Self {
            unscaled: quot,
            scale,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let negative = self.unscaled.sign() == num_bigint::Sign::Minus;
        let digits = self.unscaled.magnitude().to_string();
        let scale = self.scale as usize;
        let sign = if negative { "-" } else { "" };
        if digits.len() <= scale {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        } else {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        }
    }
}

/// A temporal value whose granularity is carried with it.
///
/// The JSON representation is the narrowest ISO-8601 form that
/// round-trips: a bare year, a year-month, a date, a time, or a full
/// date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyTemporal {
    /// A calendar year
    Year(i32),
    /// A calendar year and month
    YearMonth(i32, u32),
    /// A calendar date
    Date(NaiveDate),
    /// A time of day
    Time(NaiveTime),
    /// A date and time without zone
    DateTime(NaiveDateTime),
}

impl fmt::Display for AnyTemporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyTemporal::Year(y) => write!(f, "{:04}", y),
            AnyTemporal::YearMonth(y, m) => write!(f, "{:04}-{:02}", y, m),
            AnyTemporal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            AnyTemporal::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            AnyTemporal::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

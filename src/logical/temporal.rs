//! Temporal logical types.
//!
//! `date` rides an int of epoch days; `timestamp-millis` and
//! `timestamp-micros` ride longs of UTC epoch offsets; `instant` accepts
//! three wire shapes (a long of millis, a string with an optional
//! `format` property, or a record of `{epochSecond, nano}` or
//! `{millis}`); `any_temporal` rides a string and keeps whatever
//! granularity the text had.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::codec::JsonExtensionDecoder;
use crate::error::CodecError;
use crate::logical::Conversion;
use crate::schema::{LogicalSchema, Schema};
use crate::value::{AnyTemporal, Value};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const EPOCH_CE_DAYS: i32 = 719_163;

/// `date` over int: signed epoch days.
pub struct DateConversion;

impl Conversion for DateConversion {
    fn logical_type_name(&self) -> &'static str {
        "date"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::Int(days) => NaiveDate::from_num_days_from_ce_opt(days + EPOCH_CE_DAYS)
                .map(Value::Date)
                .ok_or_else(|| {
                    CodecError::logical("date", format!("epoch day {} out of range", days))
                }),
            other => Err(CodecError::logical(
                "date",
                format!("expected int wire value, found {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::Date(d) => Ok(Value::Int(d.num_days_from_ce() - EPOCH_CE_DAYS)),
            Value::Int(days) => Ok(Value::Int(*days)),
            other => Err(CodecError::logical(
                "date",
                format!("cannot serialize {} as date", other.type_name()),
            )),
        }
    }
}

/// `timestamp-millis` over long: UTC epoch milliseconds.
pub struct TimestampMillisConversion;

impl Conversion for TimestampMillisConversion {
    fn logical_type_name(&self) -> &'static str {
        "timestamp-millis"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::Long(ms) => timestamp_from_millis(ms, "timestamp-millis"),
            other => Err(CodecError::logical(
                "timestamp-millis",
                format!("expected long wire value, found {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::Timestamp(ts) => Ok(Value::Long(ts.timestamp_millis())),
            Value::Long(ms) => Ok(Value::Long(*ms)),
            other => Err(CodecError::logical(
                "timestamp-millis",
                format!("cannot serialize {} as timestamp", other.type_name()),
            )),
        }
    }
}

/// `timestamp-micros` over long: UTC epoch microseconds.
pub struct TimestampMicrosConversion;

impl Conversion for TimestampMicrosConversion {
    fn logical_type_name(&self) -> &'static str {
        "timestamp-micros"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::Long(us) => {
                let secs = us.div_euclid(1_000_000);
                let nanos = (us.rem_euclid(1_000_000) * 1_000) as u32;
                Utc.timestamp_opt(secs, nanos)
                    .single()
                    .map(Value::Timestamp)
                    .ok_or_else(|| {
                        CodecError::logical(
                            "timestamp-micros",
                            format!("epoch micros {} out of range", us),
                        )
                    })
            }
            other => Err(CodecError::logical(
                "timestamp-micros",
                format!("expected long wire value, found {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::Timestamp(ts) => Ok(Value::Long(ts.timestamp_micros())),
            Value::Long(us) => Ok(Value::Long(*us)),
            other => Err(CodecError::logical(
                "timestamp-micros",
                format!("cannot serialize {} as timestamp", other.type_name()),
            )),
        }
    }
}

/// `instant`: a point on the UTC timeline over one of three wire shapes.
pub struct InstantConversion;

impl InstantConversion {
    fn parse_text(text: &str, logical: &LogicalSchema) -> Result<DateTime<Utc>, CodecError> {
        match logical.format() {
            Some(format) => {
                // The format property uses strftime field specifiers
                if let Ok(dt) = DateTime::parse_from_str(text, format) {
                    return Ok(dt.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(text, format)
                    .map(|naive| Utc.from_utc_datetime(&naive))
                    .map_err(|e| {
                        CodecError::logical(
                            "instant",
                            format!("'{}' does not match format '{}': {}", text, format, e),
                        )
                    })
            }
            None => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    CodecError::logical("instant", format!("invalid instant '{}': {}", text, e))
                }),
        }
    }

    fn render_text(ts: &DateTime<Utc>, logical: &LogicalSchema) -> String {
        match logical.format() {
            Some(format) => ts.format(format).to_string(),
            None => ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
        }
    }

    fn from_record(fields: &[(String, Value)]) -> Result<DateTime<Utc>, CodecError> {
        let get = |name: &str| fields.iter().find(|(n, _)| n == name).map(|(_, v)| v);
        if let Some(Value::Long(ms)) = get("millis") {
            return Utc.timestamp_millis_opt(*ms).single().ok_or_else(|| {
                CodecError::logical("instant", format!("epoch millis {} out of range", ms))
            });
        }
        let (second, nano) = match (get("epochSecond"), get("nano")) {
            (Some(Value::Long(s)), Some(Value::Int(n))) => (*s, *n),
            _ => {
                return Err(CodecError::logical(
                    "instant",
                    "record shape needs {epochSecond, nano} or {millis}",
                ))
            }
        };
        Utc.timestamp_opt(second, nano as u32)
            .single()
            .ok_or_else(|| {
                CodecError::logical("instant", format!("epoch second {} out of range", second))
            })
    }
}

impl Conversion for InstantConversion {
    fn logical_type_name(&self) -> &'static str {
        "instant"
    }

    fn from_wire(&self, wire: Value, logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::Long(ms) => timestamp_from_millis(ms, "instant"),
            Value::String(s) => Self::parse_text(&s, logical).map(Value::Timestamp),
            Value::Record(fields) => Self::from_record(&fields).map(Value::Timestamp),
            other => Err(CodecError::logical(
                "instant",
                format!("unsupported wire shape {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, logical: &LogicalSchema) -> Result<Value, CodecError> {
        let ts = match value {
            Value::Timestamp(ts) => *ts,
            Value::Long(ms) => return Ok(Value::Long(*ms)),
            other => {
                return Err(CodecError::logical(
                    "instant",
                    format!("cannot serialize {} as instant", other.type_name()),
                ))
            }
        };
        match logical.base.as_ref() {
            Schema::Long => Ok(Value::Long(ts.timestamp_millis())),
            Schema::String => Ok(Value::String(Self::render_text(&ts, logical))),
            Schema::Record(r) => {
                if r.field("millis").is_some() {
                    return Ok(Value::Record(vec![(
                        "millis".to_string(),
                        Value::Long(ts.timestamp_millis()),
                    )]));
                }
                Ok(Value::Record(vec![
                    ("epochSecond".to_string(), Value::Long(ts.timestamp())),
                    (
                        "nano".to_string(),
                        Value::Int(ts.timestamp_subsec_nanos() as i32),
                    ),
                ]))
            }
            other => Err(CodecError::logical(
                "instant",
                format!("unsupported base schema {}", other.branch_label()),
            )),
        }
    }
}

/// `any_temporal` over string: parses any of date-time, date,
/// year-month, year, or time, and emits the narrowest round-tripping
/// form.
pub struct AnyTemporalConversion;

impl AnyTemporalConversion {
    /// Parse text into the narrowest temporal shape that captures it.
    pub fn parse(text: &str) -> Result<AnyTemporal, CodecError> {
        let text = text.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(AnyTemporal::DateTime(dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Ok(AnyTemporal::Date(d));
        }
        if let Some((y, m)) = parse_year_month(text) {
            return Ok(AnyTemporal::YearMonth(y, m));
        }
        if let Ok(t) = NaiveTime::parse_from_str(text, "%H:%M:%S%.f") {
            return Ok(AnyTemporal::Time(t));
        }
        if let Ok(y) = text.parse::<i32>() {
            return Ok(AnyTemporal::Year(y));
        }
        Err(CodecError::logical(
            "any_temporal",
            format!("'{}' is not a recognized temporal form", text),
        ))
    }
}

impl Conversion for AnyTemporalConversion {
    fn logical_type_name(&self) -> &'static str {
        "any_temporal"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::String(s) => Self::parse(&s).map(Value::Temporal),
            other => Err(CodecError::logical(
                "any_temporal",
                format!("expected string wire value, found {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::Temporal(t) => Ok(Value::String(t.to_string())),
            Value::Date(d) => Ok(Value::String(AnyTemporal::Date(*d).to_string())),
            other => Err(CodecError::logical(
                "any_temporal",
                format!("cannot serialize {} as a temporal", other.type_name()),
            )),
        }
    }

    fn direct_json_decode(
        &self,
        decoder: &mut dyn JsonExtensionDecoder,
        logical: &LogicalSchema,
    ) -> Option<Result<Value, CodecError>> {
        // The plain string read suffices, but going through the tree
        // keeps numeric year tokens acceptable
        let tree = match decoder.read_value_as_tree(&logical.base) {
            Ok(tree) => tree,
            Err(e) => return Some(Err(e)),
        };
        let text = match tree {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Some(Err(CodecError::logical(
                    "any_temporal",
                    format!("unsupported JSON shape {}", other),
                )))
            }
        };
        Some(Self::parse(&text).map(Value::Temporal))
    }
}

/// `-10-02` style year-months are signed; split on the last dash.
fn parse_year_month(text: &str) -> Option<(i32, u32)> {
    let (year_part, month_part) = text.rsplit_once('-')?;
    if year_part.is_empty() {
        return None;
    }
    let year: i32 = year_part.parse().ok()?;
    let month: u32 = month_part.parse().ok()?;
    if !(1..=12).contains(&month) || month_part.len() != 2 {
        return None;
    }
    Some((year, month))
}

fn timestamp_from_millis(ms: i64, logical_type: &str) -> Result<Value, CodecError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(Value::Timestamp)
        .ok_or_else(|| {
            CodecError::logical(logical_type, format!("epoch millis {} out of range", ms))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_temporal_narrowest_forms() {
        assert_eq!(
            AnyTemporalConversion::parse("2020-05-06").unwrap(),
            AnyTemporal::Date(NaiveDate::from_ymd_opt(2020, 5, 6).unwrap())
        );
        assert_eq!(
            AnyTemporalConversion::parse("2020-05").unwrap(),
            AnyTemporal::YearMonth(2020, 5)
        );
        assert_eq!(
            AnyTemporalConversion::parse("2020").unwrap(),
            AnyTemporal::Year(2020)
        );
        assert_eq!(
            AnyTemporalConversion::parse("-0010-02").unwrap(),
            AnyTemporal::YearMonth(-10, 2)
        );
    }

    #[test]
    fn test_any_temporal_display_roundtrip() {
        for text in ["2020-05-06", "2020-05", "12:30:45", "2020-05-06T12:30:45"] {
            let parsed = AnyTemporalConversion::parse(text).unwrap();
            assert_eq!(
                AnyTemporalConversion::parse(&parsed.to_string()).unwrap(),
                parsed
            );
        }
    }

    #[test]
    fn test_date_epoch_days() {
        let lt = LogicalSchema::new(Schema::Int, "date");
        let conv = DateConversion;
        let typed = conv.from_wire(Value::Int(0), &lt).unwrap();
        assert_eq!(
            typed,
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        );
        assert_eq!(conv.to_wire(&typed, &lt).unwrap(), Value::Int(0));
    }
}

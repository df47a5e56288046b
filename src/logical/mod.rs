//! Logical type dispatch.
//!
//! A logical type layers a typed view over a primitive wire schema. Each
//! registered [`Conversion`] maps wire values to typed values and back,
//! and may take over the JSON representation entirely through the
//! extension hooks. The registry travels in a [`DatumModel`] passed to
//! datum readers and writers; there is no process-global state.

mod any;
mod decimal;
mod temporal;

pub use any::AnyConversion;
pub use decimal::{BigIntegerConversion, DecimalConversion};
pub use temporal::{
    AnyTemporalConversion, DateConversion, InstantConversion, TimestampMicrosConversion,
    TimestampMillisConversion,
};

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::codec::{JsonExtensionDecoder, JsonExtensionEncoder};
use crate::error::CodecError;
use crate::schema::LogicalSchema;
use crate::value::Value;

/// Bidirectional mapping between typed values and their wire shapes.
///
/// Round-trip property: `from_wire(to_wire(v)) == v` for every value the
/// conversion accepts, modulo the logical type's declared precision.
pub trait Conversion: Send + Sync {
    /// The logical type name this conversion serves.
    fn logical_type_name(&self) -> &'static str;

    /// Interpret a wire value as a typed value.
    fn from_wire(&self, wire: Value, logical: &LogicalSchema) -> Result<Value, CodecError>;

    /// Reduce a typed value to its wire shape.
    fn to_wire(&self, value: &Value, logical: &LogicalSchema) -> Result<Value, CodecError>;

    /// Consume the JSON representation directly instead of the wire
    /// value. `None` means the caller performs the primitive read and
    /// converts through [`Conversion::from_wire`].
    fn direct_json_decode(
        &self,
        _decoder: &mut dyn JsonExtensionDecoder,
        _logical: &LogicalSchema,
    ) -> Option<Result<Value, CodecError>> {
        None
    }

    /// Emit the JSON representation directly. Returning `Ok(false)`
    /// declines, and the caller falls back to
    /// [`Conversion::to_wire`] plus a primitive write.
    fn direct_json_encode(
        &self,
        _value: &Value,
        _encoder: &mut dyn JsonExtensionEncoder,
        _logical: &LogicalSchema,
    ) -> Result<bool, CodecError> {
        Ok(false)
    }
}

/// Registry of conversions by logical type name.
#[derive(Clone, Default)]
pub struct ConversionRegistry {
    by_name: HashMap<String, Arc<dyn Conversion>>,
}

impl std::fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ConversionRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ConversionRegistry {
    /// An empty registry; reads expose raw wire values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard catalogue.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.defaults();
        registry
    }

    /// Register a conversion by its logical type name, replacing any
    /// prior registration.
    pub fn add(&mut self, conversion: Arc<dyn Conversion>) {
        self.by_name
            .insert(conversion.logical_type_name().to_string(), conversion);
    }

    /// Deregister; subsequent reads expose raw wire values.
    pub fn remove(&mut self, name: &str) -> bool {
        self.by_name.remove(name).is_some()
    }

    /// Drop all registrations.
    pub fn clear(&mut self) {
        self.by_name.clear();
    }

    /// Install the standard catalogue.
    pub fn defaults(&mut self) {
        self.add(Arc::new(DateConversion));
        self.add(Arc::new(TimestampMillisConversion));
        self.add(Arc::new(TimestampMicrosConversion));
        self.add(Arc::new(InstantConversion));
        self.add(Arc::new(AnyTemporalConversion));
        self.add(Arc::new(DecimalConversion));
        self.add(Arc::new(BigIntegerConversion));
        self.add(Arc::new(UuidConversion));
        self.add(Arc::new(AnyConversion));
    }

    /// Look up the conversion for a logical type name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Conversion>> {
        self.by_name.get(name)
    }
}

/// How string-typed fields surface in decoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringRepresentation {
    /// Native owned strings
    #[default]
    Native,
    /// Raw UTF-8 byte views
    Utf8Bytes,
}

/// The context a datum reader or writer operates in: the conversion
/// registry and the string representation setting.
///
/// Configure one at startup and share it; mutating the registry while a
/// decode is in flight is not supported.
#[derive(Debug, Clone)]
pub struct DatumModel {
    /// Registered logical-type conversions
    pub registry: ConversionRegistry,
    /// String field representation
    pub string_representation: StringRepresentation,
}

impl Default for DatumModel {
    fn default() -> Self {
        Self {
            registry: ConversionRegistry::standard(),
            string_representation: StringRepresentation::Native,
        }
    }
}

impl DatumModel {
    /// A model with the standard conversion catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A model with no conversions; reads expose raw wire values.
    pub fn raw() -> Self {
        Self {
            registry: ConversionRegistry::new(),
            string_representation: StringRepresentation::Native,
        }
    }
}

/// `uuid` over string: canonical 8-4-4-4-12 hex form.
pub struct UuidConversion;

impl Conversion for UuidConversion {
    fn logical_type_name(&self) -> &'static str {
        "uuid"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match wire {
            Value::String(s) => Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|e| CodecError::logical("uuid", format!("invalid uuid '{}': {}", s, e))),
            other => Err(CodecError::logical(
                "uuid",
                format!("expected string wire value, found {}", other.type_name()),
            )),
        }
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::Uuid(u) => Ok(Value::String(u.hyphenated().to_string())),
            Value::String(s) => Ok(Value::String(s.clone())),
            other => Err(CodecError::logical(
                "uuid",
                format!("cannot serialize {} as uuid", other.type_name()),
            )),
        }
    }
}

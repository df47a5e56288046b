//! Error types for the codec engine

use thiserror::Error;

/// Errors that can occur during schema parsing and validation
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Invalid schema document
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Unsupported schema type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// Schema JSON parsing error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Named type reference that cannot be linked within its parse scope
    #[error("Unresolved named type: {0}")]
    UnresolvedName(String),
    /// Incompatible writer/reader schema pair
    #[error("Incompatible schemas: {0}")]
    IncompatibleSchemas(String),
}

/// Errors surfaced by `read`/`write` calls.
///
/// This is a closed set; every decode or encode failure maps onto exactly
/// one of these variants. Failures are unrecoverable for the current value
/// and leave the stream positioned where the failure was detected.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Truncated or invalid wire bytes
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// Parser expected one symbol but observed another
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The symbol the grammar expected next
        expected: String,
        /// What the input actually presented
        found: String,
    },

    /// Reader field absent from the writer with no default to fall back on
    #[error("Missing field '{0}' with no default")]
    MissingField(String),

    /// Strict JSON mode saw a field the reader schema does not know
    #[error("Unknown fields: {0}")]
    UnknownField(String),

    /// Named-type reference could not be linked
    #[error("Unresolved schema reference: {0}")]
    UnresolvedSchema(String),

    /// A logical-type conversion rejected a value
    #[error("Logical type '{logical_type}': {message}")]
    LogicalType {
        /// Name of the logical type whose conversion failed
        logical_type: String,
        /// What the conversion objected to
        message: String,
        /// Underlying decode failure, when the conversion wraps one
        #[source]
        source: Option<Box<CodecError>>,
    },

    /// Value does not match any union branch on write, or the branch tag
    /// is missing on JSON read
    #[error("Union branch error: {0}")]
    UnionBranch(String),

    /// Declared array/map count exceeds the configured safety limit
    #[error("Declared count {declared} exceeds limit {limit}")]
    Capacity {
        /// The count the wire declared
        declared: u64,
        /// The configured ceiling
        limit: u64,
    },
}

impl CodecError {
    /// Build a `TypeMismatch` from two displayable positions.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Build a `LogicalType` error with no underlying cause.
    pub fn logical(logical_type: &str, message: impl Into<String>) -> Self {
        CodecError::LogicalType {
            logical_type: logical_type.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying codec failure as a logical-type error for
    /// diagnostic clarity, keeping the cause chained.
    pub fn logical_caused(
        logical_type: &str,
        message: impl Into<String>,
        cause: CodecError,
    ) -> Self {
        CodecError::LogicalType {
            logical_type: logical_type.to_string(),
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }
}

impl From<SchemaError> for CodecError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnresolvedName(name) => CodecError::UnresolvedSchema(name),
            other => CodecError::Malformed(other.to_string()),
        }
    }
}

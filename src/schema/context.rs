//! Named-type resolution context.
//!
//! Decoders and grammar compilers walk schemas that may carry `Named`
//! references; this context maps fully qualified names to their
//! definitions so those references can be linked on the fly.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::schema::Schema;

/// A registry of named types (records, enums, fixed) by fully qualified
/// name, scoped to one schema document.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    named_types: HashMap<String, Schema>,
}

impl SchemaContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context by extracting every named type defined in `schema`.
    ///
    /// Recursively traverses the tree; the first occurrence of a named
    /// type is its definition, later occurrences are references.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut context = Self::new();
        context.extract(schema);
        context
    }

    /// Register a named type.
    pub fn register(&mut self, name: String, schema: Schema) {
        self.named_types.insert(name, schema);
    }

    /// Get a named type by fully qualified name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.named_types.get(name)
    }

    /// Follow a `Named` reference to its definition; non-references pass
    /// through unchanged.
    pub fn deref<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema, SchemaError> {
        match schema {
            Schema::Named(name) => self
                .get(name)
                .ok_or_else(|| SchemaError::UnresolvedName(name.clone())),
            other => Ok(other),
        }
    }

    fn extract(&mut self, schema: &Schema) {
        match schema {
            Schema::Record(record) => {
                self.named_types.insert(record.fullname(), schema.clone());
                for field in &record.fields {
                    self.extract(&field.schema);
                }
            }
            Schema::Enum(e) => {
                self.named_types.insert(e.fullname(), schema.clone());
            }
            Schema::Fixed(f) => {
                self.named_types.insert(f.fullname(), schema.clone());
            }
            Schema::Array(items) => self.extract(items),
            Schema::Map(values) => self.extract(values),
            Schema::Union(branches) => {
                for branch in branches {
                    self.extract(branch);
                }
            }
            Schema::Logical(l) => self.extract(&l.base),
            // Primitives and Named references define nothing
            _ => {}
        }
    }
}

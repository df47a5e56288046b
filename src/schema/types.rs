//! Schema types and representations.
//!
//! This module defines the complete schema type system including
//! primitives, complex types, named-type references, open property maps,
//! and logical-type bindings.

use serde_json::{json, Map, Value};

/// Represents a schema.
///
/// Supports all primitive types, complex types, named type references, and
/// logical-type wrappers over a base schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(Box<Schema>),
    /// Map with string keys and values of a single schema.
    Map(Box<Schema>),
    /// Union of multiple schemas.
    Union(Vec<Schema>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),

    /// Named type reference, carrying the pending fully qualified name
    /// until linked within its parse scope.
    Named(String),

    /// Logical type binding over a base schema.
    Logical(LogicalSchema),
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record, in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this record.
    pub aliases: Vec<String>,
    /// Whether this record is an error type.
    pub is_error: bool,
    /// Open key-value properties not consumed by the schema model itself.
    pub properties: Map<String, Value>,
}

impl RecordSchema {
    /// Create a new RecordSchema with the given name and fields.
    ///
    /// Field positions are assigned from declaration order.
    pub fn new(name: impl Into<String>, mut fields: Vec<FieldSchema>) -> Self {
        for (pos, field) in fields.iter_mut().enumerate() {
            field.position = pos;
        }
        Self {
            name: name.into(),
            namespace: None,
            fields,
            doc: None,
            aliases: Vec::new(),
            is_error: false,
            properties: Map::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Look up a field by name, ignoring aliases.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Serialize the record schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "type".to_string(),
            json!(if self.is_error { "error" } else { "record" }),
        );
        obj.insert("name".to_string(), json!(&self.name));

        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        let fields: Vec<Value> = self.fields.iter().map(|f| f.to_json_value()).collect();
        obj.insert("fields".to_string(), Value::Array(fields));

        for (key, value) in &self.properties {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(obj)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: Schema,
    /// Optional default value for the field, as schema JSON.
    pub default: Option<Value>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Field ordering (ascending, descending, ignore).
    pub order: FieldOrder,
    /// Aliases for this field.
    pub aliases: Vec<String>,
    /// 0-indexed declaration slot; reorder logic operates on this.
    pub position: usize,
    /// Open key-value properties.
    pub properties: Map<String, Value>,
}

impl FieldSchema {
    /// Create a new FieldSchema with the given name and schema.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
            order: FieldOrder::Ascending,
            aliases: Vec::new(),
            position: 0,
            properties: Map::new(),
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether `name` is this field's name or one of its aliases.
    pub fn responds_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Serialize the field schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("type".to_string(), self.schema.to_json_value());

        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if self.order != FieldOrder::Ascending {
            obj.insert("order".to_string(), json!(self.order.as_str()));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }
        for (key, value) in &self.properties {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(obj)
    }
}

/// Field ordering for record comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    /// The schema-JSON spelling of this ordering.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols (variants) of the enum, in ordinal order.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this enum.
    pub aliases: Vec<String>,
    /// Default symbol, used when resolving unknown writer ordinals.
    pub default: Option<String>,
    /// Open key-value properties.
    pub properties: Map<String, Value>,
}

impl EnumSchema {
    /// Create a new EnumSchema with the given name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            symbols,
            doc: None,
            aliases: Vec::new(),
            default: None,
            properties: Map::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Get the ordinal of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Serialize the enum schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("enum"));
        obj.insert("name".to_string(), json!(&self.name));

        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        obj.insert("symbols".to_string(), json!(&self.symbols));

        if let Some(default) = &self.default {
            obj.insert("default".to_string(), json!(default));
        }
        for (key, value) in &self.properties {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(obj)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this fixed type.
    pub aliases: Vec<String>,
    /// Open key-value properties.
    pub properties: Map<String, Value>,
}

impl FixedSchema {
    /// Create a new FixedSchema with the given name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            size,
            doc: None,
            aliases: Vec::new(),
            properties: Map::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Serialize the fixed schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("fixed"));
        obj.insert("name".to_string(), json!(&self.name));

        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        obj.insert("size".to_string(), json!(self.size));

        for (key, value) in &self.properties {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(obj)
    }
}

/// Logical type binding over a base schema.
///
/// The binding carries the logical type name and its parameter properties
/// (`precision`, `scale`, `format`, ...); the conversion that interprets
/// them is looked up in the conversion registry at read/write time.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSchema {
    /// The underlying wire schema.
    pub base: Box<Schema>,
    /// The logical type name, e.g. `"timestamp-millis"`.
    pub name: String,
    /// Parameter properties consumed structurally by conversions.
    pub properties: Map<String, Value>,
}

impl LogicalSchema {
    /// Create a new logical binding with no parameters.
    pub fn new(base: Schema, name: impl Into<String>) -> Self {
        Self {
            base: Box::new(base),
            name: name.into(),
            properties: Map::new(),
        }
    }

    /// Attach a parameter property.
    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    /// The `precision` parameter, if present and integral.
    pub fn precision(&self) -> Option<u32> {
        self.properties
            .get("precision")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
    }

    /// The `scale` parameter; absent means 0.
    pub fn scale(&self) -> u32 {
        self.properties
            .get("scale")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(0)
    }

    /// The `format` parameter, if present.
    pub fn format(&self) -> Option<&str> {
        self.properties.get("format").and_then(|v| v.as_str())
    }

    /// Serialize the logical type to a JSON Value.
    ///
    /// The binding serializes as the base type object with an added
    /// `logicalType` key and its parameter properties.
    pub fn to_json_value(&self) -> Value {
        let base_value = self.base.to_json_value();
        let mut obj = match base_value {
            Value::Object(m) => m,
            other => {
                let mut m = Map::new();
                m.insert("type".to_string(), other);
                m
            }
        };

        obj.insert("logicalType".to_string(), json!(&self.name));
        for (key, value) in &self.properties {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(obj)
    }
}

impl Schema {
    /// Check if this schema is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Schema::Null
                | Schema::Boolean
                | Schema::Int
                | Schema::Long
                | Schema::Float
                | Schema::Double
                | Schema::Bytes
                | Schema::String
        )
    }

    /// Check if this schema is a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(self, Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_))
    }

    /// Strip a logical binding, yielding the wire schema.
    pub fn base(&self) -> &Schema {
        match self {
            Schema::Logical(l) => &l.base,
            other => other,
        }
    }

    /// The logical binding on this node, if any.
    pub fn logical(&self) -> Option<&LogicalSchema> {
        match self {
            Schema::Logical(l) => Some(l),
            _ => None,
        }
    }

    /// Get the name of a named type, if applicable.
    pub fn name(&self) -> Option<&str> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed(f) => Some(&f.name),
            Schema::Named(n) => Some(n),
            Schema::Logical(l) => l.base.name(),
            _ => None,
        }
    }

    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            Schema::Record(r) => Some(r.fullname()),
            Schema::Enum(e) => Some(e.fullname()),
            Schema::Fixed(f) => Some(f.fullname()),
            Schema::Named(n) => Some(n.clone()),
            Schema::Logical(l) => l.base.fullname(),
            _ => None,
        }
    }

    /// The aliases declared on a named type.
    pub fn aliases(&self) -> &[String] {
        match self {
            Schema::Record(r) => &r.aliases,
            Schema::Enum(e) => &e.aliases,
            Schema::Fixed(f) => &f.aliases,
            Schema::Logical(l) => l.base.aliases(),
            _ => &[],
        }
    }

    /// Check if this schema represents a nullable type (union with null).
    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Union(branches) => branches.iter().any(|v| matches!(v.base(), Schema::Null)),
            _ => false,
        }
    }

    /// For a two-branch nullable union, get the non-null schema.
    pub fn nullable_inner(&self) -> Option<&Schema> {
        match self {
            Schema::Union(branches) if branches.len() == 2 => {
                branches.iter().find(|v| !matches!(v.base(), Schema::Null))
            }
            _ => None,
        }
    }

    /// The label identifying this schema as a union branch: the fully
    /// qualified name for named types, the type name otherwise.
    pub fn branch_label(&self) -> String {
        match self.base() {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Int => "int".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Float => "float".to_string(),
            Schema::Double => "double".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::String => "string".to_string(),
            Schema::Array(_) => "array".to_string(),
            Schema::Map(_) => "map".to_string(),
            Schema::Union(_) => "union".to_string(),
            other => other.fullname().unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// Serialize the schema to a JSON string.
    ///
    /// This produces canonical schema JSON that can be parsed back to an
    /// equivalent schema.
    pub fn to_json(&self) -> String {
        let value = self.to_json_value();
        serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
    }

    /// Serialize the schema to a JSON Value.
    ///
    /// This is useful when you need to embed the schema in a larger JSON
    /// structure.
    pub fn to_json_value(&self) -> Value {
        match self {
            // Primitive types serialize as simple strings
            Schema::Null => json!("null"),
            Schema::Boolean => json!("boolean"),
            Schema::Int => json!("int"),
            Schema::Long => json!("long"),
            Schema::Float => json!("float"),
            Schema::Double => json!("double"),
            Schema::Bytes => json!("bytes"),
            Schema::String => json!("string"),

            // Complex types
            Schema::Record(r) => r.to_json_value(),
            Schema::Enum(e) => e.to_json_value(),
            Schema::Array(items) => {
                json!({
                    "type": "array",
                    "items": items.to_json_value()
                })
            }
            Schema::Map(values) => {
                json!({
                    "type": "map",
                    "values": values.to_json_value()
                })
            }
            Schema::Union(branches) => {
                Value::Array(branches.iter().map(|v| v.to_json_value()).collect())
            }
            Schema::Fixed(f) => f.to_json_value(),

            // Named type reference - just the name string
            Schema::Named(name) => json!(name),

            // Logical type binding
            Schema::Logical(l) => l.to_json_value(),
        }
    }
}

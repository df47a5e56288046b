//! JSON schema parser.
//!
//! Parses schema JSON documents into the [`Schema`] type hierarchy,
//! resolving named-type references within a parse scope and binding
//! logical types declared through the `logicalType` property.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::SchemaError;
use crate::schema::{
    EnumSchema, FieldOrder, FieldSchema, FixedSchema, LogicalSchema, RecordSchema, Schema,
};

/// Keys consumed structurally per schema shape; everything else lands in
/// the node's open property map.
const RECORD_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "fields"];
const ENUM_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "symbols", "default"];
const FIXED_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "size"];
const FIELD_KEYS: &[&str] = &["name", "type", "doc", "default", "order", "aliases"];
const PRIMITIVE_KEYS: &[&str] = &["type"];

/// Parse a schema from a JSON string.
///
/// # Example
/// ```
/// use contrail::schema::parse_schema;
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// ```
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse a schema from a JSON string with validation options.
///
/// In strict mode:
/// - Union types cannot contain duplicate unnamed types
/// - Union types cannot contain nested unions
/// - Names must start with a letter or underscore and contain only
///   alphanumerics and underscores
///
/// In permissive mode (default), these violations are logged as warnings
/// but do not fail parsing, maximizing compatibility with existing data.
pub fn parse_schema_with_options(json: &str, strict: bool) -> Result<Schema, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))?;

    let mut parser = SchemaParser::new().with_strict(strict);
    parser.parse(&value)
}

/// Schema parser with named type resolution context.
///
/// Maintains a registry of named types (records, enums, fixed) for
/// resolving type references during parsing.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Registry of named types by their fully qualified name
    named_types: HashMap<String, Schema>,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
    /// Whether to enforce strict schema validation
    strict_schema: bool,
}

impl SchemaParser {
    /// Create a new SchemaParser with default settings (permissive mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to use strict schema validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Parse a JSON value into a Schema.
    pub fn parse(&mut self, value: &Value) -> Result<Schema, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            _ => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {:?}",
                value
            ))),
        }
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(&self, s: &str) -> Result<Schema, SchemaError> {
        match s {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "float" => Ok(Schema::Float),
            "double" => Ok(Schema::Double),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            name => {
                // Named reference; it may be defined later or recursively,
                // so the pending name is carried until linked.
                Ok(Schema::Named(self.resolve_name(name)))
            }
        }
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<Schema, SchemaError> {
        let type_str = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        let base = match type_str {
            "null" => Schema::Null,
            "boolean" => Schema::Boolean,
            "int" => Schema::Int,
            "long" => Schema::Long,
            "float" => Schema::Float,
            "double" => Schema::Double,
            "bytes" => Schema::Bytes,
            "string" => Schema::String,

            "record" | "error" => self.parse_record_schema(obj, type_str == "error")?,
            "enum" => self.parse_enum_schema(obj)?,
            "array" => self.parse_array_schema(obj)?,
            "map" => self.parse_map_schema(obj)?,
            "fixed" => self.parse_fixed_schema(obj)?,

            other => {
                let fullname = self.resolve_name(other);
                if self.named_types.contains_key(&fullname) {
                    Schema::Named(fullname)
                } else {
                    return Err(SchemaError::UnsupportedType(format!(
                        "Unknown type: {}",
                        other
                    )));
                }
            }
        };

        self.maybe_wrap_logical(obj, base)
    }

    /// Bind a logical type when the object declares one; parameter
    /// properties ride along on the binding.
    fn maybe_wrap_logical(
        &mut self,
        obj: &Map<String, Value>,
        base: Schema,
    ) -> Result<Schema, SchemaError> {
        let Some(name) = obj.get("logicalType").and_then(|v| v.as_str()) else {
            return Ok(base);
        };

        let mut properties = Map::new();
        for (key, value) in obj {
            if key == "logicalType" || key == "type" || self.is_structural_key(&base, key) {
                continue;
            }
            properties.insert(key.clone(), value.clone());
        }

        if name == "decimal" && !properties.contains_key("precision") {
            return Err(SchemaError::InvalidSchema(
                "decimal logical type requires 'precision'".to_string(),
            ));
        }

        Ok(Schema::Logical(LogicalSchema {
            base: Box::new(base),
            name: name.to_string(),
            properties,
        }))
    }

    fn is_structural_key(&self, base: &Schema, key: &str) -> bool {
        let keys = match base {
            Schema::Record(_) => RECORD_KEYS,
            Schema::Enum(_) => ENUM_KEYS,
            Schema::Fixed(_) => FIXED_KEYS,
            _ => PRIMITIVE_KEYS,
        };
        keys.contains(&key)
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<Schema, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let branches: Result<Vec<Schema>, SchemaError> =
            arr.iter().map(|v| self.parse(v)).collect();
        let branches = branches?;

        self.validate_union(&branches)?;

        Ok(Schema::Union(branches))
    }

    /// Enforce union invariants: no nested unions and at most one of each
    /// non-named type.
    fn validate_union(&self, branches: &[Schema]) -> Result<(), SchemaError> {
        let mut seen = Vec::new();
        for branch in branches {
            if matches!(branch.base(), Schema::Union(_)) {
                let msg = "Union cannot immediately contain another union".to_string();
                if self.strict_schema {
                    return Err(SchemaError::InvalidSchema(msg));
                }
                warn!("{}", msg);
                continue;
            }
            let label = branch.branch_label();
            if !branch.is_named() && seen.contains(&label) {
                let msg = format!("Duplicate type in union: {}", label);
                if self.strict_schema {
                    return Err(SchemaError::InvalidSchema(msg));
                }
                warn!("{}", msg);
            }
            seen.push(label);
        }
        Ok(())
    }

    /// Parse a record schema.
    fn parse_record_schema(
        &mut self,
        obj: &Map<String, Value>,
        is_error: bool,
    ) -> Result<Schema, SchemaError> {
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Record missing 'name' field".to_string()))?
            .to_string();

        self.validate_name(&name, "Record")?;

        let namespace = obj
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(String::from);

        let (fullname, prev_namespace) = self.enter_named_scope(&name, namespace.clone());

        // Register a placeholder before parsing fields so recursive
        // references link back to this record.
        self.named_types
            .insert(fullname.clone(), Schema::Named(fullname.clone()));

        let doc = obj.get("doc").and_then(|v| v.as_str()).map(String::from);
        let aliases = parse_aliases(obj);

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema("Record missing 'fields' array".to_string())
            })?;

        let mut fields = Vec::with_capacity(fields_value.len());
        for (position, field_value) in fields_value.iter().enumerate() {
            let mut field = self.parse_field_schema(field_value)?;
            field.position = position;
            fields.push(field);
        }

        self.current_namespace = prev_namespace;

        let record = RecordSchema {
            name: simple_name(&name),
            namespace: namespace_of(&fullname, namespace),
            fields,
            doc,
            aliases,
            is_error,
            properties: extra_properties(obj, RECORD_KEYS),
        };

        let schema = Schema::Record(record);
        self.named_types.insert(fullname, schema.clone());

        Ok(schema)
    }

    /// Parse a field schema within a record.
    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();

        self.validate_name(&name, "Field")?;

        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'type'".to_string()))?;

        let schema = self.parse(type_value)?;
        let default = obj.get("default").cloned();
        let doc = obj.get("doc").and_then(|v| v.as_str()).map(String::from);

        let order = obj
            .get("order")
            .and_then(|v| v.as_str())
            .map(|s| match s {
                "descending" => FieldOrder::Descending,
                "ignore" => FieldOrder::Ignore,
                _ => FieldOrder::Ascending,
            })
            .unwrap_or(FieldOrder::Ascending);

        Ok(FieldSchema {
            name,
            schema,
            default,
            doc,
            order,
            aliases: parse_aliases(obj),
            position: 0,
            properties: extra_properties(obj, FIELD_KEYS),
        })
    }

    /// Parse an enum schema.
    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<Schema, SchemaError> {
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Enum missing 'name' field".to_string()))?
            .to_string();

        self.validate_name(&name, "Enum")?;

        let namespace = obj
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(String::from);

        let (fullname, prev_namespace) = self.enter_named_scope(&name, namespace.clone());
        self.current_namespace = prev_namespace;

        let symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SchemaError::InvalidSchema("Enum missing 'symbols' array".to_string()))?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect::<Vec<_>>();

        if symbols.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Enum must have at least one symbol".to_string(),
            ));
        }
        for symbol in &symbols {
            self.validate_name(symbol, "Enum symbol")?;
        }

        let default = obj
            .get("default")
            .and_then(|v| v.as_str())
            .map(String::from);
        if let Some(d) = &default {
            if !symbols.iter().any(|s| s == d) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum default '{}' is not a declared symbol",
                    d
                )));
            }
        }

        let enum_schema = EnumSchema {
            name: simple_name(&name),
            namespace: namespace_of(&fullname, namespace),
            symbols,
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            aliases: parse_aliases(obj),
            default,
            properties: extra_properties(obj, ENUM_KEYS),
        };

        let schema = Schema::Enum(enum_schema);
        self.named_types.insert(fullname, schema.clone());

        Ok(schema)
    }

    /// Parse an array schema.
    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<Schema, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::InvalidSchema("Array missing 'items' field".to_string()))?;

        Ok(Schema::Array(Box::new(self.parse(items)?)))
    }

    /// Parse a map schema.
    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<Schema, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::InvalidSchema("Map missing 'values' field".to_string()))?;

        Ok(Schema::Map(Box::new(self.parse(values)?)))
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<Schema, SchemaError> {
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Fixed missing 'name' field".to_string()))?
            .to_string();

        self.validate_name(&name, "Fixed")?;

        let namespace = obj
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(String::from);

        let (fullname, prev_namespace) = self.enter_named_scope(&name, namespace.clone());
        self.current_namespace = prev_namespace;

        let size = obj
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SchemaError::InvalidSchema("Fixed missing 'size' field".to_string()))?
            as usize;

        let fixed = FixedSchema {
            name: simple_name(&name),
            namespace: namespace_of(&fullname, namespace),
            size,
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            aliases: parse_aliases(obj),
            properties: extra_properties(obj, FIXED_KEYS),
        };

        let schema = Schema::Fixed(fixed);
        self.named_types.insert(fullname, schema.clone());

        Ok(schema)
    }

    /// Compute the fully qualified name for a declaration and switch the
    /// namespace scope to it, returning the previous scope for restore.
    fn enter_named_scope(
        &mut self,
        name: &str,
        namespace: Option<String>,
    ) -> (String, Option<String>) {
        let prev_namespace = self.current_namespace.clone();
        if namespace.is_some() {
            self.current_namespace = namespace.clone();
        } else if self.current_namespace.is_none() {
            if let Some(dot_pos) = name.rfind('.') {
                self.current_namespace = Some(name[..dot_pos].to_string());
            }
        }

        let fullname = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => match &self.current_namespace {
                Some(ns) if !name.contains('.') => format!("{}.{}", ns, name),
                _ => name.to_string(),
            },
        };

        (fullname, prev_namespace)
    }

    /// Qualify an unqualified name against the current namespace.
    fn resolve_name(&self, name: &str) -> String {
        if name.contains('.') {
            return name.to_string();
        }
        match &self.current_namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.to_string(),
        }
    }

    /// Validate a name against schema naming rules.
    fn validate_name(&self, name: &str, kind: &str) -> Result<(), SchemaError> {
        let valid = name.split('.').all(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        });

        if !valid {
            let msg = format!("{} name '{}' violates naming rules", kind, name);
            if self.strict_schema {
                return Err(SchemaError::InvalidSchema(msg));
            }
            warn!("{}", msg);
        }
        Ok(())
    }
}

/// Collect the `aliases` array of an object, if present.
fn parse_aliases(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("aliases")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Collect keys not consumed structurally into the open property map.
fn extra_properties(obj: &Map<String, Value>, structural: &[&str]) -> Map<String, Value> {
    let mut props = Map::new();
    for (key, value) in obj {
        if !structural.contains(&key.as_str()) && key != "logicalType" {
            props.insert(key.clone(), value.clone());
        }
    }
    props
}

/// The final segment of a possibly dotted name.
fn simple_name(name: &str) -> String {
    match name.rsplit('.').next() {
        Some(last) => last.to_string(),
        None => name.to_string(),
    }
}

/// The namespace component of a fullname, preferring an explicit one.
fn namespace_of(fullname: &str, explicit: Option<String>) -> Option<String> {
    explicit.or_else(|| {
        fullname
            .rsplit_once('.')
            .map(|(ns, _)| ns.to_string())
            .filter(|ns| !ns.is_empty())
    })
}

//! JSON token streams.
//!
//! The JSON codec works over a flat token stream rather than a value
//! tree: field names are observable in writer order, out-of-order field
//! subtrees can be captured as token runs and replayed later, and the
//! decoder can swap its input cursor when a reorder buffer or an injected
//! default takes over.

use serde_json::{Map, Number, Value};

use crate::error::CodecError;

/// One JSON token.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonToken {
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// A member key inside an object
    FieldName(String),
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any JSON number
    Number(Number),
    /// A string value
    String(String),
}

impl JsonToken {
    /// A short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            JsonToken::ObjectStart => "{".to_string(),
            JsonToken::ObjectEnd => "}".to_string(),
            JsonToken::ArrayStart => "[".to_string(),
            JsonToken::ArrayEnd => "]".to_string(),
            JsonToken::FieldName(n) => format!("field \"{}\"", n),
            JsonToken::Null => "null".to_string(),
            JsonToken::Bool(b) => b.to_string(),
            JsonToken::Number(n) => n.to_string(),
            JsonToken::String(s) => format!("\"{}\"", s),
        }
    }
}

/// Flatten a JSON value into tokens, preserving member order.
pub fn tokenize(value: &Value, out: &mut Vec<JsonToken>) {
    match value {
        Value::Null => out.push(JsonToken::Null),
        Value::Bool(b) => out.push(JsonToken::Bool(*b)),
        Value::Number(n) => out.push(JsonToken::Number(n.clone())),
        Value::String(s) => out.push(JsonToken::String(s.clone())),
        Value::Array(items) => {
            out.push(JsonToken::ArrayStart);
            for item in items {
                tokenize(item, out);
            }
            out.push(JsonToken::ArrayEnd);
        }
        Value::Object(members) => {
            out.push(JsonToken::ObjectStart);
            for (key, member) in members {
                out.push(JsonToken::FieldName(key.clone()));
                tokenize(member, out);
            }
            out.push(JsonToken::ObjectEnd);
        }
    }
}

/// Rebuild a JSON value from a captured token run.
pub fn detokenize(tokens: &[JsonToken]) -> Result<Value, CodecError> {
    let mut cursor = TokenCursor::new(tokens.to_vec());
    let value = read_value(&mut cursor)?;
    Ok(value)
}

fn read_value(cursor: &mut TokenCursor) -> Result<Value, CodecError> {
    let token = cursor
        .current()
        .cloned()
        .ok_or_else(|| CodecError::Malformed("unexpected end of JSON tokens".to_string()))?;
    cursor.bump();
    match token {
        JsonToken::Null => Ok(Value::Null),
        JsonToken::Bool(b) => Ok(Value::Bool(b)),
        JsonToken::Number(n) => Ok(Value::Number(n)),
        JsonToken::String(s) => Ok(Value::String(s)),
        JsonToken::ArrayStart => {
            let mut items = Vec::new();
            loop {
                match cursor.current() {
                    Some(JsonToken::ArrayEnd) => {
                        cursor.bump();
                        return Ok(Value::Array(items));
                    }
                    Some(_) => items.push(read_value(cursor)?),
                    None => {
                        return Err(CodecError::Malformed(
                            "unterminated JSON array".to_string(),
                        ))
                    }
                }
            }
        }
        JsonToken::ObjectStart => {
            let mut members = Map::new();
            loop {
                match cursor.current().cloned() {
                    Some(JsonToken::ObjectEnd) => {
                        cursor.bump();
                        return Ok(Value::Object(members));
                    }
                    Some(JsonToken::FieldName(name)) => {
                        cursor.bump();
                        members.insert(name, read_value(cursor)?);
                    }
                    other => {
                        return Err(CodecError::Malformed(format!(
                            "expected object member, found {:?}",
                            other
                        )))
                    }
                }
            }
        }
        other => Err(CodecError::Malformed(format!(
            "token {} cannot start a value",
            other.describe()
        ))),
    }
}

/// A read position over an owned token run.
#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: std::sync::Arc<Vec<JsonToken>>,
    pos: usize,
}

impl TokenCursor {
    /// Create a cursor at the start of `tokens`.
    pub fn new(tokens: Vec<JsonToken>) -> Self {
        Self {
            tokens: std::sync::Arc::new(tokens),
            pos: 0,
        }
    }

    /// Parse `text` and position a cursor at its first token.
    pub fn from_str(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CodecError::Malformed(format!("invalid JSON: {}", e)))?;
        Ok(Self::from_value(&value))
    }

    /// Flatten `value` and position a cursor at its first token.
    pub fn from_value(value: &Value) -> Self {
        let mut tokens = Vec::new();
        tokenize(value, &mut tokens);
        Self::new(tokens)
    }

    /// The current token, `None` at end of input.
    pub fn current(&self) -> Option<&JsonToken> {
        self.tokens.get(self.pos)
    }

    /// Advance past the current token.
    pub fn bump(&mut self) {
        self.pos += 1;
    }

    /// Whether all tokens are consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Capture the complete value starting at the current token as a
    /// token run, failing when its nesting exceeds `max_depth`.
    pub fn capture_value(&mut self, max_depth: usize) -> Result<Vec<JsonToken>, CodecError> {
        let mut captured = Vec::new();
        let mut depth: usize = 0;
        loop {
            let token = self
                .current()
                .cloned()
                .ok_or_else(|| CodecError::Malformed("unexpected end of JSON tokens".to_string()))?;
            self.bump();
            match &token {
                JsonToken::ObjectStart | JsonToken::ArrayStart => {
                    depth += 1;
                    if depth > max_depth {
                        return Err(CodecError::Malformed(format!(
                            "JSON value exceeds capture depth {}",
                            max_depth
                        )));
                    }
                }
                JsonToken::ObjectEnd | JsonToken::ArrayEnd => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
            captured.push(token);
            if depth == 0 {
                // Field names do not terminate a value by themselves
                if matches!(captured.last(), Some(JsonToken::FieldName(_))) {
                    continue;
                }
                return Ok(captured);
            }
        }
    }

    /// Skip the complete value starting at the current token.
    pub fn skip_value(&mut self) -> Result<(), CodecError> {
        self.capture_value(usize::MAX).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokenize_preserves_member_order() {
        let value: Value = serde_json::from_str(r#"{"b": 1, "a": 2}"#).unwrap();
        let mut tokens = Vec::new();
        tokenize(&value, &mut tokens);
        assert_eq!(
            tokens,
            vec![
                JsonToken::ObjectStart,
                JsonToken::FieldName("b".to_string()),
                JsonToken::Number(1.into()),
                JsonToken::FieldName("a".to_string()),
                JsonToken::Number(2.into()),
                JsonToken::ObjectEnd,
            ]
        );
    }

    #[test]
    fn test_capture_value_subtree() {
        let mut cursor = TokenCursor::from_str(r#"{"x": {"y": [1, 2]}, "z": 3}"#).unwrap();
        // Step past '{' and the first field name
        cursor.bump();
        cursor.bump();
        let captured = cursor.capture_value(8).unwrap();
        assert_eq!(detokenize(&captured).unwrap(), json!({"y": [1, 2]}));
        assert_eq!(
            cursor.current(),
            Some(&JsonToken::FieldName("z".to_string()))
        );
    }

    #[test]
    fn test_capture_depth_limit() {
        let mut cursor = TokenCursor::from_str(r#"[[[[1]]]]"#).unwrap();
        assert!(matches!(
            cursor.capture_value(2),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_roundtrip_through_tokens() {
        let value = json!({"a": [1, null, {"b": "x"}], "c": true});
        let mut tokens = Vec::new();
        tokenize(&value, &mut tokens);
        assert_eq!(detokenize(&tokens).unwrap(), value);
    }
}

//! Cell value coercion.
//!
//! Grid backends hand cells back as loosely typed JSON (usually strings,
//! whatever was written originally). This module turns a raw cell into the
//! value a field declares, and flattens multi-values into a single cell.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single cell as exchanged with a grid store.
pub type CellValue = Value;

/// Separator used for multi-value cells.
pub const MULTI_VALUE_SEPARATOR: char = ',';

/// Built-in scalar coercions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Any value rendered as text
    Text,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// Lenient boolean (`true`/`yes`/`1`/...)
    Boolean,
    /// JSON document stored as text
    Json,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

/// Error returned when a cell cannot be read as its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to read '{value}' as {expected}: {message}")]
pub struct CoerceError {
    pub message: String,
    pub value: String,
    pub expected: &'static str,
}

impl CoerceError {
    fn new(message: impl Into<String>, value: &str, expected: ScalarType) -> Self {
        Self {
            message: message.into(),
            value: value.to_string(),
            expected: expected.as_str(),
        }
    }
}

/// Render a cell as text. Null renders as the empty string.
pub fn cell_text(value: &CellValue) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a cell holds nothing: null or the empty string.
pub fn is_blank(value: &CellValue) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Coerce a raw cell to a scalar type.
///
/// Blank cells become `null` for every type except `Text`, which keeps the
/// empty string. Values already of the right JSON type pass through.
pub fn coerce_cell(value: &CellValue, target: ScalarType) -> Result<CellValue, CoerceError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if target == ScalarType::Text {
        return Ok(Value::String(cell_text(value)));
    }
    if is_blank(value) {
        return Ok(Value::Null);
    }

    let text = cell_text(value);
    let trimmed = text.trim();

    match target {
        ScalarType::Text => Ok(Value::String(text)),

        ScalarType::Integer => {
            if let Some(i) = value.as_i64() {
                return Ok(Value::from(i));
            }
            trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| CoerceError::new(e.to_string(), &text, target))
        }

        ScalarType::Float => {
            if let Some(f) = value.as_f64() {
                return Ok(Value::from(f));
            }
            let f = trimmed
                .parse::<f64>()
                .map_err(|e| CoerceError::new(e.to_string(), &text, target))?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| CoerceError::new("not a finite number", &text, target))
        }

        ScalarType::Boolean => {
            if let Some(b) = value.as_bool() {
                return Ok(Value::Bool(b));
            }
            match trimmed.to_lowercase().as_str() {
                "true" | "1" | "yes" | "t" | "y" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "f" | "n" => Ok(Value::Bool(false)),
                _ => Err(CoerceError::new("invalid boolean value", &text, target)),
            }
        }

        ScalarType::Json => match value {
            Value::String(s) => serde_json::from_str(s)
                .map_err(|e| CoerceError::new(e.to_string(), &text, target)),
            other => Ok(other.clone()),
        },
    }
}

/// Join a multi-value into a single cell.
///
/// Arrays are rendered item by item and joined with
/// [`MULTI_VALUE_SEPARATOR`]; any other value is returned unchanged.
pub fn join_multi_value(value: &CellValue) -> CellValue {
    match value {
        Value::Array(items) => Value::String(
            items
                .iter()
                .map(cell_text)
                .collect::<Vec<_>>()
                .join(&MULTI_VALUE_SEPARATOR.to_string()),
        ),
        other => other.clone(),
    }
}

/// Split a multi-value cell into its items. A blank cell yields no items.
pub fn split_multi_value(value: &CellValue) -> Vec<CellValue> {
    match value {
        Value::Array(items) => items.clone(),
        v if is_blank(v) => Vec::new(),
        v => cell_text(v)
            .split(MULTI_VALUE_SEPARATOR)
            .map(|item| Value::String(item.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce_cell(&json!("42"), ScalarType::Integer), Ok(json!(42)));
        assert_eq!(coerce_cell(&json!(" -7 "), ScalarType::Integer), Ok(json!(-7)));
        assert_eq!(coerce_cell(&json!(5), ScalarType::Integer), Ok(json!(5)));
        assert!(coerce_cell(&json!("4.5"), ScalarType::Integer).is_err());
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(coerce_cell(&json!("3.25"), ScalarType::Float), Ok(json!(3.25)));
        assert!(coerce_cell(&json!("abc"), ScalarType::Float).is_err());
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(coerce_cell(&json!("TRUE"), ScalarType::Boolean), Ok(json!(true)));
        assert_eq!(coerce_cell(&json!("no"), ScalarType::Boolean), Ok(json!(false)));
        let err = coerce_cell(&json!("maybe"), ScalarType::Boolean).unwrap_err();
        assert_eq!(err.expected, "boolean");
        assert_eq!(err.value, "maybe");
    }

    #[test]
    fn test_coerce_text_and_json() {
        assert_eq!(coerce_cell(&json!(12), ScalarType::Text), Ok(json!("12")));
        assert_eq!(coerce_cell(&json!(""), ScalarType::Text), Ok(json!("")));
        assert_eq!(
            coerce_cell(&json!(r#"{"a":[1,2]}"#), ScalarType::Json),
            Ok(json!({"a": [1, 2]}))
        );
    }

    #[test]
    fn test_blank_cells_become_null() {
        assert_eq!(coerce_cell(&json!(""), ScalarType::Integer), Ok(Value::Null));
        assert_eq!(coerce_cell(&Value::Null, ScalarType::Text), Ok(Value::Null));
    }

    #[test]
    fn test_multi_values() {
        assert_eq!(join_multi_value(&json!(["a", "b", 3])), json!("a,b,3"));
        assert_eq!(join_multi_value(&json!("x")), json!("x"));
        assert_eq!(split_multi_value(&json!("a,b")), vec![json!("a"), json!("b")]);
        assert!(split_multi_value(&json!("")).is_empty());
    }
}

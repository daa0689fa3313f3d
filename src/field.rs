//! Field definitions.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use sheet_types::{coerce_cell, join_multi_value, split_multi_value, ScalarType};
use tracing::warn;

/// Caller-supplied coercion applied to a non-null raw cell.
pub type Coercer = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Zero-argument default producer, invoked once per insert.
pub type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

/// How a raw cell is turned into a field value.
#[derive(Clone, Default)]
pub enum FieldType {
    /// Keep the cell as returned by the grid store
    #[default]
    Raw,
    /// Built-in parsing
    Scalar(ScalarType),
    /// Custom coercion closure
    Custom(Coercer),
    /// Comma-joined multi-value cell
    Array(Box<FieldType>),
    /// Nested sub-fields
    Composite(Vec<Field>),
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "Raw"),
            Self::Scalar(t) => write!(f, "Scalar({t:?})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
            Self::Array(inner) => f.debug_tuple("Array").field(inner).finish(),
            Self::Composite(fields) => f.debug_tuple("Composite").field(fields).finish(),
        }
    }
}

impl FieldType {
    /// Coerce a non-null raw cell.
    ///
    /// Cells that fail built-in parsing are kept as-is and logged, the same
    /// way a value with no declared type would be.
    pub fn coerce(&self, raw: &Value) -> Value {
        match self {
            Self::Raw => raw.clone(),

            Self::Scalar(target) => match coerce_cell(raw, *target) {
                Ok(value) => value,
                Err(e) => {
                    warn!("{e}; keeping raw value");
                    raw.clone()
                }
            },

            Self::Custom(coercer) => coercer(raw),

            Self::Array(inner) => Value::Array(
                split_multi_value(raw)
                    .iter()
                    .map(|item| inner.coerce(item))
                    .collect(),
            ),

            Self::Composite(fields) => {
                let parsed = match raw {
                    Value::String(text) => serde_json::from_str::<Value>(text).ok(),
                    other => Some(other.clone()),
                };
                match parsed {
                    Some(Value::Object(mut map)) => {
                        for field in fields {
                            if let Some(value) = map.get_mut(field.key()) {
                                if !value.is_null() {
                                    *value = field.field_type.coerce(value);
                                }
                            }
                        }
                        Value::Object(map)
                    }
                    _ => {
                        warn!("composite cell is not a JSON object; keeping raw value");
                        raw.clone()
                    }
                }
            }
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

/// Render a value as a single cell: arrays are comma-joined, objects become
/// JSON text.
pub(crate) fn encode_cell(value: &Value) -> Value {
    match value {
        Value::Array(_) => join_multi_value(value),
        Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// Default applied to a field left unset on insert.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Producer),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

/// One declared field of a table.
///
/// Record values are keyed by [`Field::key`], which is the header and
/// defaults to the declared name.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub header: String,
    pub required: bool,
    pub primary_key: bool,
    pub default: Option<DefaultValue>,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            header: name.clone(),
            name,
            required: false,
            primary_key: false,
            default: None,
            field_type: FieldType::Raw,
        }
    }

    /// Display and lookup name used in the grid. Empty headers fall back to
    /// the field name.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        if !header.is_empty() {
            self.header = header;
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as primary key. Primary keys are always required.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn scalar(self, scalar: ScalarType) -> Self {
        self.field_type(FieldType::Scalar(scalar))
    }

    pub fn custom<F>(self, coercer: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.field_type(FieldType::Custom(Arc::new(coercer)))
    }

    pub fn array(self, item: FieldType) -> Self {
        self.field_type(FieldType::Array(Box::new(item)))
    }

    pub fn composite(self, fields: Vec<Field>) -> Self {
        self.field_type(FieldType::Composite(fields))
    }

    pub fn key(&self) -> &str {
        &self.header
    }
}

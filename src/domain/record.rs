//! Mapped records and their field values

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::domain::entity::EntityKind;

/// One projected field.
///
/// This is a lossless view of a JSON scalar: nothing is parsed or coerced.
/// Arrays and objects are kept as their JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if n.is_u64() {
                    // above i64::MAX; keep the digits rather than lose precision
                    Self::Text(n.to_string())
                } else {
                    n.as_f64().map_or_else(|| Self::Text(n.to_string()), Self::Float)
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// A raw API item projected onto its kind's column table.
///
/// `values` follows [`EntitySchema::columns`](crate::domain::entity::EntitySchema::columns),
/// so the identity key is always the leading slice.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRecord {
    kind: EntityKind,
    values: Vec<FieldValue>,
}

impl MappedRecord {
    pub(crate) fn from_values(kind: EntityKind, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(values.len(), kind.schema().column_count());
        Self { kind, values }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn identity_key(&self) -> &[FieldValue] {
        &self.values[..self.kind.schema().key_columns.len()]
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.kind
            .schema()
            .column_index(column)
            .and_then(|idx| self.values.get(idx))
    }
}

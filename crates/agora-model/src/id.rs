//! Record identifiers
//!
//! The remote service assigns integer ids; optimistic inserts carry a
//! temporary string id (`temp-{uuid}`) until the server row replaces them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a record within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Extract the id of a raw JSON row, if present.
    pub fn of_row(row: &Value) -> Option<RecordId> {
        match row.get("id") {
            Some(Value::Number(n)) => n.as_i64().map(RecordId::Int),
            Some(Value::String(s)) => Some(RecordId::Str(s.clone())),
            _ => None,
        }
    }

    /// Whether this is a client-assigned temporary id.
    pub fn is_temporary(&self) -> bool {
        matches!(self, RecordId::Str(s) if s.starts_with("temp-"))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{n}"),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Str(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_of_row() {
        assert_eq!(
            RecordId::of_row(&json!({"id": 7, "name": "x"})),
            Some(RecordId::Int(7))
        );
        assert_eq!(
            RecordId::of_row(&json!({"id": "temp-abc"})),
            Some(RecordId::Str("temp-abc".into()))
        );
        assert_eq!(RecordId::of_row(&json!({"name": "x"})), None);
    }

    #[test]
    fn test_temporary() {
        assert!(RecordId::from("temp-123").is_temporary());
        assert!(!RecordId::from(123).is_temporary());
        assert!(!RecordId::from("abc").is_temporary());
    }
}

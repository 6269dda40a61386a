//! Dynamic row records and cell value helpers.
//!
//! Rows are schemaless JSON objects: the engine never assumes a fixed
//! struct because the host supplies arbitrary datasets. Cell-level
//! coercion helpers live here so filtering, sorting, and export all
//! agree on how a value becomes a string or a number.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single data row: an ordered map of field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub Map<String, Value>);

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Look up a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a row from any JSON value.
    ///
    /// Non-object values yield an empty row; the engine treats malformed
    /// input rows as "no fields" rather than failing a whole dataset.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Render a cell value the way the grid displays it.
///
/// Strings render without quotes, null as the empty string, everything
/// else via its JSON form.
pub fn value_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce a cell value to a number, accepting numeric strings.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Whether a cell value counts as empty for `isEmpty`/`isNotEmpty`.
///
/// Null and the empty (or whitespace-only) string are empty; `false`
/// and `0` are not.
pub fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_ignores_non_objects() {
        assert!(Row::from_value(json!([1, 2, 3])).is_empty());
        assert_eq!(Row::from_value(json!({"a": 1})).get("a"), Some(&json!(1)));
    }

    #[test]
    fn numeric_strings_coerce() {
        assert_eq!(value_to_f64(&json!("42.5")), Some(42.5));
        assert_eq!(value_to_f64(&json!(" 7 ")), Some(7.0));
        assert_eq!(value_to_f64(&json!("abc")), None);
    }

    #[test]
    fn emptiness_rules() {
        assert!(value_is_empty(&Value::Null));
        assert!(value_is_empty(&json!("  ")));
        assert!(!value_is_empty(&json!(0)));
        assert!(!value_is_empty(&json!(false)));
    }
}

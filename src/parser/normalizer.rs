// file: src/parser/normalizer.rs
// description: normalization of scalar-or-list document fields into ordered string sequences
// reference: openfda fields arrive either as a single value or as an array

use crate::models::UNRESOLVED_SENTINEL;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldNormalizer;

impl FieldNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Flattens a field value into its string items, in document order.
    ///
    /// Strings and numbers become one item each, arrays are flattened one
    /// level, and nulls, blanks, objects and placeholders are dropped.
    pub fn normalize(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.iter().filter_map(|item| self.scalar(item)).collect(),
            other => self.scalar(other).into_iter().collect(),
        }
    }

    fn scalar(&self, value: &Value) -> Option<String> {
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };

        if text.is_empty() || text == UNRESOLVED_SENTINEL {
            None
        } else {
            Some(text)
        }
    }
}

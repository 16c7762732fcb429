// file: src/models/record.rs
// description: source and enriched record types flowing through the reindex pass
// reference: search_after pagination on a unique sort key

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A document read from the source index. Sorted by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl SourceRecord {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Returns the named text field when it is a non-empty string.
    /// Whitespace counts as text.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Looks up a dotted path such as `openfda.rxcui`.
    pub fn field_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.fields.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn cursor(&self) -> Cursor {
        Cursor(self.id.clone())
    }

    pub fn enrich(self, vector_field: &str, vector: Vec<f32>) -> EnrichedRecord {
        EnrichedRecord {
            id: self.id,
            fields: self.fields,
            vector_field: vector_field.to_string(),
            vector,
        }
    }
}

/// Last sort key seen in a scan; sent back as `search_after`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source record with its embedding attached, ready for one bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub id: String,
    pub fields: Map<String, Value>,
    pub vector_field: String,
    pub vector: Vec<f32>,
}

impl EnrichedRecord {
    /// Document body written to the destination: source fields plus the vector.
    pub fn to_document(&self) -> Value {
        let mut document = self.fields.clone();
        document.insert(
            self.vector_field.clone(),
            Value::Array(self.vector.iter().map(|v| Value::from(*v as f64)).collect()),
        );
        Value::Object(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SourceRecord {
        let fields = value.as_object().cloned().unwrap();
        SourceRecord::new("d1", fields)
    }

    #[test]
    fn test_text_requires_non_empty_string() {
        assert_eq!(
            record(json!({"combined_text": "aspirin"})).text("combined_text"),
            Some("aspirin")
        );
        assert_eq!(record(json!({"combined_text": ""})).text("combined_text"), None);
        assert_eq!(
            record(json!({"combined_text": "  "})).text("combined_text"),
            Some("  ")
        );
        assert_eq!(
            record(json!({"combined_text": "\n"})).text("combined_text"),
            Some("\n")
        );
        assert_eq!(record(json!({"combined_text": 12})).text("combined_text"), None);
        assert_eq!(record(json!({})).text("combined_text"), None);
    }

    #[test]
    fn test_field_path_walks_objects() {
        let rec = record(json!({"openfda": {"rxcui": ["1191", "5640"]}}));
        assert_eq!(rec.field_path("openfda.rxcui"), Some(&json!(["1191", "5640"])));
        assert_eq!(rec.field_path("openfda.missing"), None);
        assert_eq!(rec.field_path("openfda.rxcui.deeper"), None);
    }

    #[test]
    fn test_enriched_document_carries_vector() {
        let enriched = record(json!({"combined_text": "aspirin"}))
            .enrich("search_vector", vec![0.5, 0.25]);
        let document = enriched.to_document();
        assert_eq!(document["combined_text"], json!("aspirin"));
        assert_eq!(document["search_vector"], json!([0.5, 0.25]));
    }
}

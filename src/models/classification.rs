// file: src/models/classification.rs
// description: classification keys, per-key lookup results and the aggregated mapping
// reference: RxNav RxClass byRxcui responses

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Snapshot value standing for "no mapping found or lookup failed".
pub const UNRESOLVED_SENTINEL: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationKey(String);

impl ClassificationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassificationKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Outcome of one lookup. `Resolved` always holds at least one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    Resolved(Vec<String>),
    Unresolved,
}

impl ClassificationResult {
    /// Builds a result from matched codes; an empty list becomes `Unresolved`.
    pub fn from_codes(codes: Vec<String>) -> Self {
        if codes.is_empty() {
            ClassificationResult::Unresolved
        } else {
            ClassificationResult::Resolved(codes)
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ClassificationResult::Resolved(_))
    }
}

impl Serialize for ClassificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClassificationResult::Resolved(codes) => codes.serialize(serializer),
            ClassificationResult::Unresolved => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(UNRESOLVED_SENTINEL)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ClassificationResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let codes: Vec<String> = Vec::deserialize(deserializer)?;
        let codes = codes
            .into_iter()
            .filter(|code| code != UNRESOLVED_SENTINEL)
            .collect();
        Ok(ClassificationResult::from_codes(codes))
    }
}

/// Key to result mapping produced by the classification pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichmentMapping {
    entries: BTreeMap<ClassificationKey, ClassificationResult>,
}

impl EnrichmentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a result; returns the previous one if the key was already present.
    pub fn insert(
        &mut self,
        key: ClassificationKey,
        result: ClassificationResult,
    ) -> Option<ClassificationResult> {
        self.entries.insert(key, result)
    }

    pub fn get(&self, key: &ClassificationKey) -> Option<&ClassificationResult> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ClassificationKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|r| r.is_resolved()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassificationKey, &ClassificationResult)> {
        self.entries.iter()
    }
}

// file: src/exporter/json.rs
// description: durable json snapshot of the classification mapping

use crate::error::{PipelineError, Result};
use crate::models::EnrichmentMapping;
use std::fs;
use std::path::Path;
use tracing::info;

/// The key to codes mapping as persisted for downstream consumers.
///
/// On disk it is a flat pretty-printed object, e.g.
/// `{"1191": ["B01AC", "N02BA"], "999999": ["N/A"]}`.
#[derive(Debug, Clone)]
pub struct MappingSnapshot {
    mapping: EnrichmentMapping,
}

impl MappingSnapshot {
    pub fn new(mapping: EnrichmentMapping) -> Self {
        Self { mapping }
    }

    /// Writes through a temporary sibling file and renames it into place, so
    /// readers never observe a half-written snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::FileOperation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(&self.mapping)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, content).map_err(|source| PipelineError::FileOperation {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, path).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "Saved mapping with {} keys to {}",
            self.mapping.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read(path: &Path) -> Result<EnrichmentMapping> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationResult;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/rxcui_to_atc4_mapping.json");

        let mut mapping = EnrichmentMapping::new();
        mapping.insert(
            "1191".into(),
            ClassificationResult::Resolved(vec!["B01AC".to_string()]),
        );
        mapping.insert("0".into(), ClassificationResult::Unresolved);
        MappingSnapshot::new(mapping.clone()).write(&path).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!({"0": ["N/A"], "1191": ["B01AC"]}));
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(MappingSnapshot::read(&path).unwrap(), mapping);
    }

    #[test]
    fn test_read_missing_snapshot_fails() {
        let dir = tempdir().unwrap();
        assert!(MappingSnapshot::read(&dir.path().join("absent.json")).is_err());
    }
}

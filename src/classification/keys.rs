// file: src/classification/keys.rs
// description: discovery of the distinct classification keys to resolve
// reference: openfda.rxcui values stored on indexed label documents

use crate::corpus::scanner::SourceScanner;
use crate::database::store::DocumentStore;
use crate::error::{PipelineError, Result};
use crate::models::ClassificationKey;
use crate::parser::FieldNormalizer;
use futures::TryStreamExt;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Scans `store` and collects the distinct values found under `key_field`.
///
/// The field may hold a single value or a list; placeholders and blanks are
/// ignored.
pub async fn collect_keys(
    store: Arc<dyn DocumentStore>,
    page_size: usize,
    key_field: &str,
) -> Result<BTreeSet<ClassificationKey>> {
    info!(
        "Collecting distinct {} values from {}",
        key_field,
        store.index_name()
    );

    let normalizer = FieldNormalizer::new();
    let mut keys = BTreeSet::new();
    let records = SourceScanner::new(store, page_size).records();
    let mut records = std::pin::pin!(records);

    while let Some(record) = records.try_next().await? {
        if let Some(value) = record.field_path(key_field) {
            keys.extend(
                normalizer
                    .normalize(value)
                    .into_iter()
                    .map(ClassificationKey::new),
            );
        }
    }

    info!("Found {} distinct keys", keys.len());
    Ok(keys)
}

/// Reads one key per line; blank lines and `#` comments are skipped.
pub fn read_keys_file(path: &Path) -> Result<BTreeSet<ClassificationKey>> {
    let content = fs::read_to_string(path).map_err(|source| PipelineError::FileOperation {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ClassificationKey::new)
        .collect())
}

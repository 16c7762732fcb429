// file: src/corpus/probe.rs
// description: membership set of identifiers already present in the destination index
// reference: ids-only scan reusing the source scanner pagination

use crate::corpus::scanner::SourceScanner;
use crate::database::store::DocumentStore;
use crate::error::Result;
use futures::TryStreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub struct DestinationIndexProbe {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
}

impl DestinationIndexProbe {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Collects every identifier currently in the destination.
    ///
    /// A destination index that does not exist yet is treated as empty. Any
    /// other store failure is returned to the caller.
    pub async fn existing_ids(&self) -> Result<HashSet<String>> {
        if !self.store.exists().await? {
            info!(
                "Destination index {} does not exist yet; nothing to skip",
                self.store.index_name()
            );
            return Ok(HashSet::new());
        }

        let ids: HashSet<String> = SourceScanner::new(Arc::clone(&self.store), self.page_size)
            .ids_only()
            .records()
            .map_ok(|record| record.id)
            .try_collect()
            .await?;

        info!(
            "Destination index {} already holds {} documents",
            self.store.index_name(),
            ids.len()
        );
        Ok(ids)
    }
}

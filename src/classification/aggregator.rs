// file: src/classification/aggregator.rs
// description: bounded-concurrency fan-out of classification lookups into a total key mapping
// reference: buffer_unordered worker pool over a distinct key set

use crate::classification::fetcher::ClassificationLookup;
use crate::error::Result;
use crate::exporter::json::MappingSnapshot;
use crate::models::{ClassificationKey, ClassificationResult, EnrichmentMapping};
use crate::pipeline::progress::ProgressTracker;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub mapping: EnrichmentMapping,
    /// Set when cancellation stopped dispatch before every key was looked up.
    pub cancelled: bool,
}

pub struct KeyAggregator {
    lookup: Arc<dyn ClassificationLookup>,
    workers: usize,
    progress: Option<Arc<ProgressTracker>>,
}

impl KeyAggregator {
    pub fn new(lookup: Arc<dyn ClassificationLookup>, workers: usize) -> Self {
        Self {
            lookup,
            workers: workers.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Looks up every distinct key and returns a mapping with exactly one
    /// entry per key.
    ///
    /// At most `workers` lookups run at once and results are collected in
    /// completion order. Once `cancel` fires no further lookups start; keys
    /// that were never looked up are recorded as unresolved.
    pub async fn aggregate<I>(&self, keys: I, cancel: &CancellationToken) -> AggregationOutcome
    where
        I: IntoIterator<Item = ClassificationKey>,
    {
        let keys: BTreeSet<ClassificationKey> = keys.into_iter().collect();
        info!(
            "Resolving {} keys with {} workers",
            keys.len(),
            self.workers
        );

        let mut mapping = EnrichmentMapping::new();
        let lookups = stream::iter(keys.clone())
            .take_until(cancel.cancelled())
            .map(|key| {
                let lookup = Arc::clone(&self.lookup);
                async move {
                    let result = lookup.lookup(&key).await;
                    (key, result)
                }
            })
            .buffer_unordered(self.workers);
        let mut lookups = std::pin::pin!(lookups);

        while let Some((key, result)) = lookups.next().await {
            self.report(&key, &result);
            mapping.insert(key, result);
        }

        let cancelled = mapping.len() < keys.len();
        if cancelled {
            warn!(
                "Classification cancelled after {} of {} keys",
                mapping.len(),
                keys.len()
            );
        }

        for key in keys {
            if !mapping.contains(&key) {
                mapping.insert(key, ClassificationResult::Unresolved);
            }
        }

        AggregationOutcome { mapping, cancelled }
    }

    /// Aggregates and then writes the mapping snapshot to `path`.
    ///
    /// A cancelled run leaves any previous snapshot untouched, since keys it
    /// never looked up would otherwise be persisted as unresolved.
    pub async fn aggregate_and_persist<I>(
        &self,
        keys: I,
        cancel: &CancellationToken,
        path: &Path,
    ) -> Result<AggregationOutcome>
    where
        I: IntoIterator<Item = ClassificationKey>,
    {
        let outcome = self.aggregate(keys, cancel).await;
        if outcome.cancelled {
            warn!("Snapshot not written to {} (run cancelled)", path.display());
        } else {
            MappingSnapshot::new(outcome.mapping.clone()).write(path)?;
        }
        Ok(outcome)
    }

    fn report(&self, key: &ClassificationKey, result: &ClassificationResult) {
        debug!("Key {} -> {:?}", key, result);
        if let Some(progress) = &self.progress {
            if result.is_resolved() {
                progress.inc_resolved();
            } else {
                progress.inc_unresolved();
            }
        }
    }
}

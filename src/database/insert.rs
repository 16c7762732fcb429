// file: src/database/insert.rs
// description: chunked bulk writes with bounded concurrency and per-item outcome accounting
// reference: https://opensearch.org/docs/latest/api-reference/document-apis/bulk/

use crate::database::store::DocumentStore;
use crate::error::Result;
use crate::models::{EnrichedRecord, ItemOutcome, ItemStatus, RunSummary};
use crate::pipeline::progress::ProgressTracker;
use futures::stream::{Stream, TryChunksError, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct BulkWriter {
    store: Arc<dyn DocumentStore>,
    chunk_size: usize,
    workers: usize,
    progress: Option<Arc<ProgressTracker>>,
}

impl BulkWriter {
    pub fn new(store: Arc<dyn DocumentStore>, chunk_size: usize, workers: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
            workers: workers.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Drains `records` into the store and returns the write summary.
    ///
    /// Up to `workers` bulk requests are in flight at once and may finish in
    /// any order. A rejected item only bumps the failure count; an error from
    /// the stream or from a whole bulk request aborts the write.
    pub async fn write_all<S>(&self, records: S) -> Result<RunSummary>
    where
        S: Stream<Item = Result<EnrichedRecord>>,
    {
        let outcomes = records
            .try_chunks(self.chunk_size)
            .map_err(|TryChunksError(_, err)| err)
            .map_ok(|chunk| self.submit(chunk))
            .try_buffer_unordered(self.workers);
        let mut outcomes = std::pin::pin!(outcomes);

        let mut summary = RunSummary::new();
        while let Some(batch) = outcomes.try_next().await? {
            for outcome in &batch {
                summary.record(outcome);
                self.report(outcome);
            }
        }

        Ok(summary)
    }

    async fn submit(&self, chunk: Vec<EnrichedRecord>) -> Result<Vec<ItemOutcome>> {
        debug!(
            "Submitting bulk request of {} records to {}",
            chunk.len(),
            self.store.index_name()
        );
        self.store.bulk_index(&chunk).await
    }

    fn report(&self, outcome: &ItemOutcome) {
        match &outcome.status {
            ItemStatus::Written => {
                if let Some(progress) = &self.progress {
                    progress.inc_written();
                }
            }
            ItemStatus::Rejected { reason } => {
                warn!("Write rejected for {}: {}", outcome.id, reason);
                if let Some(progress) = &self.progress {
                    progress.inc_failed();
                }
            }
        }
    }
}

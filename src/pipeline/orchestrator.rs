// file: src/pipeline/orchestrator.rs
// description: coordinates the reindex pass and the classification pass
// reference: orchestrates asynchronous scan, enrich and bulk write workflow

use crate::classification::aggregator::KeyAggregator;
use crate::classification::keys::collect_keys;
use crate::corpus::{DestinationIndexProbe, SourceScanner};
use crate::database::embeddings::Embedder;
use crate::database::insert::BulkWriter;
use crate::database::store::DocumentStore;
use crate::error::{PipelineError, Result};
use crate::models::{
    ClassificationKey, EnrichedRecord, EnrichmentMapping, RunSummary, SourceRecord,
};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::utils::telemetry::{HealthCheck, HealthReport, OperationTimer};
use futures::future;
use futures::stream::{StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ReindexReport {
    pub summary: RunSummary,
    pub stats: PipelineStats,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub mapping: EnrichmentMapping,
    pub snapshot_path: PathBuf,
    pub cancelled: bool,
}

impl ClassificationReport {
    pub fn total_keys(&self) -> usize {
        self.mapping.len()
    }
}

/// Embeds the text field of a record and attaches the vector.
#[derive(Clone)]
struct RecordEncoder {
    embedder: Arc<dyn Embedder>,
    text_field: Arc<str>,
    vector_field: Arc<str>,
}

impl RecordEncoder {
    async fn encode(self, record: SourceRecord) -> Result<EnrichedRecord> {
        let text = record.text(&self.text_field).ok_or_else(|| {
            PipelineError::Validation(format!("record {} has no {}", record.id, self.text_field))
        })?;

        let vector = self.embedder.embed(text).await?;
        if vector.len() != self.embedder.dimension() {
            return Err(PipelineError::Embedding(format!(
                "{} returned {} values for {}, expected {}",
                self.embedder.model_name(),
                vector.len(),
                record.id,
                self.embedder.dimension()
            )));
        }

        Ok(record.enrich(&self.vector_field, vector))
    }
}

pub struct PipelineOrchestrator<'a> {
    context: &'a PipelineContext,
    show_progress: bool,
    colored: bool,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(context: &'a PipelineContext) -> Self {
        Self {
            context,
            show_progress: false,
            colored: false,
        }
    }

    /// Draws progress bars on the terminal.
    pub fn with_progress(mut self, colored: bool) -> Self {
        self.show_progress = true;
        self.colored = colored;
        self
    }

    fn tracker(&self, total: Option<usize>) -> Arc<ProgressTracker> {
        if self.show_progress {
            Arc::new(ProgressTracker::with_color(total, self.colored))
        } else {
            Arc::new(ProgressTracker::hidden())
        }
    }

    /// Copies every eligible source record that the destination lacks,
    /// with its embedding attached.
    ///
    /// Records already in the destination and records without text are
    /// skipped. Rejected writes are counted, not fatal. Store failures abort
    /// the run. On cancellation the scan stops, writes already queued are
    /// flushed and the partial report is returned.
    pub async fn run_reindex(&self, cancel: &CancellationToken) -> Result<ReindexReport> {
        let timer = OperationTimer::new("reindex");
        let config = &self.context.config.reindex;
        let source = &self.context.source;
        let destination = &self.context.destination;

        info!(
            "Reindexing {} into {}",
            source.index_name(),
            destination.index_name()
        );

        let existing = DestinationIndexProbe::new(Arc::clone(destination), config.page_size)
            .existing_ids()
            .await?;

        let progress = self.tracker(None);
        let encoder = RecordEncoder {
            embedder: Arc::clone(&self.context.embedder),
            text_field: Arc::from(config.text_field.as_str()),
            vector_field: Arc::from(config.vector_field.as_str()),
        };

        let enriched = SourceScanner::new(Arc::clone(source), config.page_size)
            .records()
            .take_until(cancel.cancelled())
            .try_filter(eligibility_filter(
                existing,
                Arc::clone(&encoder.text_field),
                Arc::clone(&progress),
            ))
            .map_ok(move |record| encoder.clone().encode(record))
            .try_buffered(config.embed_workers.max(1));

        let writer = BulkWriter::new(
            Arc::clone(destination),
            config.chunk_size,
            config.write_workers,
        )
        .with_progress(Arc::clone(&progress));
        let summary = writer.write_all(enriched).await?;

        progress.finish();
        let stats = progress.get_stats();
        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!("Reindex cancelled; writes issued before cancellation were flushed");
        }

        log_reindex_summary(&summary, &stats);
        timer.finish_with_count(stats.records_scanned);

        Ok(ReindexReport {
            summary,
            stats,
            cancelled,
        })
    }

    /// Resolves classification codes for `keys`, or for every key found in
    /// the key index when `keys` is `None`, and persists the mapping.
    pub async fn run_classification(
        &self,
        keys: Option<BTreeSet<ClassificationKey>>,
        cancel: &CancellationToken,
    ) -> Result<ClassificationReport> {
        let timer = OperationTimer::new("classification");
        let config = &self.context.config.classification;

        let keys = match keys {
            Some(keys) => keys,
            None => {
                collect_keys(
                    Arc::clone(&self.context.key_source),
                    self.context.config.reindex.page_size,
                    &config.key_field,
                )
                .await?
            }
        };
        info!("Total keys: {}", keys.len());

        let progress = self.tracker(Some(keys.len()));
        let aggregator = KeyAggregator::new(Arc::clone(&self.context.lookup), config.workers)
            .with_progress(Arc::clone(&progress));
        let outcome = aggregator
            .aggregate_and_persist(keys, cancel, &config.snapshot_path)
            .await?;
        progress.finish();

        info!(
            "Resolved {} of {} keys",
            outcome.mapping.resolved_count(),
            outcome.mapping.len()
        );
        timer.finish_with_count(outcome.mapping.len());

        Ok(ClassificationReport {
            mapping: outcome.mapping,
            snapshot_path: config.snapshot_path.clone(),
            cancelled: outcome.cancelled,
        })
    }

    /// Checks the store, both indices and the encoder.
    ///
    /// A missing destination index is only degraded since the first bulk
    /// write creates it.
    pub async fn verify(&self) -> HealthReport {
        let mut checks = Vec::new();

        let started = Instant::now();
        match self.context.source.ping().await {
            Ok(()) => checks.push(HealthCheck::healthy("store", started.elapsed())),
            Err(e) => checks.push(HealthCheck::unhealthy("store", e.to_string(), started.elapsed())),
        }

        checks.push(check_index(self.context.source.as_ref(), false).await);
        checks.push(check_index(self.context.destination.as_ref(), true).await);

        let embedder = &self.context.embedder;
        let started = Instant::now();
        let check = match embedder.embed("health check").await {
            Ok(vector) if vector.len() == embedder.dimension() => {
                HealthCheck::healthy("embedder", started.elapsed())
            }
            Ok(vector) => HealthCheck::unhealthy(
                "embedder",
                format!(
                    "{} returned {} values, expected {}",
                    embedder.model_name(),
                    vector.len(),
                    embedder.dimension()
                ),
                started.elapsed(),
            ),
            Err(e) => HealthCheck::unhealthy("embedder", e.to_string(), started.elapsed()),
        };
        checks.push(check);

        HealthReport::new(checks, env!("CARGO_PKG_VERSION").to_string())
    }
}

async fn check_index(store: &dyn DocumentStore, may_be_missing: bool) -> HealthCheck {
    let component = format!("index {}", store.index_name());
    let started = Instant::now();
    match store.exists().await {
        Ok(true) => HealthCheck::healthy(&component, started.elapsed()),
        Ok(false) if may_be_missing => HealthCheck::degraded(
            &component,
            "not created yet".to_string(),
            started.elapsed(),
        ),
        Ok(false) => HealthCheck::unhealthy(&component, "missing".to_string(), started.elapsed()),
        Err(e) => HealthCheck::unhealthy(&component, e.to_string(), started.elapsed()),
    }
}

/// Keeps records that are new to the destination and carry text.
fn eligibility_filter(
    existing: HashSet<String>,
    text_field: Arc<str>,
    progress: Arc<ProgressTracker>,
) -> impl FnMut(&SourceRecord) -> future::Ready<bool> {
    move |record| {
        progress.inc_scanned();
        let keep = if existing.contains(&record.id) {
            progress.inc_skipped_existing();
            false
        } else if record.text(&text_field).is_none() {
            progress.inc_skipped_missing_text();
            false
        } else {
            true
        };
        future::ready(keep)
    }
}

fn log_reindex_summary(summary: &RunSummary, stats: &PipelineStats) {
    info!("=== Reindex Summary ===");
    info!("Duration: {} seconds", stats.duration_secs);
    info!("Records scanned: {}", stats.records_scanned);
    info!("Skipped (already indexed): {}", stats.skipped_existing);
    info!("Skipped (no text): {}", stats.skipped_missing_text);
    info!("Writes attempted: {}", summary.attempted());
    info!("Writes succeeded: {}", summary.succeeded());
    info!("Writes failed: {}", summary.failed());
    info!("Success rate: {:.2}%", stats.success_rate());
    info!("=======================");
}

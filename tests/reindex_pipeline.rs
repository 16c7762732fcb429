// file: tests/reindex_pipeline.rs
// description: end-to-end runs of both passes against in-memory indices
// reference: public library api only

use async_trait::async_trait;
use medsearch_pipeline::{
    ClassificationKey, ClassificationLookup, ClassificationResult, Config, HashEmbedder,
    MappingSnapshot, MemoryStore, PipelineContext, PipelineOrchestrator, SourceRecord,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const DIM: usize = 24;

struct AtcTable;

#[async_trait]
impl ClassificationLookup for AtcTable {
    async fn lookup(&self, key: &ClassificationKey) -> ClassificationResult {
        match key.as_str() {
            "1191" => ClassificationResult::from_codes(vec!["B01AC".into(), "N02BA".into()]),
            "5640" => ClassificationResult::from_codes(vec!["M01AE".into()]),
            _ => ClassificationResult::Unresolved,
        }
    }
}

fn record(id: &str, fields: Value) -> SourceRecord {
    SourceRecord::new(id, fields.as_object().cloned().unwrap_or_default())
}

struct Fixture {
    _dir: TempDir,
    source: MemoryStore,
    destination: MemoryStore,
    context: PipelineContext,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default_config();
    config.reindex.page_size = 2;
    config.reindex.chunk_size = 2;
    config.embedding.dimension = DIM;
    config.classification.snapshot_path = dir.path().join("data/mapping.json");

    let source = MemoryStore::new("labels")
        .with_records(vec![
            record(
                "d1",
                json!({"combined_text": "aspirin", "openfda": {"rxcui": ["1191"]}}),
            ),
            record("d2", json!({"combined_text": "", "openfda": {"rxcui": ["42"]}})),
            record(
                "d3",
                json!({"combined_text": "ibuprofen", "openfda": {"rxcui": ["5640", "1191"]}}),
            ),
        ])
        .await;
    let destination = MemoryStore::new("labels_embedded");

    let context = PipelineContext::new(
        config,
        Arc::new(source.clone()),
        Arc::new(destination.clone()),
        Arc::new(HashEmbedder::new(DIM)),
        Arc::new(AtcTable),
    );

    Fixture {
        _dir: dir,
        source,
        destination,
        context,
    }
}

#[tokio::test]
async fn reindex_copies_records_with_text() {
    let fx = fixture().await;

    let report = PipelineOrchestrator::new(&fx.context)
        .run_reindex(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.summary.attempted(), 2);
    assert_eq!(report.summary.succeeded(), 2);
    assert_eq!(report.summary.failed(), 0);
    assert!(report.summary.is_consistent());
    assert_eq!(
        fx.destination.ids().await,
        vec!["d1".to_string(), "d3".to_string()]
    );

    let d1 = fx.destination.document("d1").await.unwrap();
    assert_eq!(d1["combined_text"], json!("aspirin"));
    assert_eq!(d1["search_vector"].as_array().unwrap().len(), DIM);
    assert_eq!(d1["openfda"]["rxcui"], json!(["1191"]));
}

#[tokio::test]
async fn second_reindex_writes_nothing() {
    let fx = fixture().await;
    let orchestrator = PipelineOrchestrator::new(&fx.context);

    orchestrator
        .run_reindex(&CancellationToken::new())
        .await
        .unwrap();
    let received = fx.destination.items_received();

    let again = orchestrator
        .run_reindex(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(again.summary.attempted(), 0);
    assert_eq!(again.stats.skipped_existing, 2);
    assert_eq!(fx.destination.items_received(), received);
}

#[tokio::test]
async fn rejected_writes_are_counted_not_fatal() {
    let fx = fixture().await;
    fx.destination.reject_id("d3").await;

    let report = PipelineOrchestrator::new(&fx.context)
        .run_reindex(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.summary.attempted(), 2);
    assert_eq!(report.summary.succeeded(), 1);
    assert_eq!(report.summary.failed(), 1);
    assert!(report.summary.is_consistent());
}

#[tokio::test]
async fn unreachable_destination_aborts_before_scanning() {
    let fx = fixture().await;
    fx.destination.set_unavailable(true);

    let err = PipelineOrchestrator::new(&fx.context)
        .run_reindex(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_store_failure());
    assert_eq!(fx.source.pages_served(), 0);
}

#[tokio::test]
async fn cancelled_reindex_writes_nothing() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = PipelineOrchestrator::new(&fx.context)
        .run_reindex(&cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(fx.destination.is_empty().await);
}

#[tokio::test]
async fn classification_covers_every_key_in_corpus() {
    let fx = fixture().await;
    let context = fx
        .context
        .with_key_source(Arc::new(fx.source.clone()));

    let report = PipelineOrchestrator::new(&context)
        .run_classification(None, &CancellationToken::new())
        .await
        .unwrap();

    let keys: BTreeSet<&str> = report.mapping.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, BTreeSet::from(["1191", "42", "5640"]));
    assert_eq!(report.mapping.resolved_count(), 2);
    assert!(!report.cancelled);

    let snapshot = MappingSnapshot::read(&report.snapshot_path).unwrap();
    assert_eq!(snapshot, report.mapping);

    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(&report.snapshot_path).unwrap()).unwrap();
    assert_eq!(raw["42"], json!(["N/A"]));
    assert_eq!(raw["1191"], json!(["B01AC", "N02BA"]));
}

#[tokio::test]
async fn whitespace_only_text_is_still_embedded() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default_config();
    config.embedding.dimension = DIM;
    config.classification.snapshot_path = dir.path().join("mapping.json");

    let source = MemoryStore::new("labels")
        .with_records(vec![
            record("w1", json!({"combined_text": "  "})),
            record("w2", json!({"combined_text": "\n"})),
        ])
        .await;
    let destination = MemoryStore::new("labels_embedded");
    let context = PipelineContext::new(
        config,
        Arc::new(source),
        Arc::new(destination.clone()),
        Arc::new(HashEmbedder::new(DIM)),
        Arc::new(AtcTable),
    );

    let report = PipelineOrchestrator::new(&context)
        .run_reindex(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.summary.attempted(), 2);
    assert_eq!(report.summary.succeeded(), 2);
    assert_eq!(report.stats.skipped_missing_text, 0);
    assert_eq!(
        destination.ids().await,
        vec!["w1".to_string(), "w2".to_string()]
    );
}

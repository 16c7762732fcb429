// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod classification;
pub mod config;
pub mod corpus;
pub mod database;
pub mod error;
pub mod exporter;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod utils;

pub use classification::{
    AggregationOutcome, ClassificationLookup, KeyAggregator, RxClassClient, collect_keys,
    read_keys_file,
};
pub use config::{
    ClassificationConfig, Config, EmbeddingConfig, EmbeddingProvider, ReindexConfig, StoreConfig,
};
pub use corpus::{DestinationIndexProbe, SourceScanner};
pub use database::{
    BulkWriter, DocumentStore, Embedder, HashEmbedder, HttpEmbeddingClient, MemoryStore,
    OpenSearchClient, OpenSearchIndex, PageRequest, build_embedder,
};
pub use error::{PipelineError, Result};
pub use exporter::MappingSnapshot;
pub use models::{
    ClassificationKey, ClassificationResult, Cursor, EnrichedRecord, EnrichmentMapping,
    ItemOutcome, ItemStatus, RunSummary, SourceRecord, UNRESOLVED_SENTINEL,
};
pub use parser::FieldNormalizer;
pub use pipeline::{
    ClassificationReport, PipelineContext, PipelineOrchestrator, PipelineStats, ProgressTracker,
    ReindexReport,
};
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        let _embedder = HashEmbedder::new(config.embedding.dimension);
        let _normalizer = FieldNormalizer::new();
    }
}

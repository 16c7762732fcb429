// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod classification;
pub mod record;
pub mod summary;

pub use classification::{
    ClassificationKey, ClassificationResult, EnrichmentMapping, UNRESOLVED_SENTINEL,
};
pub use record::{Cursor, EnrichedRecord, SourceRecord};
pub use summary::{ItemOutcome, ItemStatus, RunSummary};

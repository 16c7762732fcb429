// file: src/classification/mod.rs
// description: classification lookup and key aggregation module exports
// reference: internal module structure

pub mod aggregator;
pub mod fetcher;
pub mod keys;

pub use aggregator::{AggregationOutcome, KeyAggregator};
pub use fetcher::{ClassificationLookup, RxClassClient};
pub use keys::{collect_keys, read_keys_file};

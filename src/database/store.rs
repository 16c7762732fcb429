// file: src/database/store.rs
// description: document store abstraction shared by the scanner, probe and bulk writer
// reference: search_after pagination and per-item bulk responses

use crate::error::Result;
use crate::models::{Cursor, EnrichedRecord, ItemOutcome, SourceRecord};
use async_trait::async_trait;

/// One page of a sorted scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub size: usize,
    pub after: Option<Cursor>,
    /// When false only identifiers are returned and `fields` stay empty.
    pub include_source: bool,
}

impl PageRequest {
    pub fn first(size: usize) -> Self {
        Self {
            size,
            after: None,
            include_source: true,
        }
    }

    pub fn ids_only(mut self) -> Self {
        self.include_source = false;
        self
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.after = Some(cursor);
        self
    }
}

/// A single index in the document store.
///
/// Implementations must be safe to share between workers; all methods
/// take `&self`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn index_name(&self) -> &str;

    async fn ping(&self) -> Result<()>;

    async fn exists(&self) -> Result<bool>;

    /// Returns up to `size` records sorted by id ascending, strictly after
    /// the cursor. An empty page means the scan is over.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<SourceRecord>>;

    /// Writes each record keyed by its id. Item rejections come back as
    /// outcomes; only a failure of the request itself is an `Err`.
    async fn bulk_index(&self, records: &[EnrichedRecord]) -> Result<Vec<ItemOutcome>>;

    /// Document count; zero when the index does not exist.
    async fn count(&self) -> Result<u64>;
}

// file: src/database/memory.rs
// description: in-memory document store for tests and offline runs
// reference: behaves like one OpenSearch index sorted by _id

use crate::database::store::{DocumentStore, PageRequest};
use crate::error::{PipelineError, Result};
use crate::models::{EnrichedRecord, ItemOutcome, SourceRecord};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory index keyed by document id.
///
/// Clones share the same documents, so a test can keep a handle while the
/// pipeline writes through another. Rejections and outages can be injected.
#[derive(Clone, Default)]
pub struct MemoryStore {
    name: String,
    documents: Arc<RwLock<BTreeMap<String, Map<String, Value>>>>,
    rejected_ids: Arc<RwLock<HashSet<String>>>,
    created: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
    items_received: Arc<AtomicUsize>,
    pages_served: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Seeds the index with records, replacing documents with the same id.
    pub async fn with_records(self, records: impl IntoIterator<Item = SourceRecord>) -> Self {
        self.created.store(true, Ordering::SeqCst);
        {
            let mut documents = self.documents.write().await;
            for record in records {
                documents.insert(record.id, record.fields);
            }
        }
        self
    }

    /// Every bulk item for this id will be rejected.
    pub async fn reject_id(&self, id: impl Into<String>) {
        self.rejected_ids.write().await.insert(id.into());
    }

    /// Makes every request fail as if the cluster were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn document(&self, id: &str) -> Option<Map<String, Value>> {
        self.documents.read().await.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Total bulk items received, written or rejected.
    pub fn items_received(&self) -> usize {
        self.items_received.load(Ordering::SeqCst)
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PipelineError::StoreUnavailable(format!(
                "memory store {} is offline",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    /// The index exists once it was seeded or received a bulk write.
    async fn exists(&self) -> Result<bool> {
        self.check_available()?;
        Ok(self.created.load(Ordering::SeqCst))
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<SourceRecord>> {
        self.check_available()?;
        self.pages_served.fetch_add(1, Ordering::SeqCst);

        let documents = self.documents.read().await;
        let lower = match &request.after {
            Some(cursor) => Bound::Excluded(cursor.as_str().to_string()),
            None => Bound::Unbounded,
        };

        let page = documents
            .range((lower, Bound::Unbounded))
            .take(request.size)
            .map(|(id, fields)| {
                let fields = if request.include_source {
                    fields.clone()
                } else {
                    Map::new()
                };
                SourceRecord::new(id.clone(), fields)
            })
            .collect();

        Ok(page)
    }

    async fn bulk_index(&self, records: &[EnrichedRecord]) -> Result<Vec<ItemOutcome>> {
        self.check_available()?;
        self.items_received.fetch_add(records.len(), Ordering::SeqCst);
        self.created.store(true, Ordering::SeqCst);

        let rejected = self.rejected_ids.read().await;
        let mut documents = self.documents.write().await;

        let outcomes = records
            .iter()
            .map(|record| {
                if rejected.contains(&record.id) {
                    return ItemOutcome::rejected(&record.id, "rejected by memory store");
                }
                if let Value::Object(document) = record.to_document() {
                    documents.insert(record.id.clone(), document);
                }
                ItemOutcome::written(&record.id)
            })
            .collect();

        debug!("Memory store {} received {} items", self.name, records.len());
        Ok(outcomes)
    }

    async fn count(&self) -> Result<u64> {
        self.check_available()?;
        Ok(self.documents.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> SourceRecord {
        let mut fields = Map::new();
        fields.insert("combined_text".to_string(), json!(id));
        SourceRecord::new(id, fields)
    }

    #[tokio::test]
    async fn test_pages_follow_id_order() {
        let store = MemoryStore::new("src")
            .with_records(vec![record("b"), record("a"), record("c")])
            .await;

        let first = store.fetch_page(&PageRequest::first(2)).await.unwrap();
        assert_eq!(first.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);

        let next = PageRequest::first(2).after(first[1].cursor());
        let second = store.fetch_page(&next).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "c");
    }

    #[tokio::test]
    async fn test_ids_only_pages_have_no_fields() {
        let store = MemoryStore::new("dst").with_records(vec![record("a")]).await;
        let page = store
            .fetch_page(&PageRequest::first(10).ids_only())
            .await
            .unwrap();
        assert!(page[0].fields.is_empty());
    }

    #[tokio::test]
    async fn test_injected_rejection_and_outage() {
        let store = MemoryStore::new("dst");
        store.reject_id("bad").await;
        assert!(!store.exists().await.unwrap());

        let records = vec![
            record("good").enrich("search_vector", vec![0.0]),
            record("bad").enrich("search_vector", vec![0.0]),
        ];
        let outcomes = store.bulk_index(&records).await.unwrap();
        assert!(outcomes[0].is_written());
        assert!(!outcomes[1].is_written());
        assert_eq!(store.ids().await, vec!["good".to_string()]);
        assert!(store.exists().await.unwrap());

        store.set_unavailable(true);
        let err = store.count().await.unwrap_err();
        assert!(err.is_store_failure());
    }
}

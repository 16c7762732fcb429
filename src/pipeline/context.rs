// file: src/pipeline/context.rs
// description: process-wide handles built once at startup and lent to every pass
// reference: one shared store connection and one encoder per process

use crate::classification::fetcher::{ClassificationLookup, RxClassClient};
use crate::config::Config;
use crate::database::client::OpenSearchClient;
use crate::database::embeddings::{Embedder, build_embedder};
use crate::database::store::DocumentStore;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Store handles, encoder and lookup client for one process.
///
/// All store handles built by [`PipelineContext::from_config`] share a
/// single HTTP connection pool. Everything is released when the context is
/// dropped.
pub struct PipelineContext {
    pub config: Config,
    pub source: Arc<dyn DocumentStore>,
    pub destination: Arc<dyn DocumentStore>,
    pub key_source: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn Embedder>,
    pub lookup: Arc<dyn ClassificationLookup>,
}

impl PipelineContext {
    pub fn from_config(config: Config) -> Result<Self> {
        let client = OpenSearchClient::new(&config.store)?;
        let source: Arc<dyn DocumentStore> = Arc::new(client.index(&config.store.source_index));
        let destination: Arc<dyn DocumentStore> =
            Arc::new(client.index(&config.store.destination_index));
        let key_source: Arc<dyn DocumentStore> = Arc::new(client.index(config.key_index()));

        let embedder = build_embedder(&config.embedding)?;
        let lookup: Arc<dyn ClassificationLookup> =
            Arc::new(RxClassClient::new(&config.classification)?);

        info!(
            "Pipeline context ready: {} -> {} (encoder {}, dimension {})",
            config.store.source_index,
            config.store.destination_index,
            embedder.model_name(),
            embedder.dimension()
        );

        Ok(Self {
            config,
            source,
            destination,
            key_source,
            embedder,
            lookup,
        })
    }

    /// Assembles a context from explicit parts; keys are read from the
    /// destination.
    pub fn new(
        config: Config,
        source: Arc<dyn DocumentStore>,
        destination: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        lookup: Arc<dyn ClassificationLookup>,
    ) -> Self {
        Self {
            config,
            source,
            key_source: Arc::clone(&destination),
            destination,
            embedder,
            lookup,
        }
    }

    pub fn with_key_source(mut self, key_source: Arc<dyn DocumentStore>) -> Self {
        self.key_source = key_source;
        self
    }
}

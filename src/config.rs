// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use crate::utils::validation::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub store: StoreConfig,
    pub reindex: ReindexConfig,
    pub embedding: EmbeddingConfig,
    pub classification: ClassificationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub source_index: String,
    pub destination_index: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReindexConfig {
    pub page_size: usize,
    pub chunk_size: usize,
    pub write_workers: usize,
    pub embed_workers: usize,
    pub text_field: String,
    pub vector_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Http,
    Hash,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassificationConfig {
    pub endpoint: String,
    pub class_types: String,
    pub class_type: String,
    pub workers: usize,
    pub timeout_secs: u64,
    pub key_field: String,
    /// Index scanned for keys; falls back to the destination index.
    #[serde(default)]
    pub key_index: Option<String>,
    pub snapshot_path: PathBuf,
}

impl Config {
    /// Layers built-in defaults, the optional TOML file, `MEDSEARCH__*`
    /// variables and the legacy `OPENSEARCH_*` variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MEDSEARCH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            store: StoreConfig {
                url: "https://localhost:9200".to_string(),
                username: None,
                password: None,
                timeout_secs: 30,
                source_index: "usa_dataset_filtered_v2".to_string(),
                destination_index: "usa_dataset_filtered_embeddings_generic".to_string(),
            },
            reindex: ReindexConfig {
                page_size: 100,
                chunk_size: 64,
                write_workers: 4,
                embed_workers: 4,
                text_field: "combined_text".to_string(),
                vector_field: "search_vector".to_string(),
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Http,
                endpoint: "http://localhost:8080/v1/embeddings".to_string(),
                model: "sentence-transformers/all-distilroberta-v1".to_string(),
                api_key: None,
                dimension: 768,
                timeout_secs: 30,
            },
            classification: ClassificationConfig {
                endpoint: "https://rxnav.nlm.nih.gov/REST/rxclass/class/byRxcui.json"
                    .to_string(),
                class_types: "ATCPROD".to_string(),
                class_type: "ATC1-4".to_string(),
                workers: 10,
                timeout_secs: 10,
                key_field: "openfda.rxcui".to_string(),
                key_index: None,
                snapshot_path: PathBuf::from("data/rxcui_to_atc4_mapping.json"),
            },
        }
    }

    /// Index the classification pass reads its keys from.
    pub fn key_index(&self) -> &str {
        self.classification
            .key_index
            .as_deref()
            .unwrap_or(&self.store.destination_index)
    }

    fn apply_legacy_env(&mut self) {
        self.apply_legacy_vars(|name| std::env::var(name).ok());
    }

    // Existing deployments export these names; they win over the file.
    fn apply_legacy_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("OPENSEARCH_URL") {
            self.store.url = url;
        }
        if let Some(user) = var("OPENSEARCH_USER") {
            self.store.username = Some(user);
        }
        if let Some(pass) = var("OPENSEARCH_PASS") {
            self.store.password = Some(pass);
        }
    }

    pub fn validate(&self) -> Result<()> {
        Validator::validate_url(&self.store.url)?;
        Validator::validate_url(&self.classification.endpoint)?;
        if self.embedding.provider == EmbeddingProvider::Http {
            Validator::validate_url(&self.embedding.endpoint)?;
        }

        Validator::validate_index_name(&self.store.source_index)?;
        Validator::validate_index_name(&self.store.destination_index)?;
        if let Some(index) = &self.classification.key_index {
            Validator::validate_index_name(index)?;
        }

        Validator::validate_batch_size(self.reindex.page_size)?;
        Validator::validate_batch_size(self.reindex.chunk_size)?;

        if self.reindex.write_workers == 0
            || self.reindex.embed_workers == 0
            || self.classification.workers == 0
        {
            return Err(PipelineError::Config(
                "worker counts must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(PipelineError::Config(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        if self.reindex.text_field.trim().is_empty() || self.reindex.vector_field.trim().is_empty()
        {
            return Err(PipelineError::Config(
                "text_field and vector_field must be set".to_string(),
            ));
        }

        if self.store.source_index == self.store.destination_index {
            return Err(PipelineError::Config(
                "source_index and destination_index must differ".to_string(),
            ));
        }

        Ok(())
    }
}

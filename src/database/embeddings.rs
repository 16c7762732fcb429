// file: src/database/embeddings.rs
// description: text embedding providers behind a single encoder trait
// reference: OpenAI-compatible /v1/embeddings servers (text-embeddings-inference, vLLM, Groq)

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Turns a text value into a vector of fixed dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Builds the embedder selected in the configuration.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Http => {
            info!(
                "Using HTTP embeddings from {} (model {})",
                config.endpoint, config.model
            );
            Ok(Arc::new(HttpEmbeddingClient::new(config)?))
        }
        EmbeddingProvider::Hash => {
            info!("Using deterministic hash embeddings (dimension {})", config.dimension);
            Ok(Arc::new(HashEmbedder::new(config.dimension)))
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbeddingClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: vec![text],
            model: &self.model,
        };

        debug!("Requesting embedding for {} chars", text.len());

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            PipelineError::Embedding(format!("Failed to send embedding request: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Embedding(format!(
                "Embedding request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            PipelineError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| PipelineError::Embedding("No embedding data returned".to_string()))
    }
}

/// Deterministic unit vectors derived from a SHA-256 of the text.
///
/// Same text, same vector. Carries no semantics; meant for offline runs
/// and tests.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.dimension);
        let mut block = 0u32;
        while values.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(block.to_le_bytes());
            hasher.update(text.as_bytes());
            for byte in hasher.finalize() {
                if values.len() == self.dimension {
                    break;
                }
                values.push(byte as f32 / 255.0 - 0.5);
            }
            block += 1;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        values
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "sha256-hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_dimension_and_norm() {
        let embedder = HashEmbedder::new(768);
        let vector = embedder.vector_for("aspirin");
        assert_eq!(vector.len(), 768);
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hash_embedding_deterministic() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.vector_for("ibuprofen"), embedder.vector_for("ibuprofen"));
        assert_ne!(embedder.vector_for("ibuprofen"), embedder.vector_for("aspirin"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_embedding_error() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Http,
            endpoint: "http://127.0.0.1:9/v1/embeddings".to_string(),
            model: "test".to_string(),
            api_key: None,
            dimension: 8,
            timeout_secs: 2,
        };
        let client = HttpEmbeddingClient::new(&config).unwrap();
        let err = client.embed("aspirin").await.unwrap_err();
        assert!(matches!(err, PipelineError::Embedding(_)));
    }

    #[test]
    fn test_build_embedder_selects_provider() {
        let mut config = crate::config::Config::default_config().embedding;
        config.provider = EmbeddingProvider::Hash;
        config.dimension = 12;
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 12);
        assert_eq!(embedder.model_name(), "sha256-hash");

        let vector = tokio_test::block_on(embedder.embed("naproxen")).unwrap();
        assert_eq!(vector.len(), 12);
    }
}

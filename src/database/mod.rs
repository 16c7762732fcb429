// file: src/database/mod.rs
// description: document store, embedding and bulk write module exports
// reference: internal module structure

pub mod client;
pub mod embeddings;
pub mod insert;
pub mod memory;
pub mod store;

pub use client::{OpenSearchClient, OpenSearchIndex};
pub use embeddings::{Embedder, HashEmbedder, HttpEmbeddingClient, build_embedder};
pub use insert::BulkWriter;
pub use memory::MemoryStore;
pub use store::{DocumentStore, PageRequest};

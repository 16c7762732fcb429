// file: src/parser/mod.rs
// description: ingestion-boundary parsing module exports
// reference: internal module structure

mod normalizer;

pub use normalizer::FieldNormalizer;

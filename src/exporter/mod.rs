// file: src/exporter/mod.rs
// description: snapshot export module exports
// reference: internal module structure

pub mod json;

pub use json::MappingSnapshot;

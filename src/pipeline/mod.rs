// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

pub mod context;
pub mod orchestrator;
pub mod progress;

pub use context::PipelineContext;
pub use orchestrator::{ClassificationReport, PipelineOrchestrator, ReindexReport};
pub use progress::{PipelineStats, ProgressTracker};

// file: src/corpus/mod.rs
// description: source scanning and destination membership module exports
// reference: internal module structure

pub mod probe;
pub mod scanner;

pub use probe::DestinationIndexProbe;
pub use scanner::SourceScanner;

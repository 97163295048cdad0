// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod record;
pub mod sink;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::CollectorConfig;
pub use crate::ingest::scheduler::{Collector, LoopExit};
pub use crate::ingest::Mode;
pub use crate::record::{Record, SourceApi};
pub use crate::sink::RecordSink;

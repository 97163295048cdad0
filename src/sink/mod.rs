// src/sink/mod.rs
pub mod file;
pub mod forward;
pub mod rotation;

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

use crate::config::{CollectorConfig, SinkKind};
use crate::record::Record;

#[async_trait::async_trait]
pub trait RecordSink: Send {
    /// Persist or forward one record. `Err` means the sink itself is broken.
    async fn write(&mut self, record: &Record) -> Result<()>;

    /// Where records end up, for the startup banner.
    fn target(&self) -> String;
}

/// Build the sink this deployment is configured for.
pub fn build_sink(cfg: &CollectorConfig, client: reqwest::Client) -> Result<Box<dyn RecordSink>> {
    match cfg.sink_kind()? {
        SinkKind::File => {
            let logging = cfg
                .logging
                .as_ref()
                .ok_or_else(|| anyhow!("missing [logging] section"))?;
            Ok(Box::new(file::RotatingFileSink::open(logging)?))
        }
        SinkKind::Datadog => {
            let dd = cfg
                .datadog
                .clone()
                .ok_or_else(|| anyhow!("missing [datadog] section"))?;
            Ok(Box::new(forward::DatadogSink::new(dd, client)))
        }
    }
}

// --- Test helper ---
/// Keeps records in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    pub records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RecordSink for MemorySink {
    async fn write(&mut self, record: &Record) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("memory sink poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn target(&self) -> String {
        "memory".to_string()
    }
}

// src/ingest/types.rs
use anyhow::Result;
use metrics::counter;

use crate::record::{Record, SourceApi};

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// One fetch against the upstream API. Any error aborts the whole fetch.
    async fn fetch_latest(&self) -> Result<Vec<Record>>;

    fn source_api(&self) -> SourceApi;

    /// Fetch, turning a failed fetch into exactly one error record.
    async fn collect(&self) -> Vec<Record> {
        match self.fetch_latest().await {
            Ok(records) => records,
            Err(e) => {
                let source = self.source_api();
                tracing::warn!(error = %format!("{e:#}"), provider = source.as_str(), "provider error");
                counter!("collector_provider_errors_total", "source_api" => source.as_str())
                    .increment(1);
                vec![Record::error(source, &e)]
            }
        }
    }
}

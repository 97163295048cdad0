// src/ingest/providers/alm.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::config::AlmConfig;
use crate::ingest::types::SourceProvider;
use crate::record::{now_timestamp, AlmRecord, Record, SourceApi, NOT_AVAILABLE};

const TIMEOUT: Duration = Duration::from_secs(15);

/// OData v4 CSDL namespace that qualifies `EntitySet` elements.
pub const EDM_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/edm";

/// Names of every `edm:EntitySet` in a `$metadata` document, in document order.
pub fn entity_set_names(xml: &str) -> Result<Vec<String>> {
    let mut reader = NsReader::from_str(xml);
    let mut names = Vec::new();
    loop {
        match reader
            .read_resolved_event()
            .context("parsing $metadata xml")?
        {
            (ResolveResult::Bound(Namespace(ns)), Event::Start(e) | Event::Empty(e))
                if ns == EDM_NAMESPACE.as_bytes() && e.local_name().as_ref() == b"EntitySet" =>
            {
                let attr = e
                    .try_get_attribute("Name")?
                    .ok_or_else(|| anyhow!("EntitySet without Name attribute"))?;
                names.push(attr.unescape_value()?.into_owned());
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }
    Ok(names)
}

/// Flatten one collection item. `Name`/`Status` fall back to "N/A".
pub fn record_from_item(entity: &str, item: &Value) -> AlmRecord {
    let field = |key: &str| {
        item.get(key)
            .cloned()
            .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()))
    };
    AlmRecord {
        timestamp: now_timestamp(),
        source_api: SourceApi::Alm,
        entity: entity.to_string(),
        name: field("Name"),
        status: field("Status"),
        raw_data: item.clone(),
    }
}

/// SAP Cloud ALM over OData: token exchange, entity discovery, then one GET per entity.
pub struct AlmProvider {
    cfg: AlmConfig,
    client: reqwest::Client,
}

impl AlmProvider {
    pub fn new(cfg: AlmConfig, client: reqwest::Client) -> Self {
        Self { cfg, client }
    }

    /// OAuth2 client-credentials grant. A fresh token is fetched every cycle.
    pub async fn fetch_token(&self) -> Result<String> {
        let body: Value = self
            .client
            .post(&self.cfg.token_url)
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .timeout(TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context("alm token request")?
            .json()
            .await
            .context("alm token response body")?;

        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("token response has no access_token"))
    }

    pub async fn discover_entities(&self, token: &str) -> Result<Vec<String>> {
        let url = format!("{}$metadata", self.cfg.base_api_url);
        let xml = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/xml")
            .timeout(TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context("alm $metadata request")?
            .text()
            .await
            .context("alm $metadata body")?;
        entity_set_names(&xml)
    }

    /// Items of one entity collection; `None` when the service answers non-200.
    async fn fetch_entity(&self, token: &str, entity: &str) -> Result<Option<Vec<Value>>> {
        let url = format!("{}{}", self.cfg.base_api_url, entity);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(TIMEOUT)
            .send()
            .await
            .with_context(|| format!("alm entity {entity} request"))?;

        if resp.status() != StatusCode::OK {
            tracing::debug!(entity, status = %resp.status(), "skipping entity");
            return Ok(None);
        }

        let mut body: Value = resp
            .json()
            .await
            .with_context(|| format!("alm entity {entity} body"))?;
        match body.get_mut("value").map(Value::take) {
            None => Ok(Some(Vec::new())),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => bail!("entity {entity}: 'value' is not an array but {other}"),
        }
    }
}

#[async_trait]
impl SourceProvider for AlmProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        let token = self.fetch_token().await?;
        let entities = self.discover_entities(&token).await?;
        tracing::debug!(count = entities.len(), "alm entities discovered");

        let mut out = Vec::new();
        for entity in &entities {
            let Some(items) = self.fetch_entity(&token, entity).await? else {
                continue;
            };
            out.extend(
                items
                    .iter()
                    .map(|item| Record::Alm(record_from_item(entity, item))),
            );
        }
        Ok(out)
    }

    fn source_api(&self) -> SourceApi {
        SourceApi::Alm
    }
}

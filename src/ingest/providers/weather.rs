// src/ingest/providers/weather.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::WeatherConfig;
use crate::ingest::types::SourceProvider;
use crate::record::{now_timestamp, Record, SourceApi, Status, WeatherRecord};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Current conditions for one city from the OpenWeatherMap `weather` endpoint.
pub struct WeatherProvider {
    cfg: WeatherConfig,
    client: reqwest::Client,
}

impl WeatherProvider {
    pub fn new(cfg: WeatherConfig, client: reqwest::Client) -> Self {
        Self { cfg, client }
    }

    fn endpoint(&self) -> String {
        format!("{}/weather", self.cfg.base_url.trim_end_matches('/'))
    }

    /// Missing members become `None`; only the transport can fail.
    pub fn record_from_body(body: &Value) -> WeatherRecord {
        let main = body.get("main");
        let number = |key: &str| main.and_then(|m| m.get(key)).and_then(Value::as_f64);

        WeatherRecord {
            timestamp: now_timestamp(),
            source_api: SourceApi::Weather,
            city: body.get("name").and_then(Value::as_str).map(str::to_string),
            temperature_celsius: number("temp"),
            feels_like_celsius: number("feels_like"),
            humidity_percent: match main.and_then(|m| m.get("humidity")) {
                Some(Value::Number(n)) => Some(n.clone()),
                _ => None,
            },
            weather_description: body
                .get("weather")
                .and_then(|w| w.get(0))
                .and_then(|w| w.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string),
            status: Status::Success,
        }
    }
}

#[async_trait]
impl SourceProvider for WeatherProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[
                ("q", self.cfg.city.as_str()),
                ("appid", self.cfg.api_key.as_str()),
                ("units", "metric"),
                ("lang", "pt_br"),
            ])
            .timeout(TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            // the query string carries the api key
            .map_err(reqwest::Error::without_url)
            .context("weather http get()")?;

        let body: Value = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("weather response body")?;
        let rec = Self::record_from_body(&body);
        tracing::debug!(city = ?rec.city, temp = ?rec.temperature_celsius, "weather fetched");
        Ok(vec![Record::Weather(rec)])
    }

    fn source_api(&self) -> SourceApi {
        SourceApi::Weather
    }
}

// src/record.rs
//! Records produced by one collection cycle.
//!
//! Every record serializes to a flat JSON object (one JSON Lines row), so the
//! union is `untagged`: the variant shows up only through its fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp layout shared by all records (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Placeholder for ALM item fields the service did not send.
pub const NOT_AVAILABLE: &str = "N/A";

pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceApi {
    #[serde(rename = "openweathermap")]
    Weather,
    #[serde(rename = "sap_cloud_alm")]
    Alm,
}

impl SourceApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceApi::Weather => "openweathermap",
            SourceApi::Alm => "sap_cloud_alm",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// One successful weather observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherRecord {
    pub timestamp: String,
    pub source_api: SourceApi,
    pub city: Option<String>,
    pub temperature_celsius: Option<f64>,
    pub feels_like_celsius: Option<f64>,
    /// Kept as sent (an integer in practice).
    pub humidity_percent: Option<serde_json::Number>,
    pub weather_description: Option<String>,
    pub status: Status,
}

/// One item of an ALM entity collection.
///
/// `status` is the item's own `Status` value, not a fetch outcome.
/// `raw_data` is the untouched item for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlmRecord {
    pub timestamp: String,
    pub source_api: SourceApi,
    pub entity: String,
    pub name: Value,
    pub status: Value,
    pub raw_data: Value,
}

/// Replaces everything a failed fetch would have produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub source_api: SourceApi,
    pub status: Status,
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Record {
    Weather(WeatherRecord),
    Alm(AlmRecord),
    Error(ErrorRecord),
}

impl Record {
    /// Build an error record from any error; the full context chain is kept.
    pub fn error(source_api: SourceApi, err: &anyhow::Error) -> Self {
        let mut message = format!("{err:#}");
        if message.is_empty() {
            message = "unknown error".to_string();
        }
        Record::Error(ErrorRecord {
            timestamp: now_timestamp(),
            source_api,
            status: Status::Error,
            error_message: message,
        })
    }

    pub fn source_api(&self) -> SourceApi {
        match self {
            Record::Weather(r) => r.source_api,
            Record::Alm(r) => r.source_api,
            Record::Error(r) => r.source_api,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Record::Error(_))
    }

    /// Label used for metrics; ALM items carry no fetch status of their own.
    pub fn status_label(&self) -> &'static str {
        if self.is_error() {
            "error"
        } else {
            "success"
        }
    }

    pub fn city(&self) -> Option<&str> {
        match self {
            Record::Weather(r) => r.city.as_deref(),
            _ => None,
        }
    }

    pub fn entity(&self) -> Option<&str> {
        match self {
            Record::Alm(r) => Some(r.entity.as_str()),
            _ => None,
        }
    }

    /// Single-line JSON, as written to the file sink.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weather_record_serializes_flat() {
        let rec = Record::Weather(WeatherRecord {
            timestamp: "2024-01-01T00:00:00Z".into(),
            source_api: SourceApi::Weather,
            city: Some("Recife".into()),
            temperature_celsius: Some(27.5),
            feels_like_celsius: None,
            humidity_percent: Some(80.into()),
            weather_description: Some("nublado".into()),
            status: Status::Success,
        });
        let v: Value = serde_json::from_str(&rec.to_json_line().unwrap()).unwrap();
        assert_eq!(v["source_api"], "openweathermap");
        assert_eq!(v["status"], "success");
        assert_eq!(v["city"], "Recife");
        assert_eq!(v["humidity_percent"], json!(80));
        assert!(v["feels_like_celsius"].is_null());
    }

    #[test]
    fn error_record_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("weather http get()");
        let rec = Record::error(SourceApi::Alm, &err);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["source_api"], "sap_cloud_alm");
        assert_eq!(
            v["error_message"],
            "weather http get(): connection refused"
        );
        assert_eq!(rec.status_label(), "error");
    }

    #[test]
    fn alm_record_exposes_entity_and_raw_item() {
        let item = json!({"Name": "Deploy", "Extra": 1});
        let rec = Record::Alm(AlmRecord {
            timestamp: now_timestamp(),
            source_api: SourceApi::Alm,
            entity: "Jobs".into(),
            name: json!("Deploy"),
            status: json!(NOT_AVAILABLE),
            raw_data: item.clone(),
        });
        assert_eq!(rec.entity(), Some("Jobs"));
        assert_eq!(rec.city(), None);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["raw_data"], item);
        assert_eq!(v["status"], "N/A");
    }
}

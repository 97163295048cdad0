// tests/collector_loop.rs
use api_data_collector::record::Record;
use api_data_collector::sink::{MemorySink, RecordSink};
use api_data_collector::{Collector, CollectorConfig, LoopExit};
use mockito::{Matcher, Server};

fn config(mode: &str, weather_base: &str, sap_base: &str) -> CollectorConfig {
    let toml = format!(
        r#"
[general]
mode = "{mode}"
collection_interval_seconds = 0

[logging]
log_file_path = "unused.log"
log_rotation_interval = "midnight"
log_backup_count = 7

[openweathermap]
api_key = "k"
city = "Recife"
base_url = "{weather_base}"

[sap]
token_url = "{sap_base}/oauth/token"
client_id = "client"
client_secret = "secret"
base_api_url = "{sap_base}/api/"
"#
    );
    CollectorConfig::from_toml_str(&toml).unwrap()
}

#[tokio::test]
async fn invalid_mode_exits_without_dispatch() {
    let mut server = Server::new_async().await;
    let get = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let post = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let sink = MemorySink::new();
    let cfg = config("ftp", &server.url(), &server.url());
    let mut collector = Collector::new(cfg, reqwest::Client::new(), Box::new(sink.clone()));

    let exit = collector.run().await.unwrap();

    assert_eq!(exit, LoopExit::InvalidMode("ftp".into()));
    assert!(sink.snapshot().is_empty());
    get.assert_async().await;
    post.assert_async().await;
}

#[tokio::test]
async fn weather_mode_runs_one_fetch_per_cycle() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(include_str!("fixtures/weather_ok.json"))
        .expect(2)
        .create_async()
        .await;

    let sink = MemorySink::new();
    let cfg = config("openweathermap", &server.url(), &server.url());
    let mut collector = Collector::new(cfg, reqwest::Client::new(), Box::new(sink.clone()));

    let exit = collector.run_for(Some(2)).await.unwrap();

    assert_eq!(exit, LoopExit::Completed(2));
    mock.assert_async().await;
    let records = sink.snapshot();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status_label() == "success"));
}

#[tokio::test]
async fn alm_token_failure_reaches_sink_as_single_error() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/oauth/token")
        .with_status(503)
        .create_async()
        .await;

    let sink = MemorySink::new();
    let cfg = config("sap", &server.url(), &server.url());
    let mut collector = Collector::new(cfg, reqwest::Client::new(), Box::new(sink.clone()));

    collector.run_for(Some(1)).await.unwrap();

    let records = sink.snapshot();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_error());
}

struct FullDisk;

#[async_trait::async_trait]
impl RecordSink for FullDisk {
    async fn write(&mut self, _record: &Record) -> anyhow::Result<()> {
        anyhow::bail!("no space left on device")
    }

    fn target(&self) -> String {
        "full-disk".into()
    }
}

#[tokio::test]
async fn sink_error_ends_the_loop() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(include_str!("fixtures/weather_ok.json"))
        .expect(1)
        .create_async()
        .await;

    let cfg = config("openweathermap", &server.url(), &server.url());
    let mut collector = Collector::new(cfg, reqwest::Client::new(), Box::new(FullDisk));

    let err = collector.run_for(Some(3)).await.unwrap_err();

    assert!(format!("{err:#}").contains("no space left on device"), "{err:#}");
    mock.assert_async().await;
}

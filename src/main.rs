//! API data collector — binary entrypoint.
//! Loads the config, opens the sink and runs the collection loop until
//! interrupted.

use api_data_collector::{config, ingest, sink, telemetry, Collector, LoopExit};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

/// Pause after an unexpected loop failure before the process stops.
const COOLDOWN: Duration = Duration::from_secs(60);

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init();

    let cfg = match config::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %format!("{e:#}"), "configuration error");
            return ExitCode::FAILURE;
        }
    };

    let client = match ingest::build_http_client() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %format!("{e:#}"), "http client setup failed");
            return ExitCode::FAILURE;
        }
    };

    let sink = match sink::build_sink(&cfg, client.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %format!("{e:#}"), "sink setup failed");
            return ExitCode::FAILURE;
        }
    };

    let mut collector = Collector::new(cfg, client, sink);

    let outcome = tokio::select! {
        res = collector.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("collector interrupted by user");
            return ExitCode::SUCCESS;
        }
    };

    match outcome {
        Ok(LoopExit::InvalidMode(_)) => ExitCode::FAILURE,
        Ok(LoopExit::Completed(cycles)) => {
            info!(cycles, "collector finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "unexpected error in main loop");
            // The loop is not re-entered; wait out the cooldown and stop.
            tokio::select! {
                _ = tokio::time::sleep(COOLDOWN) => {}
                _ = tokio::signal::ctrl_c() => info!("collector interrupted by user"),
            }
            ExitCode::FAILURE
        }
    }
}

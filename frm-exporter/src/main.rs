// FRM Exporter - Prometheus exporter for FICSIT Remote Monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # FRM Exporter
//!
//! Polls the FICSIT Remote Monitoring web server and exposes train timing,
//! train readings and power circuits as Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Poll a local FRM web server
//! frm-exporter --frm-address http://localhost:8080
//!
//! # Two dedicated servers, custom port and lap ceiling
//! frm-exporter --frm-address http://a:8080 --frm-address http://b:8080 \
//!     --port 9090 --max-lap-seconds 600
//! ```

mod config;
mod fetch;
mod metrics;
mod poller;
mod power;
mod train;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use clap::Parser;
use config::{ExporterConfig, ExporterError};
use fetch::FrmClient;
use frm_companion::{SystemClock, TimingConfig};
use metrics::encode_metrics;
use poller::{PollState, Poller};
use power::{PowerCollector, POWER_ENDPOINT};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use train::{TrainCollector, TRAIN_ENDPOINT};

/// FRM Prometheus Exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// FRM web server address (repeat for several servers)
    #[arg(short = 'a', long = "frm-address", default_value = "http://localhost:8080")]
    frm_addresses: Vec<String>,

    /// Session name attached to every metric
    #[arg(short, long, default_value = "default")]
    session_name: String,

    /// Seconds between polls
    #[arg(long, default_value = "15")]
    poll_interval_secs: u64,

    /// HTTP request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Round trips longer than this are discarded
    #[arg(long, default_value = "120")]
    max_lap_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> ExporterConfig {
        ExporterConfig {
            port: self.port,
            frm_addresses: self.frm_addresses,
            session_name: self.session_name,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            request_timeout: Duration::from_millis(self.timeout_ms),
            timing: TimingConfig::with_max_lap_duration(Duration::from_secs(self.max_lap_seconds)),
        }
    }
}

/// Application state shared across handlers.
struct AppState {
    poll_state: Arc<PollState>,
    trains: TrainCollector,
    config: ExporterConfig,
    start_time: std::time::Instant,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("FRM Exporter v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args.into_config()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: ExporterConfig) -> Result<(), ExporterError> {
    config.validate()?;

    let client = FrmClient::new(config.request_timeout)?;
    let timing = Arc::new(frm_companion::TrainCollector::with_config(
        Arc::new(SystemClock),
        config.timing.clone(),
    )?);
    let trains = TrainCollector::new(client.clone(), TRAIN_ENDPOINT, timing);
    let power = PowerCollector::new(client, POWER_ENDPOINT);
    let poll_state = Arc::new(PollState::default());

    info!(
        "Round trips above {}s are discarded",
        config.timing.max_lap_duration.as_secs()
    );

    // One poll loop per FRM server; timing state is kept per address.
    let (shutdown, shutdown_rx) = watch::channel(false);
    for address in &config.frm_addresses {
        let poller = Poller::new(
            address.clone(),
            config.session_name.clone(),
            config.poll_interval,
            trains.clone(),
            power.clone(),
            Arc::clone(&poll_state),
        );
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            poller.run(shutdown_rx).await;
        });
    }

    let port = config.port;
    let state = Arc::new(AppState {
        poll_state,
        trains,
        config,
        start_time: std::time::Instant::now(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    let _ = shutdown.send(true);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>FRM Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>FRM Exporter</h1>
    <p>Prometheus exporter for FICSIT Remote Monitoring.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/ready">/ready</a> - Readiness check</div>
        <div class="endpoint"><a href="/status">/status</a> - Status information (JSON)</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>train_segment_trip_seconds</code> - Time between two consecutive stations</li>
        <li><code>train_round_trip_seconds</code> - Time for a full loop of the timetable</li>
        <li><code>train_derailed</code> - Derailment flag</li>
        <li><code>train_power_consumed</code> - Power drawn per train</li>
        <li><code>train_*_mass</code> - Train mass and payload</li>
        <li><code>train_circuit_power_consumed*</code> - Train power per circuit</li>
        <li><code>power_*</code>, <code>battery_*</code>, <code>fuse_triggered</code> - Power circuits</li>
    </ul>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    match encode_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; charset=utf-8")],
            metrics,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("Content-Type", "text/plain; charset=utf-8")],
            e.to_string(),
        ),
    }
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler: ready once trains have been read at least once.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.poll_state.ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Waiting for first poll")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    sources: Vec<String>,
    session: String,
    poll_interval_secs: u64,
    max_lap_seconds: u64,
    polls: usize,
    poll_failures: usize,
    tracked_trains: usize,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sources: state.config.frm_addresses.clone(),
        session: state.config.session_name.clone(),
        poll_interval_secs: state.config.poll_interval.as_secs(),
        max_lap_seconds: state.config.timing.max_lap_duration.as_secs(),
        polls: state.poll_state.polls.load(Ordering::SeqCst),
        poll_failures: state.poll_state.failures.load(Ordering::SeqCst),
        tracked_trains: state.trains.tracked_trains(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["frm-exporter"]);
        let config = args.into_config();
        assert_eq!(config, ExporterConfig::default());
    }

    #[test]
    fn test_args_multiple_addresses() {
        let args = Args::parse_from([
            "frm-exporter",
            "--frm-address",
            "http://a:8080",
            "--frm-address",
            "http://b:8080",
            "--max-lap-seconds",
            "600",
        ]);
        let config = args.into_config();
        assert_eq!(config.frm_addresses, vec!["http://a:8080", "http://b:8080"]);
        assert_eq!(config.timing.max_lap_duration, Duration::from_secs(600));
    }
}

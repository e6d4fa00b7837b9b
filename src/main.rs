//! Floor Vision Worker - Main Entry Point
//!
//! Loads the two classifiers, then answers one JSON request per stdin line
//! until the input closes. Protocol lines go to stdout, logs to stderr.

use anyhow::{Context, Result};
use floor_vision_worker::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    consumer::RequestConsumer,
    metrics::{MetricsReporter, WorkerMetrics},
    models::registry::ModelRegistry,
    producer::{ResultProducer, STATUS_LOADING, STATUS_READY},
    worker::Worker,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_arg = std::env::args().nth(1);
    let config = match &config_arg {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };
    let config_path = config_arg.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config =
        config.with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.logging)?;
    info!(config = %config_path, "Starting floor vision worker");
    info!(
        "Pressure threshold: {:.2} hPa, {:.2} hPa per floor",
        config.selection.pressure_threshold_hpa, config.floor.hpa_per_floor
    );

    let mut producer = ResultProducer::new(tokio::io::stdout(), &config.protocol.result_marker);

    producer.status(STATUS_LOADING).await?;
    let registry = ModelRegistry::load(&config).context("Failed to load models")?;
    producer.status(STATUS_READY).await?;
    info!(models = ?registry.model_ids(), "Models ready");

    let metrics = Arc::new(WorkerMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let mut consumer = RequestConsumer::new(BufReader::new(tokio::io::stdin()));
    let mut worker = Worker::new(registry, &config, metrics.clone());
    let result = worker.run(&mut consumer, &mut producer).await;

    info!("Worker shutting down...");
    metrics.print_summary();

    result
}

/// Initialize tracing on stderr; `RUST_LOG` overrides the configured level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }

    Ok(())
}

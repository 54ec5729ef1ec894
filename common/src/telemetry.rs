// Telemetry module for structured logging and Prometheus metrics

use crate::cadence::Cadence;
use anyhow::Result;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting
///
/// This function sets up the tracing subscriber with:
/// - JSON formatting for structured logs
/// - Span context in all log entries
/// - Log levels from configuration or environment
#[tracing::instrument(skip_all)]
pub fn init_logging(log_level: &str) -> Result<()> {
    // Create environment filter from log level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    // Create JSON formatting layer with span context
    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(
        log_level = log_level,
        "Structured logging initialized with JSON formatting"
    );

    Ok(())
}

/// Initialize Prometheus metrics exporter
///
/// This function sets up the Prometheus metrics exporter and registers all metrics:
/// - backup_success_total: Counter for successful backup cycles
/// - backup_failure_total: Counter for failed backup cycles
/// - backup_duration_seconds: Histogram for full cycle duration
/// - retention_deleted_total: Counter for archives removed by pruning
///
/// A port of 0 disables the exporter entirely.
#[tracing::instrument(skip_all)]
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    if metrics_port == 0 {
        tracing::info!("Prometheus metrics exporter disabled (metrics_port = 0)");
        return Ok(());
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    // Build and install the Prometheus exporter
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    // Describe all metrics for better Prometheus integration
    describe_counter!(
        "backup_success_total",
        "Total number of successful backup cycles"
    );
    describe_counter!(
        "backup_failure_total",
        "Total number of failed backup cycles"
    );
    describe_histogram!(
        "backup_duration_seconds",
        "Duration of full backup cycles in seconds"
    );
    describe_counter!(
        "retention_deleted_total",
        "Total number of expired archives deleted by retention pruning"
    );

    tracing::info!(
        metrics_port = metrics_port,
        metrics_endpoint = format!("http://0.0.0.0:{}/metrics", metrics_port),
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

/// Record a successful backup cycle
///
/// Increments the backup_success_total counter
#[inline]
pub fn record_backup_success(cadence: Cadence) {
    counter!("backup_success_total", "cadence" => cadence.to_string()).increment(1);
}

/// Record a failed backup cycle
///
/// Increments the backup_failure_total counter
#[inline]
pub fn record_backup_failure(cadence: Cadence) {
    counter!("backup_failure_total", "cadence" => cadence.to_string()).increment(1);
}

/// Record full backup cycle duration
///
/// Records the duration in the backup_duration_seconds histogram
#[inline]
pub fn record_backup_duration(cadence: Cadence, duration_seconds: f64) {
    histogram!("backup_duration_seconds", "cadence" => cadence.to_string())
        .record(duration_seconds);
}

/// Record archives deleted by retention pruning
///
/// Increments the retention_deleted_total counter
#[inline]
pub fn record_retention_deleted(cadence: Cadence, deleted: u64) {
    counter!("retention_deleted_total", "cadence" => cadence.to_string()).increment(deleted);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): relayed responses by backend, status
//! - `lb_forward_errors_total` (counter): failed exchanges by backend
//! - `lb_request_duration_seconds` (histogram): time to response headers, by backend
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;
use thiserror::Error;

use crate::config::ObservabilityConfig;

/// Failure to bring up the metrics endpoint.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics address {0:?}")]
    InvalidAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Exporter(#[from] BuildError),
}

/// Start the exporter when `config` enables it.
pub fn init_from_config(config: &ObservabilityConfig) -> Result<(), MetricsError> {
    if !config.metrics_enabled {
        return Ok(());
    }
    let addr: SocketAddr = config
        .metrics_address
        .parse()
        .map_err(|_| MetricsError::InvalidAddress(config.metrics_address.clone()))?;
    init_metrics(addr)?;
    Ok(())
}

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a response relayed from `backend`.
pub fn record_request(backend: &str, status: u16, start: Instant) {
    counter!(
        "lb_requests_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("lb_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a failed exchange with `backend`.
pub fn record_forward_error(backend: &str, start: Instant) {
    counter!("lb_forward_errors_total", "backend" => backend.to_string()).increment(1);
    histogram!("lb_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_skip_address() {
        let config = ObservabilityConfig {
            metrics_address: "nowhere".into(),
            ..ObservabilityConfig::default()
        };
        assert!(init_from_config(&config).is_ok());
    }

    #[test]
    fn test_bad_address_is_an_error() {
        let config = ObservabilityConfig {
            metrics_enabled: true,
            metrics_address: "nowhere".into(),
            ..ObservabilityConfig::default()
        };
        let err = init_from_config(&config).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidAddress(ref a) if a == "nowhere"));
    }
}

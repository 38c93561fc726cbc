//! Prometheus metrics for monitoring server health and auth traffic.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener,
//! started only when `METRICS_BIND` is configured. Without an installed
//! recorder every helper here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fc_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", 200);
//! metrics::login_attempts_total(true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Paths are left out of the labels; ids in them would explode cardinality.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment refresh attempts counter.
pub fn token_refresh_total(success: bool) {
    metrics::counter!("token_refresh_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment rejected-mutation counter.
pub fn permission_denied_total() {
    metrics::counter!("permission_denied_total").increment(1);
}

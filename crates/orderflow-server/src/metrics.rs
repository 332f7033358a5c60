//! Prometheus metrics for the orderflow server.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Cache metrics (hits, misses, entries)
//! - Ingest metrics (messages by outcome)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "orderflow_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "orderflow_http_request_duration_seconds";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "orderflow_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "orderflow_cache_misses_total";
    pub const CACHE_ENTRIES: &str = "orderflow_cache_entries";

    // Ingest metrics
    pub const INGEST_MESSAGES_TOTAL: &str = "orderflow_ingest_messages_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders from the handle.
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Record an HTTP request. `route` is the matched route template, not the raw path.
pub fn record_http_request(method: &str, route: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status_class" => status_class
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

pub fn set_cache_entries(count: usize) {
    gauge!(names::CACHE_ENTRIES).set(count as f64);
}

/// Record one processed stream message. `outcome` is a stable label such as
/// `stored` or `discarded_invalid`.
pub fn record_ingest_outcome(outcome: &'static str) {
    counter!(names::INGEST_MESSAGES_TOTAL, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_hit();
        record_cache_miss();
        set_cache_entries(3);
        record_ingest_outcome("stored");
        record_http_request("GET", "/order/{id}", 200, Duration::from_millis(2));
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            names::HTTP_REQUESTS_TOTAL,
            names::CACHE_HITS_TOTAL,
            names::CACHE_MISSES_TOTAL,
            names::CACHE_ENTRIES,
            names::INGEST_MESSAGES_TOTAL,
        ] {
            assert!(name.starts_with("orderflow_"));
        }
    }
}

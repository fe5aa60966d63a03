//! Prometheus metrics for the analytics service
//!
//! Collectors are registered in the default registry on first use and
//! rendered in text format by [`gather_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Encoder, Gauge, GaugeVec, HistogramVec, TextEncoder,
};

lazy_static! {
    // === Request Counters ===

    /// Analytics requests by dimension, view and status code
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "analytics_requests_total",
        "Total analytics requests",
        &["dimension", "view", "status"]
    ).unwrap();

    /// Cache lookups by dimension and outcome
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "analytics_cache_lookups_total",
        "Total response cache lookups",
        &["dimension", "outcome"]
    ).unwrap();

    /// Store errors by operation
    pub static ref STORE_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "analytics_store_errors_total",
        "Total document store failures",
        &["operation"]
    ).unwrap();

    // === Latency Histograms ===

    /// Store call duration
    pub static ref STORE_QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "analytics_store_query_duration_seconds",
        "Document store call latency in seconds",
        &["operation"],
        vec![0.0005, 0.001, 0.01, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();

    // === Gauges ===

    /// Cached entries per dimension
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec!(
        "analytics_cache_entries",
        "Number of cached responses",
        &["dimension"]
    ).unwrap();

    /// Health status (0=unhealthy, 1=healthy)
    pub static ref HEALTH_STATUS: Gauge = register_gauge!(
        "analytics_health_status",
        "Service health status (0=unhealthy, 1=healthy)"
    ).unwrap();
}

/// Initialize metrics system
pub fn init() {
    HEALTH_STATUS.set(1.0);
    tracing::info!("Metrics system initialized");
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a completed analytics request
#[inline]
pub fn record_request(dimension: &str, view: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[dimension, view, &status.to_string()])
        .inc();
}

/// Record a cache lookup
#[inline]
pub fn record_cache_lookup(dimension: &str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS_TOTAL
        .with_label_values(&[dimension, outcome])
        .inc();
}

/// Record a store call
#[inline]
pub fn record_store_query(operation: &str, duration_secs: f64, success: bool) {
    STORE_QUERY_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
    if !success {
        STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

/// Update cached entry count
#[inline]
pub fn update_cache_entries(dimension: &str, entries: u64) {
    CACHE_ENTRIES
        .with_label_values(&[dimension])
        .set(entries as f64);
}

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // Request metrics
    pub static ref REQUEST_COUNTER: IntCounter = register_int_counter!(
        "dwh_requests_total",
        "Total number of export requests received"
    ).unwrap();

    pub static ref REQUEST_DURATION: Histogram = register_histogram!(
        "dwh_request_duration_seconds",
        "Export request duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
    ).unwrap();

    // Per metric definition
    pub static ref METRIC_QUERIES: IntCounterVec = register_int_counter_vec!(
        "dwh_metric_queries_total",
        "Metric definitions evaluated, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "dwh_query_duration_seconds",
        "Round trip time of queries against the time-series database",
        &["database"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]
    ).unwrap();
}

pub fn init_metrics() {
    lazy_static::initialize(&REQUEST_COUNTER);
    lazy_static::initialize(&REQUEST_DURATION);
    lazy_static::initialize(&METRIC_QUERIES);
    lazy_static::initialize(&QUERY_DURATION);
}

/// Times an export request from creation until drop.
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    pub fn new() -> Self {
        REQUEST_COUNTER.inc();
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        REQUEST_DURATION.observe(self.start.elapsed().as_secs_f64());
    }
}

pub fn record_metric_success() {
    METRIC_QUERIES.with_label_values(&["ok"]).inc();
}

pub fn record_metric_failure() {
    METRIC_QUERIES.with_label_values(&["error"]).inc();
}

pub fn observe_query(database: &str, seconds: f64) {
    QUERY_DURATION.with_label_values(&[database]).observe(seconds);
}

/// Renders the default registry in the Prometheus text format.
pub fn render() -> String {
    init_metrics();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

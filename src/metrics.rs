use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, IntCounterVec, TextEncoder, register_counter,
    register_gauge, register_histogram, register_int_counter_vec,
};

// Process-wide, shared by every client in the process
lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stats_client_requests_total",
        "Requests by outcome (cached, network, rate_limited, failed)",
        &["outcome"]
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("stats_client_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("stats_client_cache_misses_total", "Total cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("stats_client_cache_size", "Current number of items in cache").unwrap();
    pub static ref RETRIES_TOTAL: Counter =
        register_counter!("stats_client_retries_total", "Total retried attempts").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "stats_client_request_latency_seconds",
        "Latency of network requests including retries, in seconds"
    )
    .unwrap();
}

// Text exposition of everything registered in the default registry
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

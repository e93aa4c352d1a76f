use actix_web::HttpResponse;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

// Defines Prometheus metrics for the request-scoped loaders, labelled by loader name
lazy_static::lazy_static! {
    // Batches sent to the store
    pub static ref LOADER_DISPATCHES: IntCounterVec = register_int_counter_vec!(
        "todoql_loader_dispatches_total",
        "Batches dispatched to the store",
        &["loader"]
    ).unwrap();

    // Distinct keys per dispatched batch
    pub static ref LOADER_BATCH_SIZE: HistogramVec = register_histogram_vec!(
        "todoql_loader_batch_size",
        "Distinct keys per dispatched batch",
        &["loader"],
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 500.0]
    ).unwrap();

    // Loads answered without touching the store
    pub static ref LOADER_CACHE_HITS: IntCounterVec = register_int_counter_vec!(
        "todoql_loader_cache_hits_total",
        "Loads answered from the request cache",
        &["loader"]
    ).unwrap();

    // Keys resolved to an error
    pub static ref LOADER_FAILURES: IntCounterVec = register_int_counter_vec!(
        "todoql_loader_failures_total",
        "Keys whose load resolved to an error",
        &["loader"]
    ).unwrap();
}

// Handles GET /metrics requests to expose Prometheus metrics
pub async fn metrics() -> HttpResponse {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let encoded = encoder.encode_to_string(&metric_families).unwrap_or_default();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(encoded)
}

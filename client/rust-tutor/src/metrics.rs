use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

use crate::services::backend::BackendError;

lazy_static! {
    // Backend HTTP calls
    pub static ref BACKEND_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "backend_requests_total",
        "Total number of requests sent to the tutoring backend",
        &["endpoint", "status"]
    )
    .unwrap();

    pub static ref BACKEND_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "backend_request_duration_seconds",
        "Tutoring backend request duration in seconds",
        &["endpoint"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_total",
        "Request cycles started by the user",
        &["kind", "outcome"]
    )
    .unwrap();

    pub static ref REVEALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reveals_total",
        "Progressive reveal steps disclosed",
        &["kind"]
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format.
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Helper: track backend call with metrics
pub async fn track_backend_call<F, T>(endpoint: &str, future: F) -> Result<T, BackendError>
where
    F: std::future::Future<Output = Result<T, BackendError>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = match &result {
        Ok(_) => "success".to_string(),
        Err(BackendError::Api { status, .. }) => status.to_string(),
        Err(_) => "error".to_string(),
    };

    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status.as_str()])
        .inc();

    BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration);

    result
}

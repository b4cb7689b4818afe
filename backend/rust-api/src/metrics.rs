use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Total number of quiz sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_sessions_active",
        "Number of currently incomplete quiz sessions"
    )
    .unwrap();

    pub static ref SUBMISSIONS_SCORED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_submissions_scored_total",
        "Total number of scored answer submissions",
        &["correct"]
    )
    .unwrap();

    pub static ref STORE_TXN_RETRIES_TOTAL: IntCounter = register_int_counter!(
        "quiz_store_txn_retries_total",
        "Transactions retried after a transient storage conflict"
    )
    .unwrap();
}

pub fn record_scored_submission(is_correct: bool) {
    let label = if is_correct { "true" } else { "false" };
    SUBMISSIONS_SCORED_TOTAL.with_label_values(&[label]).inc();
}

pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

//! Metrics and observability utilities
//!
//! Prometheus-style metric descriptions and recording helpers,
//! all behind the `metrics` facade.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all Assignment Helper metrics
pub const METRICS_PREFIX: &str = "acadhelper";

/// Buckets for embedding latency (in seconds)
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API calls"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding API latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed embedding API calls"
    );

    describe_counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Completed plagiarism analyses"
    );

    describe_histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end analysis latency in seconds"
    );

    describe_histogram!(
        format!("{}_plagiarism_score", METRICS_PREFIX),
        Unit::Count,
        "Distribution of document plagiarism scores"
    );

    describe_counter!(
        format!("{}_chunks_scored_total", METRICS_PREFIX),
        Unit::Count,
        "Chunks embedded and matched"
    );

    describe_counter!(
        format!("{}_chunks_flagged_total", METRICS_PREFIX),
        Unit::Count,
        "Chunks whose best match met the threshold"
    );

    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Assignments uploaded"
    );

    describe_counter!(
        format!("{}_workflow_notifications_total", METRICS_PREFIX),
        Unit::Count,
        "Extraction workflow webhook calls"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a finished scoring run
pub fn record_scoring(chunks: usize, flagged: usize) {
    counter!(format!("{}_chunks_scored_total", METRICS_PREFIX)).increment(chunks as u64);
    counter!(format!("{}_chunks_flagged_total", METRICS_PREFIX)).increment(flagged as u64);
}

/// Helper to record a persisted analysis
pub fn record_analysis(duration_secs: f64, plagiarism_score: f64) {
    counter!(format!("{}_analyses_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_analysis_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    histogram!(format!("{}_plagiarism_score", METRICS_PREFIX)).record(plagiarism_score);
}

/// Helper to record an upload and whether the workflow was reached
pub fn record_upload(notified: bool) {
    counter!(format!("{}_uploads_total", METRICS_PREFIX)).increment(1);
    counter!(
        format!("{}_workflow_notifications_total", METRICS_PREFIX),
        "status" => if notified { "success" } else { "error" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in EMBEDDING_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        // No global recorder installed: calls are no-ops and must not panic
        record_embedding(0.1, "mock-embedding", true);
        record_embedding(0.1, "mock-embedding", false);
        record_scoring(3, 1);
        record_analysis(0.5, 0.42);
        record_upload(false);
    }
}

//! Metrics and observability utilities
//!
//! Prometheus metrics with SLO-aligned histograms and a common prefix.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Plenário metrics
pub const METRICS_PREFIX: &str = "plenario";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Buckets for scheduled report runs
pub const REPORT_BUCKETS: &[f64] = &[0.050, 0.250, 1.000, 5.000, 15.00, 60.00];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_votes_cast_total", METRICS_PREFIX),
        Unit::Count,
        "Roll-call votes recorded"
    );

    describe_counter!(
        format!("{}_votings_closed_total", METRICS_PREFIX),
        Unit::Count,
        "Votings closed, by result"
    );

    describe_counter!(
        format!("{}_sessions_numbered_total", METRICS_PREFIX),
        Unit::Count,
        "Session numbers allocated"
    );

    describe_counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        Unit::Count,
        "Login attempts, by outcome"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    describe_counter!(
        format!("{}_report_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Scheduled report runs, by kind and status"
    );

    describe_histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Scheduled report generation latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_vote(opcao: &str) {
    counter!(
        format!("{}_votes_cast_total", METRICS_PREFIX),
        "opcao" => opcao.to_string()
    )
    .increment(1);
}

pub fn record_voting_closed(resultado: &str) {
    counter!(
        format!("{}_votings_closed_total", METRICS_PREFIX),
        "resultado" => resultado.to_string()
    )
    .increment(1);
}

pub fn record_session_numbered(tipo: &str) {
    counter!(
        format!("{}_sessions_numbered_total", METRICS_PREFIX),
        "tipo" => tipo.to_string()
    )
    .increment(1);
}

pub fn record_login(outcome: &str) {
    counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    let name = if hit {
        format!("{}_cache_hits_total", METRICS_PREFIX)
    } else {
        format!("{}_cache_misses_total", METRICS_PREFIX)
    };
    counter!(name, "cache" => cache_name.to_string()).increment(1);
}

/// Helper to record a scheduled report run
pub fn record_report_run(duration_secs: f64, tipo: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_report_runs_total", METRICS_PREFIX),
        "tipo" => tipo.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        "tipo" => tipo.to_string()
    )
    .record(duration_secs);
}

//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Search (aggregated requests, per-provider outcome and latency)
//! - Playback (requests, metadata wait, active sessions)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Aggregated search requests by result.
pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("swarmstream_search_requests_total", "Total aggregated searches"),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Provider calls by provider and outcome.
pub static PROVIDER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "swarmstream_provider_requests_total",
            "Total search provider calls",
        ),
        &["provider", "result"], // result: "ok", "unavailable", "timed_out"
    )
    .unwrap()
});

/// Provider call duration in seconds.
pub static PROVIDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "swarmstream_provider_duration_seconds",
            "Duration of search provider calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["provider"],
    )
    .unwrap()
});

/// Search results returned per aggregated query.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "swarmstream_search_results",
            "Number of search results returned per query",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Playback Metrics
// =============================================================================

/// Playback requests by result.
pub static PLAYBACK_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "swarmstream_playback_requests_total",
            "Total playback requests",
        ),
        &["result"], // "started", "reused", "rejected", "timed_out", "failed"
    )
    .unwrap()
});

/// Time spent waiting for swarm metadata.
pub static METADATA_WAIT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "swarmstream_metadata_wait_seconds",
            "Time spent waiting for swarm metadata",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
    )
    .unwrap()
});

/// Sessions currently streaming.
pub static ACTIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "swarmstream_active_sessions",
        "Number of streaming playback sessions",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(SEARCH_REQUESTS.clone()),
        Box::new(PROVIDER_REQUESTS.clone()),
        Box::new(PROVIDER_DURATION.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        // Playback
        Box::new(PLAYBACK_REQUESTS.clone()),
        Box::new(METADATA_WAIT_DURATION.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
    ]
}

//! # Metrics
//!
//! Prometheus metrics for the sync engine and the Bitwarden client.
//!
//! ## Metrics Exposed
//!
//! - `bitwarden_secrets_reconciliations_total` - Total number of reconciliations
//! - `bitwarden_secrets_reconciliation_errors_total` - Reconciliations that failed or escaped to the error policy
//! - `bitwarden_secrets_reconciliation_duration_seconds` - Duration of reconciliation operations
//! - `bitwarden_secrets_syncs_skipped_total` - Reconciliations suppressed as echoes of a status write
//! - `bitwarden_secrets_secrets_synced_total` - Keys written to target Secrets
//! - `bitwarden_secrets_api_requests_total` - Bitwarden API requests by operation
//! - `bitwarden_secrets_api_request_errors_total` - Failed Bitwarden API requests by operation
//! - `bitwarden_secrets_api_request_duration_seconds` - Duration of Bitwarden API requests by operation

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bitwarden_secrets_reconciliations_total",
        "BitwardenSecret reconciliations started",
    )
    .expect("RECONCILIATIONS_TOTAL has valid metric options")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bitwarden_secrets_reconciliation_errors_total",
        "Reconciliations that recorded FailedSync or escaped to the error policy",
    )
    .expect("RECONCILIATION_ERRORS_TOTAL has valid metric options")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "bitwarden_secrets_reconciliation_duration_seconds",
            "Wall time of one BitwardenSecret reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 30.0]),
    )
    .expect("RECONCILIATION_DURATION has valid metric options")
});

static SYNCS_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bitwarden_secrets_syncs_skipped_total",
        "Total number of reconciliations suppressed inside the sync guard window",
    )
    .expect("SYNCS_SKIPPED_TOTAL has valid metric options")
});

static SECRETS_SYNCED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bitwarden_secrets_secrets_synced_total",
        "Total number of changed secret values written to target Secrets",
    )
    .expect("SECRETS_SYNCED_TOTAL has valid metric options")
});

static API_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bitwarden_secrets_api_requests_total",
            "Total number of Bitwarden API requests by operation",
        ),
        &["operation"],
    )
    .expect("API_REQUESTS_TOTAL has valid metric options")
});

static API_REQUEST_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bitwarden_secrets_api_request_errors_total",
            "Total number of failed Bitwarden API requests by operation",
        ),
        &["operation"],
    )
    .expect("API_REQUEST_ERRORS_TOTAL has valid metric options")
});

static API_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "bitwarden_secrets_api_request_duration_seconds",
            "Duration of Bitwarden API requests in seconds by operation",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("API_REQUEST_DURATION has valid metric options")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SYNCS_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_SYNCED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUEST_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUEST_DURATION.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_syncs_skipped() {
    SYNCS_SKIPPED_TOTAL.inc();
}

pub fn increment_secrets_synced(count: usize) {
    SECRETS_SYNCED_TOTAL.inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Record one Bitwarden API request (`login` or `sync`)
pub fn observe_bitwarden_request(operation: &str, duration: f64) {
    API_REQUESTS_TOTAL.with_label_values(&[operation]).inc();
    API_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_bitwarden_request_errors(operation: &str) {
    API_REQUEST_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

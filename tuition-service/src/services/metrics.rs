//! Metrics module for tuition-service.
//! Prometheus metrics for ledger operations and monthly reconciliation.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "tuition_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Reconciliation runs counter
pub static RECONCILIATION_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billing records created counter
pub static RECORDS_CREATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Duplicate-creation races absorbed inside the reconciler
pub static RACES_ABSORBED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    RECONCILIATION_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "tuition_reconciliation_runs_total",
                "Total reconciliation runs by target month"
            ),
            &["month"]
        )
        .expect("Failed to register RECONCILIATION_RUNS_TOTAL")
    });

    RECORDS_CREATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "tuition_billing_records_created_total",
                "Total billing records created by source"
            ),
            &["source"]
        )
        .expect("Failed to register RECORDS_CREATED_TOTAL")
    });

    RACES_ABSORBED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "tuition_reconciliation_races_absorbed_total",
                "Duplicate-record conflicts absorbed during reconciliation"
            ),
            &["month"]
        )
        .expect("Failed to register RACES_ABSORBED_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("tuition_errors_total", "Total errors by type for alerting"),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record a reconciliation run.
pub fn record_reconciliation_run(month: &str) {
    if let Some(counter) = RECONCILIATION_RUNS_TOTAL.get() {
        counter.with_label_values(&[month]).inc();
    }
}

/// Record a billing record creation.
pub fn record_record_created(source: &str) {
    if let Some(counter) = RECORDS_CREATED_TOTAL.get() {
        counter.with_label_values(&[source]).inc();
    }
}

/// Record an absorbed duplicate-creation race.
pub fn record_race_absorbed(month: &str) {
    if let Some(counter) = RACES_ABSORBED_TOTAL.get() {
        counter.with_label_values(&[month]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}

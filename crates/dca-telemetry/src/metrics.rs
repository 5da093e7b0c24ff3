//! Prometheus metrics for the DCA bot.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A failure means a
//! duplicate metric name, a fatal setup error that should crash on first
//! use rather than fail silently.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, register_int_gauge, Counter,
    CounterVec, Encoder, HistogramVec, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Cycles by outcome (created, no_funds, no_volume, ...).
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dca_cycles_total",
        "Total trigger cycles by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Cycle duration in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dca_cycle_duration_ms",
        "Trigger cycle duration in milliseconds",
        &["outcome"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

pub static ENTRIES_BUILT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dca_entries_built_total",
        "Entry orders built",
        &["side"]
    )
    .unwrap()
});

pub static ENTRIES_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dca_entries_submitted_total",
        "Entry orders accepted by the order gateway",
        &["side"]
    )
    .unwrap()
});

/// Submission failures. Labels: reason (missing_funds/missing_minimal_volume/creation_error)
pub static SUBMIT_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dca_submit_failures_total",
        "Order creation requests rejected by the gateway",
        &["reason"]
    )
    .unwrap()
});

pub static SECONDARY_SKIPPED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "dca_secondary_tiers_skipped_total",
        "Secondary entry tiers skipped for lack of funds"
    )
    .unwrap()
});

pub static EXIT_LEGS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dca_exit_legs_total",
        "Exit legs built",
        &["role"]
    )
    .unwrap()
});

pub static STALE_CANCELLED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "dca_stale_orders_cancelled_total",
        "Open orders from previous cycles cancelled after new entries"
    )
    .unwrap()
});

pub static NOTIFICATION_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "dca_notification_failures_total",
        "Alert notifications that failed to send"
    )
    .unwrap()
});

/// Scheduler state (1 = running).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dca_scheduler_running", "Trigger scheduler running (1=running)")
        .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn cycle_completed(outcome: &str, duration_ms: f64) {
        CYCLES_TOTAL.with_label_values(&[outcome]).inc();
        CYCLE_DURATION_MS
            .with_label_values(&[outcome])
            .observe(duration_ms);
    }

    pub fn entry_built(side: &str) {
        ENTRIES_BUILT_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn entry_submitted(side: &str) {
        ENTRIES_SUBMITTED_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn submit_failed(reason: &str) {
        SUBMIT_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn secondary_skipped(count: usize) {
        SECONDARY_SKIPPED_TOTAL.inc_by(count as f64);
    }

    pub fn exit_leg_built(role: &str) {
        EXIT_LEGS_TOTAL.with_label_values(&[role]).inc();
    }

    pub fn stale_cancelled() {
        STALE_CANCELLED_TOTAL.inc();
    }

    pub fn notification_failed() {
        NOTIFICATION_FAILURES_TOTAL.inc();
    }

    pub fn scheduler_running(running: bool) {
        SCHEDULER_RUNNING.set(i64::from(running));
    }

    /// All registered metrics in the Prometheus text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

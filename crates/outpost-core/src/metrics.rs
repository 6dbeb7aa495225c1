//! Process-wide delivery-pipeline counters, registered once against
//! prometheus's default registry and incremented from the worker, the
//! retry scheduler, and the attempt log writer.

use crate::error::ErrorCategory;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use std::sync::OnceLock;

#[derive(Debug)]
pub struct PipelineMetrics {
    pub retry_attempts_total: IntCounter,
    pub queue_send_errors_total: IntCounter,
    pub log_writer_permanent_failures_total: IntCounter,
    pub errors_by_category: IntCounterVec,
}

impl PipelineMetrics {
    fn new() -> Self {
        Self {
            retry_attempts_total: register_int_counter!(
                "outpost_retry_attempts_total",
                "Delivery events handed to the retry scheduler after a failed attempt"
            )
            .expect("metric registration is infallible at process startup"),
            queue_send_errors_total: register_int_counter!(
                "outpost_queue_send_errors_total",
                "Failed queue send operations"
            )
            .expect("metric registration is infallible at process startup"),
            log_writer_permanent_failures_total: register_int_counter!(
                "outpost_log_writer_permanent_failures_total",
                "Attempt log batches abandoned after exhausting their retry budget"
            )
            .expect("metric registration is infallible at process startup"),
            errors_by_category: register_int_counter_vec!(
                "outpost_errors_by_category_total",
                "OutpostError occurrences grouped by category",
                &["category"]
            )
            .expect("metric registration is infallible at process startup"),
        }
    }

    pub fn record_error(&self, category: ErrorCategory) {
        self.errors_by_category
            .with_label_values(&[category.as_str()])
            .inc();
    }
}

static METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// The process-wide metrics singleton. Registration happens once, on
/// first access; every call site shares the same counters.
pub fn metrics() -> &'static PipelineMetrics {
    METRICS.get_or_init(PipelineMetrics::new)
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

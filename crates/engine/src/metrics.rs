//! Metrics instrumentation for audit observability.

use std::time::Instant;

/// Record command processing latency.
pub fn record_command_latency(duration_ms: f64) {
    metrics::histogram!("command_processing_latency", duration_ms);
}

/// Increment the processed-commands counter.
pub fn increment_commands_processed() {
    metrics::counter!("commands_processed", 1);
}

/// Increment the extracted-events counter.
pub fn increment_events_extracted() {
    metrics::counter!("events_extracted", 1);
}

/// Increment the counter for payloads no schema recognized.
pub fn increment_unrecognized_payloads() {
    metrics::counter!("unrecognized_payloads", 1);
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        if self.metric_name == "command_processing_latency" {
            record_command_latency(duration_ms);
        }
    }
}

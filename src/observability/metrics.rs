//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency by method, route
//! - `work_jobs_inflight` (gauge): simulated work currently executing
//! - `work_failures_total` (counter): failed simulated work by operation
//! - `process_*` (gauges/counter): CPU, memory, file descriptors and threads
//!   of this process, sampled on every render
//!
//! # Design Decisions
//! - One recorder per registry instead of a process-global one, so tests
//!   get isolated registries
//! - The in-flight count is mirrored in a watch channel: shutdown can wait
//!   for it to reach zero instead of polling
//! - Histogram buckets tuned for typical web latencies

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use metrics_process::Collector;
use std::time::Duration;
use tokio::sync::watch;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const WORK_JOBS_INFLIGHT: &str = "work_jobs_inflight";
pub const WORK_FAILURES_TOTAL: &str = "work_failures_total";

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Request and work telemetry, rendered in Prometheus text format.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    process: Collector,
    inflight: watch::Sender<usize>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                DURATION_BUCKETS,
            )
            .expect("duration buckets are non-empty")
            .build_recorder();
        let handle = recorder.handle();
        let (inflight, _) = watch::channel(0);

        let registry = Self {
            recorder,
            handle,
            process: Collector::default(),
            inflight,
        };

        registry.with_recorder(|| {
            describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
            describe_histogram!(
                HTTP_REQUEST_DURATION_SECONDS,
                "HTTP request latency in seconds"
            );
            describe_gauge!(
                WORK_JOBS_INFLIGHT,
                "Number of simulated work jobs currently executing"
            );
            describe_counter!(WORK_FAILURES_TOTAL, "Total number of failed work jobs");
            gauge!(WORK_JOBS_INFLIGHT).set(0.0);
            registry.process.describe();
        });

        registry
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.recorder, f)
    }

    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        let labels = [
            ("method", method.to_string()),
            ("route", route.to_string()),
            ("status", status.to_string()),
        ];

        self.with_recorder(|| {
            counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);
            histogram!(HTTP_REQUEST_DURATION_SECONDS, &labels[..2]).record(duration.as_secs_f64());
        });
    }

    pub fn inc_work_inflight(&self) {
        self.inflight.send_modify(|count| *count += 1);
        self.with_recorder(|| gauge!(WORK_JOBS_INFLIGHT).increment(1.0));
    }

    /// Decrement the in-flight gauge. Saturates at zero.
    pub fn dec_work_inflight(&self) {
        let decremented = self.inflight.send_if_modified(|count| {
            if *count == 0 {
                return false;
            }
            *count -= 1;
            true
        });

        if decremented {
            self.with_recorder(|| gauge!(WORK_JOBS_INFLIGHT).decrement(1.0));
        } else {
            tracing::warn!("Unbalanced work in-flight decrement ignored");
        }
    }

    /// Count one unit of work as in flight until the guard is dropped.
    pub fn track_work(&self) -> InflightGuard<'_> {
        self.inc_work_inflight();
        InflightGuard { metrics: self }
    }

    pub fn inc_work_failures(&self, operation: &str) {
        let labels = [("operation", operation.to_string())];
        self.with_recorder(|| counter!(WORK_FAILURES_TOTAL, &labels).increment(1));
    }

    pub fn inflight_count(&self) -> usize {
        *self.inflight.borrow()
    }

    /// Resolve once no work is in flight.
    pub async fn wait_for_idle(&self) {
        let mut rx = self.inflight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Render the current state in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.with_recorder(|| self.process.collect());
        self.handle.render()
    }

    /// Drain histogram buffers; called periodically and once more at shutdown.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one unit of work counted in `work_jobs_inflight`.
///
/// Releasing happens in `Drop`, so the count is restored on completion,
/// cancellation, a dropped future, or a panic alike.
#[derive(Debug)]
pub struct InflightGuard<'a> {
    metrics: &'a MetricsRegistry,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.metrics.dec_work_inflight();
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("inflight", &self.inflight_count())
            .finish_non_exhaustive()
    }
}

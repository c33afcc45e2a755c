//! Cancellable simulated work with jitter.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::observability::MetricsRegistry;

/// Operation label used for `work_failures_total`.
pub const SIMULATE_WORK: &str = "simulate_work";

pub const DEFAULT_BASE_MS: u64 = 100;
pub const DEFAULT_JITTER_MS: u64 = 0;

/// Why simulated work stopped before its timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorkError {
    #[error("work cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Parameters for one simulated job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRequest {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for WorkRequest {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(DEFAULT_BASE_MS),
            jitter: Duration::from_millis(DEFAULT_JITTER_MS),
        }
    }
}

impl WorkRequest {
    /// Build from raw query values. Missing, non-numeric and negative
    /// values fall back to the defaults.
    pub fn from_params(ms: Option<&str>, jitter: Option<&str>) -> Self {
        Self {
            base: Duration::from_millis(parse_millis(ms, DEFAULT_BASE_MS)),
            jitter: Duration::from_millis(parse_millis(jitter, DEFAULT_JITTER_MS)),
        }
    }

    /// Base duration plus a uniform draw from `[0, jitter)`.
    pub fn total_duration(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }
}

fn parse_millis(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|ms| *ms >= 0)
        .map(|ms| ms as u64)
        .unwrap_or(default)
}

/// Result of a job that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkOutcome {
    pub requested: WorkRequest,
    /// Sleep length after jitter was applied.
    pub planned: Duration,
    pub elapsed: Duration,
}

/// Runs simulated work while keeping `work_jobs_inflight` accurate.
#[derive(Debug, Clone)]
pub struct WorkSimulator {
    metrics: Arc<MetricsRegistry>,
}

impl WorkSimulator {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }

    /// Sleep for the requested duration unless `cancel` fires or `deadline`
    /// passes first. Failures are counted in `work_failures_total`.
    pub async fn run(
        &self,
        request: WorkRequest,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<WorkOutcome, WorkError> {
        let planned = request.total_duration();
        let _inflight = self.metrics.track_work();
        let start = Instant::now();

        let result = tokio::select! {
            _ = time::sleep(planned) => Ok(()),
            _ = cancel.cancelled() => Err(WorkError::Cancelled),
            _ = time::sleep_until(deadline) => Err(WorkError::DeadlineExceeded),
        };

        let elapsed = start.elapsed();
        match result {
            Ok(()) => Ok(WorkOutcome {
                requested: request,
                planned,
                elapsed,
            }),
            Err(err) => {
                self.metrics.inc_work_failures(SIMULATE_WORK);
                tracing::warn!(
                    error = %err,
                    requested_duration = ?planned,
                    actual_duration = ?elapsed,
                    "Work simulation failed"
                );
                Err(err)
            }
        }
    }
}

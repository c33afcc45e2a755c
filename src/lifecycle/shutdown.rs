//! Shutdown coordination for the service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ShutdownConfig;
use crate::observability::MetricsRegistry;

/// Process lifecycle phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

/// How the drain period ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// All in-flight work finished before the deadline.
    Drained { waited: Duration },
    /// The deadline passed first; remaining work was cancelled.
    TimedOut { remaining: usize },
}

/// Failure of the server task itself during run or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("server I/O error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DrainOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, DrainOutcome::TimedOut { .. })
    }
}

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to the state channel. Once draining starts,
/// the listener stops accepting, and [`ShutdownCoordinator::drain`] waits for
/// `work_jobs_inflight` to reach zero, bounded by the drain timeout.
pub struct ShutdownCoordinator {
    state: watch::Sender<ShutdownState>,
    metrics: Arc<MetricsRegistry>,
    /// Root of every request's cancellation token.
    work_cancel: CancellationToken,
    drain_timeout: Duration,
    poll_interval: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        metrics: Arc<MetricsRegistry>,
        work_cancel: CancellationToken,
        config: &ShutdownConfig,
    ) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            state,
            metrics,
            work_cancel,
            drain_timeout: config.drain_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Move from `Running` to `Draining`.
    ///
    /// Returns `false` if shutdown had already started; repeated triggers are no-ops.
    pub fn begin_drain(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state != ShutdownState::Running {
                return false;
            }
            *state = ShutdownState::Draining;
            true
        })
    }

    /// Resolve once shutdown has started.
    pub async fn draining(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state != ShutdownState::Running).await;
    }

    /// Trigger draining when `signal` completes.
    pub async fn trigger_on<F>(self: Arc<Self>, signal: F)
    where
        F: Future<Output = ()>,
    {
        signal.await;
        if self.begin_drain() {
            tracing::info!("Shutdown signal received, draining");
        }
    }

    /// Wait for in-flight work to finish, up to the drain timeout.
    ///
    /// On timeout the remaining work is cancelled and the outcome reports how
    /// much was still running. Timing out is not an error: cleanup goes on.
    pub async fn drain(&self) -> DrainOutcome {
        let start = Instant::now();
        let deadline = start + self.drain_timeout;

        tracing::info!(
            inflight = self.metrics.inflight_count(),
            timeout = ?self.drain_timeout,
            "Draining in-flight work"
        );

        let mut ticker = time::interval_at(start + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let idle = self.metrics.wait_for_idle();
        tokio::pin!(idle);

        loop {
            tokio::select! {
                _ = &mut idle => {
                    let waited = start.elapsed();
                    tracing::info!(waited = ?waited, "In-flight work drained");
                    return DrainOutcome::Drained { waited };
                }
                _ = ticker.tick() => {
                    tracing::info!(
                        inflight = self.metrics.inflight_count(),
                        elapsed = ?start.elapsed(),
                        "Waiting for in-flight work"
                    );
                }
                _ = time::sleep_until(deadline) => {
                    let remaining = self.metrics.inflight_count();
                    tracing::warn!(
                        remaining,
                        timeout = ?self.drain_timeout,
                        "Drain deadline exceeded, cancelling remaining work"
                    );
                    self.work_cancel.cancel();
                    return DrainOutcome::TimedOut { remaining };
                }
            }
        }
    }

    /// Enter the terminal `Stopped` state.
    pub fn finish(&self) {
        self.state.send_replace(ShutdownState::Stopped);
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("state", &self.state())
            .field("drain_timeout", &self.drain_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(drain_secs: u64) -> (Arc<ShutdownCoordinator>, Arc<MetricsRegistry>, CancellationToken) {
        let metrics = Arc::new(MetricsRegistry::new());
        let cancel = CancellationToken::new();
        let config = ShutdownConfig {
            drain_timeout_secs: drain_secs,
            poll_interval_ms: 1000,
        };
        let coordinator = Arc::new(ShutdownCoordinator::new(metrics.clone(), cancel.clone(), &config));
        (coordinator, metrics, cancel)
    }

    #[test]
    fn transitions_are_one_directional() {
        let (coordinator, _, _) = coordinator(30);
        assert_eq!(coordinator.state(), ShutdownState::Running);

        assert!(coordinator.begin_drain());
        assert_eq!(coordinator.state(), ShutdownState::Draining);
        assert!(!coordinator.begin_drain());

        coordinator.finish();
        assert_eq!(coordinator.state(), ShutdownState::Stopped);
        assert!(!coordinator.begin_drain());
        assert_eq!(coordinator.state(), ShutdownState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn drains_immediately_when_idle() {
        let (coordinator, _, cancel) = coordinator(30);
        coordinator.begin_drain();

        let outcome = coordinator.drain().await;
        assert_eq!(outcome, DrainOutcome::Drained { waited: Duration::ZERO });
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_work_to_finish() {
        let (coordinator, metrics, cancel) = coordinator(30);
        metrics.inc_work_inflight();
        metrics.inc_work_inflight();

        let finisher = {
            let metrics = metrics.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(1500)).await;
                metrics.dec_work_inflight();
                time::sleep(Duration::from_millis(1000)).await;
                metrics.dec_work_inflight();
            })
        };

        let outcome = coordinator.drain().await;
        finisher.await.unwrap();

        assert_eq!(
            outcome,
            DrainOutcome::Drained {
                waited: Duration::from_millis(2500)
            }
        );
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_remaining_work() {
        let (coordinator, metrics, cancel) = coordinator(2);
        let _stuck = metrics.track_work();

        let outcome = coordinator.drain().await;

        assert_eq!(outcome, DrainOutcome::TimedOut { remaining: 1 });
        assert!(outcome.timed_out());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn trigger_on_starts_draining() {
        let (coordinator, _, _) = coordinator(30);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(coordinator.clone().trigger_on(async move {
            let _ = rx.await;
        }));

        assert_eq!(coordinator.state(), ShutdownState::Running);
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), coordinator.draining())
            .await
            .expect("draining should start");
        assert_eq!(coordinator.state(), ShutdownState::Draining);
    }
}

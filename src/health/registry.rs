//! Named readiness checks with a forced-failure override.

use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Error returned by an individual readiness check.
pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

type CheckFn = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), CheckError>> + Send + Sync>;

/// Component name reported when readiness is forced to fail.
pub const FORCED_COMPONENT: &str = "forced";

/// Readiness failure naming the component that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("health check failed for {component}: {message}")]
pub struct HealthCheckError {
    pub component: String,
    pub message: String,
}

impl HealthCheckError {
    fn forced() -> Self {
        Self {
            component: FORCED_COMPONENT.to_string(),
            message: "readiness check forced to fail for testing".to_string(),
        }
    }
}

/// Registry of readiness checks.
///
/// Checks run in insertion order, so when several fail at once the earliest
/// registered one is reported. State is never cached: every call to
/// [`HealthRegistry::check_readiness`] evaluates the checks again.
pub struct HealthRegistry {
    checks: RwLock<Vec<(String, CheckFn)>>,
    force_failure: RwLock<bool>,
    timeout: Duration,
}

impl HealthRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            checks: RwLock::new(Vec::new()),
            force_failure: RwLock::new(false),
            timeout,
        }
    }

    /// Register a check. Re-using a name replaces the previous check in place.
    pub fn add_check<F, Fut>(&self, name: impl Into<String>, check: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CheckError>> + Send + 'static,
    {
        let name = name.into();
        let check: CheckFn = Arc::new(move |cancel| Box::pin(check(cancel)));

        let mut checks = self.checks.write().expect("health checks lock poisoned");
        match checks.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = check,
            None => checks.push((name, check)),
        }
    }

    pub fn remove_check(&self, name: &str) {
        self.checks
            .write()
            .expect("health checks lock poisoned")
            .retain(|(existing, _)| existing != name);
    }

    pub fn check_names(&self) -> Vec<String> {
        self.checks
            .read()
            .expect("health checks lock poisoned")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn set_force_failure(&self, fail: bool) {
        *self.force_failure.write().expect("force failure lock poisoned") = fail;
    }

    pub fn is_force_failure(&self) -> bool {
        *self.force_failure.read().expect("force failure lock poisoned")
    }

    /// Evaluate every registered check, stopping at the first failure.
    ///
    /// The whole batch shares one deadline; `cancel` aborts evaluation early.
    pub async fn check_readiness(&self, cancel: &CancellationToken) -> Result<(), HealthCheckError> {
        if self.is_force_failure() {
            return Err(HealthCheckError::forced());
        }

        let checks: Vec<(String, CheckFn)> = self
            .checks
            .read()
            .expect("health checks lock poisoned")
            .clone();

        let deadline = Instant::now() + self.timeout;
        let batch = cancel.child_token();

        for (name, check) in checks {
            let outcome = tokio::select! {
                result = check(batch.clone()) => result.map_err(|e| e.to_string()),
                _ = time::sleep_until(deadline) => Err("check timed out".to_string()),
                _ = cancel.cancelled() => Err("readiness check cancelled".to_string()),
            };

            if let Err(message) = outcome {
                batch.cancel();
                tracing::debug!(component = %name, message = %message, "Readiness check failed");
                return Err(HealthCheckError {
                    component: name,
                    message,
                });
            }
        }

        Ok(())
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

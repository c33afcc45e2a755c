//! Runtime-configurable error injection.

use arc_swap::ArcSwap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Capability consulted by the fault-injection middleware on every request.
pub trait FaultInjector: Send + Sync {
    /// Decide whether this request should fail.
    ///
    /// Returns `(true, status)` when an error must be injected, `(false, 0)` otherwise.
    fn should_inject(&self) -> (bool, u16);
}

/// Snapshot of the error injection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToggleConfig {
    pub enabled: bool,
    /// Probability in `[0.0, 1.0]` that a request fails.
    pub rate: f64,
    /// Status returned for injected failures, `500..=599`.
    pub status_code: u16,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 0.0,
            status_code: 500,
        }
    }
}

/// Error injection toggle shared by every request.
///
/// The three fields are replaced together as one snapshot, so readers never
/// see a half-applied update and never take a lock. Values are stored as
/// given: range checks belong to the caller.
#[derive(Debug, Default)]
pub struct ErrorToggle {
    config: ArcSwap<ToggleConfig>,
}

impl ErrorToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_config(&self, enabled: bool, rate: f64, status_code: u16) {
        self.config.store(Arc::new(ToggleConfig {
            enabled,
            rate,
            status_code,
        }));
    }

    pub fn get_config(&self) -> (bool, f64, u16) {
        let config = self.config.load();
        (config.enabled, config.rate, config.status_code)
    }

    pub fn snapshot(&self) -> ToggleConfig {
        **self.config.load()
    }
}

impl FaultInjector for ErrorToggle {
    fn should_inject(&self) -> (bool, u16) {
        let config = self.config.load();
        if !config.enabled {
            return (false, 0);
        }

        let sample: f64 = rand::thread_rng().gen();
        if sample < config.rate {
            (true, config.status_code)
        } else {
            (false, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_injections(toggle: &ErrorToggle, trials: usize) -> usize {
        (0..trials).filter(|_| toggle.should_inject().0).count()
    }

    #[test]
    fn starts_disabled() {
        let toggle = ErrorToggle::new();
        assert_eq!(toggle.get_config(), (false, 0.0, 500));
        assert_eq!(toggle.should_inject(), (false, 0));
    }

    #[test]
    fn set_config_overwrites_all_fields() {
        let toggle = ErrorToggle::new();
        toggle.set_config(true, 0.25, 503);
        assert_eq!(toggle.get_config(), (true, 0.25, 503));
        assert_eq!(
            toggle.snapshot(),
            ToggleConfig {
                enabled: true,
                rate: 0.25,
                status_code: 503
            }
        );
    }

    #[test]
    fn store_accepts_unvalidated_values() {
        let toggle = ErrorToggle::new();
        toggle.set_config(true, 7.5, 200);
        assert_eq!(toggle.get_config(), (true, 7.5, 200));
    }

    #[test]
    fn zero_rate_never_injects() {
        let toggle = ErrorToggle::new();
        toggle.set_config(true, 0.0, 500);
        assert_eq!(count_injections(&toggle, 100), 0);
    }

    #[test]
    fn full_rate_always_injects_configured_status() {
        let toggle = ErrorToggle::new();
        toggle.set_config(true, 1.0, 503);
        for _ in 0..100 {
            assert_eq!(toggle.should_inject(), (true, 503));
        }
    }

    #[test]
    fn half_rate_lands_in_band() {
        let toggle = ErrorToggle::new();
        toggle.set_config(true, 0.5, 500);
        let injected = count_injections(&toggle, 1000);
        assert!(
            (300..=700).contains(&injected),
            "expected 30%-70% injections, got {}",
            injected
        );
    }

    #[test]
    fn disabled_ignores_rate() {
        let toggle = ErrorToggle::new();
        toggle.set_config(false, 1.0, 503);
        for _ in 0..100 {
            assert_eq!(toggle.should_inject(), (false, 0));
        }
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let toggle = Arc::new(ErrorToggle::new());
        let writer = {
            let toggle = toggle.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    if i % 2 == 0 {
                        toggle.set_config(true, 1.0, 503);
                    } else {
                        toggle.set_config(false, 0.0, 500);
                    }
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let toggle = toggle.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let (enabled, rate, code) = toggle.get_config();
                        let consistent = (enabled, rate, code) == (true, 1.0, 503)
                            || (enabled, rate, code) == (false, 0.0, 500);
                        assert!(consistent, "torn read: {:?}", (enabled, rate, code));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}

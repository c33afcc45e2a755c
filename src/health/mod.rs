//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Liveness (GET /healthz):
//!     → always healthy, no dependencies consulted
//!
//! Readiness (GET /readyz):
//!     → registry.rs: force-failure flag set? fail as "forced"
//!     → snapshot registered checks
//!     → run in insertion order under one batch deadline
//!     → first failure is reported by component name
//! ```
//!
//! # Design Decisions
//! - No cached health state: every probe evaluates the checks again
//! - Liveness and readiness are deliberately separate
//! - The force-failure flag lets the readiness path be exercised without
//!   wiring real dependencies

pub mod registry;

pub use registry::{CheckError, HealthCheckError, HealthRegistry, FORCED_COMPONENT};

//! Simulated work used to generate realistic latency distributions.
//!
//! # Data Flow
//! ```text
//! GET /api/v1/work?ms=&jitter=
//!     → WorkRequest::from_params (invalid input → defaults)
//!     → WorkSimulator::run
//!         → InflightGuard (work_jobs_inflight +1)
//!         → race: timer | request cancellation | request deadline
//!         → guard dropped (work_jobs_inflight -1) on every path
//! ```

pub mod simulator;

pub use simulator::{WorkError, WorkOutcome, WorkRequest, WorkSimulator, SIMULATE_WORK};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build service objects → Bind listener → Accept
//!
//! Shutdown (shutdown.rs):
//!     Running
//!       → signal received: stop accepting (Draining)
//!       → wait for work_jobs_inflight == 0, bounded by the drain timeout
//!       → on timeout: cancel remaining work, warn, continue
//!       → flush metrics, release resources (Stopped)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced close after deadline
//! - A drain timeout is reported, not fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{DrainOutcome, ShutdownCoordinator, ShutdownError, ShutdownState};
pub use signals::shutdown_signal;
pub use startup::{bind, Started, StartupError};

//! Middleware stages wrapped around every handler.
//!
//! # Data Flow
//! ```text
//! request-id (tower-http) + context (request.rs)
//!     → logging.rs        start line, completion line on body drop
//!     → recovery.rs       panic → 500
//!     → metrics.rs        count + latency by route pattern
//!     → fault_injection.rs   /api/v1 ping and work only
//!     → auth.rs           /api/v1/toggles only
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Stages are plain `from_fn` middleware, composed in the router
//! - Only the request-id stage touches a response produced downstream

pub mod auth;
pub mod fault_injection;
pub mod logging;
pub mod metrics;
pub mod recovery;

pub use auth::{require_bearer, AdminToken};
pub use fault_injection::{inject_faults, INJECTED_ERROR_BODY};
pub use logging::{log_requests, CountingBody};
pub use metrics::track_metrics;
pub use recovery::{install_panic_hook, recover_panics};

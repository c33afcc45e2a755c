//! Runtime toggles for fault injection.
//!
//! # Data Flow
//! ```text
//! POST /api/v1/toggles/error-rate
//!     → handler validates rate / status code
//!     → ErrorToggle::set_config (atomic snapshot swap)
//!
//! Every /api/v1/ping and /api/v1/work request:
//!     → fault injection middleware
//!     → FaultInjector::should_inject (lock-free read + random draw)
//! ```

pub mod error_rate;

pub use error_rate::{ErrorToggle, FaultInjector, ToggleConfig};

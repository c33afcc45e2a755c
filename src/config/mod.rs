//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (APP_PORT, ADMIN_TOKEN, LOG_LEVEL, ...)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; runtime knobs (fault injection,
//!   forced readiness failure) live in their own stores instead
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load, ConfigError};
pub use schema::AppConfig;
pub use schema::{
    AdminConfig, HealthConfig, ListenerConfig, LogFormat, ObservabilityConfig, ShutdownConfig,
    TimeoutConfig,
};

//! Monitoring demo service library.
//!
//! An HTTP service that exists to be observed: liveness and readiness
//! probes, Prometheus request metrics, simulated work with controllable
//! latency, and runtime toggles that inject failures on demand.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod toggles;
pub mod work;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::ShutdownCoordinator;

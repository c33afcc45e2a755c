//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline and handlers produce:
//!     → logging.rs (structured log events, request id on every line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log sink (stdout, JSON in production)
//!     → GET /metrics (Prometheus scrape)
//!     → Shutdown coordinator (in-flight work gauge)
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::{InflightGuard, MetricsRegistry};

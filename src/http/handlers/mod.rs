//! Request handlers.
//!
//! Handlers only translate between HTTP and the service objects held in
//! [`AppState`](crate::http::server::AppState); failures leave through
//! [`ApiError`](crate::http::response::ApiError).

pub mod api;
pub mod health;
pub mod metrics;
pub mod toggles;

use chrono::{SecondsFormat, Utc};

/// Current time as RFC 3339 UTC with second precision.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware pipeline, shutdown sequence)
//!     → request.rs (request ID, cancellation token, deadline)
//!     → middleware/ (logging, recovery, metrics, fault injection, auth)
//!     → handlers/ (health, api, toggles, metrics)
//!     → response.rs (error → status + plain-text body)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, RequestContextExt, RequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};

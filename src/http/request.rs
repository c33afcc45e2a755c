//! Request identity and per-request context.
//!
//! # Responsibilities
//! - Carry the request ID assigned by the request-id layer
//! - Attach a cancellation token (child of the server root) and a deadline
//! - Expose both to middleware and handlers through request extensions
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The context is a typed extension, not a string-keyed map
//! - The request token is cancelled when the request finishes, so work
//!   spawned from it never outlives its request

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::http::server::AppState;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

pub(crate) fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Unique identifier of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh UUID v4 identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request values visible to every later stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: RequestId,
    /// Cancelled when the request finishes or the server force-closes.
    pub cancellation: CancellationToken,
    /// Point past which work on behalf of this request is abandoned.
    pub deadline: Instant,
}

/// Access to the [`RequestContext`] stored in request extensions.
pub trait RequestContextExt {
    fn request_context(&self) -> Option<&RequestContext>;

    /// Request ID for logging, `"unknown"` before the context is attached.
    fn request_id(&self) -> &str {
        self.request_context()
            .map(|ctx| ctx.id.as_str())
            .unwrap_or("unknown")
    }
}

impl<B> RequestContextExt for axum::http::Request<B> {
    fn request_context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }
}

/// Build the [`RequestContext`] for an incoming request.
///
/// Runs directly inside the request-id layers, which have already put the
/// ID into the `x-request-id` header. A header that is not valid UTF-8 is
/// overwritten with a fresh ID.
pub async fn attach_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| RequestId::from(value.to_owned()));

    // An unusable caller ID is replaced on both the request and the
    // response, so logs and the echoed header carry the same value.
    let (id, replacement) = match presented {
        Some(id) => (id, None),
        None => {
            let id = RequestId::generate();
            let value = HeaderValue::from_str(id.as_str()).ok();
            (id, value)
        }
    };
    if let Some(value) = &replacement {
        request.headers_mut().insert(request_id_header(), value.clone());
    }

    let cancellation = state.root_cancel.child_token();
    let deadline = deadline_after(state.config.timeouts.request());

    request.extensions_mut().insert(RequestContext {
        id,
        cancellation: cancellation.clone(),
        deadline,
    });

    let _cancel_on_finish = cancellation.drop_guard();
    let mut response = next.run(request).await;
    if let Some(value) = replacement {
        response.headers_mut().insert(request_id_header(), value);
    }
    response
}

/// `now + timeout`, saturating at a point decades away instead of overflowing.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

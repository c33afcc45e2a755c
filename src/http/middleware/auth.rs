use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::http::request::RequestContextExt;
use crate::http::response::ApiError;

/// Token accepted by [`require_bearer`].
#[derive(Debug, Clone)]
pub struct AdminToken(Arc<str>);

impl AdminToken {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }
}

/// Reject requests without `Authorization: Bearer <admin token>`.
pub async fn require_bearer(
    State(token): State<AdminToken>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(&*token.0) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        request_id = %request.request_id(),
        path = %request.uri().path(),
        "Rejected unauthenticated admin request"
    );
    Err(ApiError::Unauthorized)
}

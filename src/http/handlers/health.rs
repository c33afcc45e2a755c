//! Liveness and readiness probes.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Extension,
};

use crate::http::request::RequestContext;
use crate::http::response::{ApiError, TEXT_PLAIN};
use crate::http::server::AppState;

/// `GET /healthz`: the process is up. Never consults dependencies.
pub async fn liveness() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], "OK")
}

/// `GET /readyz`: every registered check passes.
pub async fn readiness(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(err) = state.health.check_readiness(&ctx.cancellation).await {
        tracing::warn!(
            request_id = %ctx.id,
            component = %err.component,
            error = %err.message,
            "Readiness check failed"
        );
        return Err(ApiError::NotReady(err));
    }
    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], "Ready"))
}

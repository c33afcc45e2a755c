use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::work::WorkRequest;

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
    pub timestamp: String,
}

/// `GET /api/v1/ping`
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
        timestamp: timestamp(),
    })
}

/// Raw query values; parsed leniently by [`WorkRequest::from_params`].
#[derive(Debug, Default)]
pub struct WorkParams {
    pub ms: Option<String>,
    pub jitter: Option<String>,
}

impl WorkParams {
    /// Pick the first `ms` and `jitter` values; repeats and unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "ms" => &mut params.ms,
                "jitter" => &mut params.jitter,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkResponse {
    pub message: String,
    pub requested_ms: u64,
    pub jitter_ms: u64,
    pub actual_duration_ms: u64,
    pub timestamp: String,
}

/// `GET /api/v1/work?ms=&jitter=`
pub async fn work(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<WorkResponse>, ApiError> {
    let params = WorkParams::from_pairs(pairs);
    let request = WorkRequest::from_params(params.ms.as_deref(), params.jitter.as_deref());

    let outcome = state
        .work
        .run(request, &ctx.cancellation, ctx.deadline)
        .await
        .map_err(ApiError::WorkCancelled)?;

    tracing::debug!(
        request_id = %ctx.id,
        planned = ?outcome.planned,
        elapsed = ?outcome.elapsed,
        "Work completed"
    );

    Ok(Json(WorkResponse {
        message: "work completed".to_string(),
        requested_ms: outcome.requested.base.as_millis() as u64,
        jitter_ms: outcome.requested.jitter.as_millis() as u64,
        actual_duration_ms: outcome.elapsed.as_millis() as u64,
        timestamp: timestamp(),
    }))
}

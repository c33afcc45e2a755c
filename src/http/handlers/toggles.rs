//! Admin toggles for error injection and readiness.
//!
//! Bodies are decoded from raw bytes regardless of `Content-Type`. Missing
//! fields take their zero value, so an absent `status_code` fails the range
//! check rather than silently picking a default.

use axum::{body::Bytes, extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorRateRequest {
    enabled: bool,
    rate: f64,
    status_code: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorRateResponse {
    pub enabled: bool,
    pub rate: f64,
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReadinessRequest {
    force_failure: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub force_failure: bool,
    pub message: String,
}

/// `POST /api/v1/toggles/error-rate`
pub async fn set_error_rate(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<ErrorRateResponse>, ApiError> {
    let request: ErrorRateRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::error!(
            request_id = %ctx.id,
            error = %err,
            "Failed to decode error rate toggle request"
        );
        ApiError::InvalidJson(err)
    })?;

    if !(0.0..=1.0).contains(&request.rate) {
        return Err(ApiError::RateOutOfRange(request.rate));
    }
    let status_code = match u16::try_from(request.status_code) {
        Ok(code @ 500..=599) => code,
        _ => return Err(ApiError::StatusOutOfRange(request.status_code)),
    };

    state
        .toggles
        .set_config(request.enabled, request.rate, status_code);

    tracing::info!(
        request_id = %ctx.id,
        enabled = request.enabled,
        rate = request.rate,
        status_code,
        "Error injection toggle updated"
    );

    Ok(Json(ErrorRateResponse {
        enabled: request.enabled,
        rate: request.rate,
        status_code,
        message: "Error injection toggle updated".to_string(),
    }))
}

/// `POST /api/v1/toggles/readiness`
pub async fn set_readiness(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let request: ReadinessRequest = serde_json::from_slice(&body).map_err(ApiError::InvalidJson)?;

    state.health.set_force_failure(request.force_failure);

    tracing::info!(
        request_id = %ctx.id,
        force_failure = request.force_failure,
        "Readiness check toggle updated"
    );

    Ok(Json(ReadinessResponse {
        force_failure: request.force_failure,
        message: "Readiness check toggle updated".to_string(),
    }))
}

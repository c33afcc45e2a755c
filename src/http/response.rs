//! Error responses returned at the handler boundary.
//!
//! Every failure a handler or middleware reports to a client goes through
//! [`ApiError`], which fixes the status code and plain-text body.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::health::HealthCheckError;
use crate::work::WorkError;

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Client-visible API failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Rate must be between 0.0 and 1.0")]
    RateOutOfRange(f64),

    #[error("Status code must be between 500 and 599")]
    StatusOutOfRange(i64),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Work simulation cancelled")]
    WorkCancelled(#[source] WorkError),

    #[error("Not Ready: {0}")]
    NotReady(#[source] HealthCheckError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_)
            | ApiError::RateOutOfRange(_)
            | ApiError::StatusOutOfRange(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::WorkCancelled(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, TEXT_PLAIN)],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(error: ApiError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let (status, body) = body_of(ApiError::RateOutOfRange(1.5)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Rate must be between 0.0 and 1.0");

        let (status, body) = body_of(ApiError::StatusOutOfRange(404)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Status code must be between 500 and 599");

        let json_err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let (status, body) = body_of(ApiError::InvalidJson(json_err)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid JSON");
    }

    #[tokio::test]
    async fn cancelled_work_is_request_timeout() {
        let (status, body) = body_of(ApiError::WorkCancelled(WorkError::DeadlineExceeded)).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body, "Work simulation cancelled");
    }

    #[tokio::test]
    async fn not_ready_includes_cause() {
        let error = HealthCheckError {
            component: "db".to_string(),
            message: "connection refused".to_string(),
        };
        let (status, body) = body_of(ApiError::NotReady(error)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Not Ready: health check failed for db: connection refused");
    }
}

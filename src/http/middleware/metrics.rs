//! Request count and latency instrumentation.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::MetricsRegistry;

/// Record `http_requests_total` and `http_request_duration_seconds`.
///
/// Routes are labelled by their pattern so path parameters do not explode
/// cardinality. Requests that matched no route fall back to the raw path.
pub async fn track_metrics(
    State(metrics): State<Arc<MetricsRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let route = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => request.uri().path().to_owned(),
    };
    let method = request.method().clone();

    let response = next.run(request).await;

    metrics.record_http_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        start.elapsed(),
    );
    response
}

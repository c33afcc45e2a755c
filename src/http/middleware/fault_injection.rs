//! Synthetic failure injection for the `/api/v1` API routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::http::request::RequestContextExt;
use crate::http::response::TEXT_PLAIN;
use crate::toggles::FaultInjector;

/// Body of every injected failure.
pub const INJECTED_ERROR_BODY: &str = "Injected error for testing";

/// Fail the request with the configured status when the injector fires,
/// without running anything below this stage.
pub async fn inject_faults(
    State(injector): State<Arc<dyn FaultInjector>>,
    request: Request,
    next: Next,
) -> Response {
    let (inject, code) = injector.should_inject();
    if !inject {
        return next.run(request).await;
    }

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::debug!(
        request_id = %request.request_id(),
        status = status.as_u16(),
        "Injecting error"
    );
    (
        status,
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        INJECTED_ERROR_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Always(u16);

    impl FaultInjector for Always {
        fn should_inject(&self) -> (bool, u16) {
            (true, self.0)
        }
    }

    struct Never;

    impl FaultInjector for Never {
        fn should_inject(&self) -> (bool, u16) {
            (false, 0)
        }
    }

    fn app(injector: Arc<dyn FaultInjector>, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "handled"
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(injector, inject_faults))
    }

    fn request() -> axum::http::Request<Body> {
        axum::http::Request::get("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn injects_configured_status_without_calling_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(Arc::new(Always(503)), hits.clone())
            .oneshot(request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], INJECTED_ERROR_BODY.as_bytes());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passes_through_when_not_firing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(Arc::new(Never), hits.clone())
            .oneshot(request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn works_with_error_toggle() {
        let toggle = Arc::new(crate::toggles::ErrorToggle::new());
        toggle.set_config(true, 1.0, 502);
        let hits = Arc::new(AtomicUsize::new(0));

        let response = app(toggle, hits.clone()).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}

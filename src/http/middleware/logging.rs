//! Structured request logging.
//!
//! The start line is emitted before the request is handed on. The completion
//! line is emitted by [`CountingBody`] when the response body is dropped,
//! i.e. after the last byte was written or the client went away.

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::http::request::RequestContextExt;

pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_owned();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        remote_addr = %remote_addr,
        user_agent = %user_agent,
        "Request started"
    );

    let response = next.run(request).await;
    let status = response.status();

    response.map(|body| {
        Body::new(CountingBody::new(
            body,
            Completion {
                request_id,
                method,
                path,
                status,
                start,
            },
        ))
    })
}

struct Completion {
    request_id: String,
    method: Method,
    path: String,
    status: StatusCode,
    start: Instant,
}

/// Response body wrapper that counts bytes and logs once it is dropped.
pub struct CountingBody {
    inner: Body,
    bytes: u64,
    completion: Option<Completion>,
}

impl CountingBody {
    fn new(inner: Body, completion: Completion) -> Self {
        Self {
            inner,
            bytes: 0,
            completion: Some(completion),
        }
    }

    /// Bytes of body data produced so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &polled {
            if let Some(data) = frame.data_ref() {
                this.bytes += data.len() as u64;
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        if let Some(done) = self.completion.take() {
            tracing::info!(
                request_id = %done.request_id,
                method = %done.method,
                path = %done.path,
                status = done.status.as_u16(),
                bytes = self.bytes,
                duration = ?done.start.elapsed(),
                "Request completed"
            );
        }
    }
}

//! Panic recovery.
//!
//! A panic anywhere below this stage is turned into a plain
//! `500 Internal Server Error` and logged with the request ID and a stack
//! trace. The process keeps serving.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::http::request::RequestContextExt;
use crate::http::response::TEXT_PLAIN;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install a panic hook that keeps the backtrace of the last panic on the
/// panicking thread, so [`recover_panics`] can log where it came from.
///
/// The previously installed hook still runs. Calling this more than once is harmless.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

fn take_backtrace() -> Option<String> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

pub async fn recover_panics(request: Request, next: Next) -> Response {
    let request_id = request.request_id().to_owned();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            // The hook ran on this thread while the future was being polled.
            let backtrace = take_backtrace().unwrap_or_else(|| Backtrace::force_capture().to_string());
            tracing::error!(
                request_id = %request_id,
                panic = %panic_message(payload.as_ref()),
                backtrace = %backtrace,
                "Panic recovered"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_PLAIN)],
                "Internal Server Error",
            )
                .into_response()
        }
    }
}

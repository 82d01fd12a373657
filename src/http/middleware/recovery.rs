//! Panic-recovery stage.
//!
//! A panic anywhere below this stage is caught at the await point, logged
//! with the request's method, path, panic payload and stack, and answered
//! with the fixed 500 body. The connection and the process keep serving.
//!
//! The stack is captured by a process-wide panic hook while the panicking
//! frames still exist, parked in a thread-local, and picked up by the stage
//! on the same poll that observes the unwind.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use crate::http::context::RequestContext;
use crate::http::middleware::PipelineState;
use crate::http::request::RequestId;
use crate::http::response;
use crate::observability::fields;

thread_local! {
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Chain a stack-capturing hook in front of the current panic hook.
///
/// Idempotent; the previous hook still runs for every panic.
pub fn install_panic_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let stack = Backtrace::force_capture().to_string();
            PANIC_STACK.with(|slot| *slot.borrow_mut() = Some(stack));
            previous(info);
        }));
    });
}

/// Stack of the last panic on this thread, or the current stack when the
/// hook is not installed.
fn take_panic_stack() -> String {
    PANIC_STACK
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| Backtrace::force_capture().to_string())
}

pub async fn recover_faults(
    State(state): State<PipelineState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let ctx = RequestContext::from_extensions(request.extensions()).cloned();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let stack = take_panic_stack();
            let (logger, request_id) = match ctx {
                Some(ctx) => (ctx.logger().clone(), ctx.request_id().clone()),
                None => (state.logger.clone(), RequestId::generate()),
            };
            logger
                .with_request(&method, &path)
                .with_fields([
                    (fields::PANIC, panic_message(payload.as_ref())),
                    (fields::STACK, stack),
                ])
                .error("Panic recovered");
            response::internal_error(&request_id)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

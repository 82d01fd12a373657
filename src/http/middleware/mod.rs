//! Request middleware pipeline.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → request_id.rs   (generate ID, create RequestContext, echo X-Request-ID)
//!     → access_log.rs   ("HTTP request started" ... "HTTP request completed")
//!     → recovery.rs     (handler panic → logged, fixed 500)
//!     → inject.rs       (request logger gains http_method / http_path)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Order is fixed: the ID exists before anything logs, and the access log
//!   wraps recovery so a recovered fault still produces a completion record
//! - Stages share one `PipelineState` holding the base logger

pub mod access_log;
pub mod inject;
pub mod recovery;
pub mod request_id;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tower::ServiceBuilder;

use crate::observability::Logger;

/// State shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub logger: Logger,
}

impl PipelineState {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

/// Wrap every route (and the fallback) of `router` in the four stages.
pub fn apply(router: Router, logger: Logger) -> Router {
    recovery::install_panic_hook();
    let state = PipelineState::new(logger);
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(state.clone(), request_id::assign_request_id))
            .layer(from_fn_with_state(state.clone(), access_log::log_requests))
            .layer(from_fn_with_state(state.clone(), recovery::recover_faults))
            .layer(from_fn_with_state(state, inject::inject_context)),
    )
}

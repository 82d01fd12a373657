//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, per-connection timeouts, graceful stop)
//!     → middleware/ (request ID, access log, panic recovery, context)
//!     → request body / response timeouts
//!     → handlers/ (health checks, example resource)
//!     → service → repository → Postgres
//! ```

pub mod context;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

use axum::http::StatusCode;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

use crate::observability::Logger;
use crate::service::Services;

pub use context::RequestContext;
pub use request::{RequestId, X_CORRELATION_ID, X_REQUEST_ID};
pub use server::{HttpServer, ServerError, ServerState, ServerTimeouts};

/// Assemble the full application: routes, request timeouts, then the pipeline.
pub fn app(services: Services, logger: Logger, timeouts: &ServerTimeouts) -> Router {
    layered(handlers::routes(services), logger, timeouts)
}

/// Bound `routes` by the body-read and response timeouts, then wrap them in
/// the middleware pipeline.
///
/// Timeouts sit inside the pipeline so a timed-out request is still logged
/// and still answered with its request ID. An expired response bound yields 408.
pub fn layered(routes: Router, logger: Logger, timeouts: &ServerTimeouts) -> Router {
    let routes = routes.layer(
        ServiceBuilder::new()
            .layer(RequestBodyTimeoutLayer::new(timeouts.read))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeouts.write,
            )),
    );
    middleware::apply(routes, logger)
}

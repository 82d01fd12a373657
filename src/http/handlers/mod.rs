//! Route table.
//!
//! ```text
//! GET /ping               → "pong"
//! GET /healthz            → liveness
//! GET /readyz             → readiness (database ping)
//! GET /api/v1/example/    → example resource
//! GET /api/v1/healthz     → liveness (versioned alias)
//! GET /api/v1/readyz      → readiness (versioned alias)
//! *                       → 404 JSON
//! ```

pub mod example;
pub mod health;

use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::http::context::RequestContext;
use crate::http::response;
use crate::service::Services;

/// Build the routes, without middleware.
pub fn routes(services: Services) -> Router {
    let health = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz));

    let v1 = Router::new()
        .route("/example/", get(example::example_endpoint))
        .route("/example", get(example::example_endpoint))
        .merge(health.clone());

    Router::new()
        .route("/ping", get(health::ping))
        .merge(health)
        .nest("/api/v1", v1)
        .fallback(not_found)
        .with_state(services)
}

async fn not_found(ctx: RequestContext) -> Response {
    response::error(StatusCode::NOT_FOUND, "not found", ctx.request_id())
}

//! Liveness and readiness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::http::context::RequestContext;
use crate::http::response;
use crate::service::Services;

pub async fn ping() -> &'static str {
    "pong"
}

/// The process is up and serving.
pub async fn healthz(ctx: RequestContext) -> Response {
    ctx.logger()
        .with_component("health")
        .with_operation("healthz")
        .debug("Health check requested");
    response::status(StatusCode::OK, "ok", ctx.request_id())
}

/// The database answers a ping.
pub async fn readyz(State(services): State<Services>, ctx: RequestContext) -> Response {
    let logger = ctx.logger().with_component("health").with_operation("readyz");
    logger.debug("Readiness check requested");

    if let Err(err) = services.health.ping().await {
        logger.with_error(&err).error("Readiness check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "error": err.to_string(),
                "request_id": ctx.request_id().as_str(),
            })),
        )
            .into_response();
    }

    logger.debug("Readiness check passed");
    response::status(StatusCode::OK, "ready", ctx.request_id())
}

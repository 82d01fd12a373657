//! Placeholder resource exercising the handler → service → repository chain.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::http::context::RequestContext;
use crate::http::response;
use crate::service::Services;

pub async fn example_endpoint(State(services): State<Services>, ctx: RequestContext) -> Response {
    let logger = ctx
        .logger()
        .with_component("api")
        .with_operation("example_endpoint");
    logger.info("Processing example request");

    let started = Instant::now();
    let outcome = services.example.example_method();
    logger.log_business("example_method", started.elapsed(), outcome.as_ref());

    match outcome {
        Ok(()) => {
            logger.info("Example request completed successfully");
            response::status(StatusCode::OK, "ok", ctx.request_id())
        }
        Err(err) => {
            logger.with_error(&err).error("Example method failed");
            response::error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), ctx.request_id())
        }
    }
}

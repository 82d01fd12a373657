//! Access-logging stage.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::config::LogLevel;
use crate::http::context::RequestContext;
use crate::http::middleware::PipelineState;
use crate::observability::fields;

/// Log the request on the way in and its outcome on the way out.
pub async fn log_requests(
    State(state): State<PipelineState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let logger = RequestContext::from_extensions(request.extensions())
        .map_or(&state.logger, RequestContext::logger)
        .with_request(request.method().as_str(), request.uri().path());

    logger.log(LogLevel::Info, "HTTP request started", started_fields(&request));

    let response = next.run(request).await;

    let size = response
        .body()
        .size_hint()
        .exact()
        .and_then(|size| i64::try_from(size).ok())
        .unwrap_or(-1);
    logger
        .with_response(response.status().as_u16(), size)
        .with_duration(started.elapsed())
        .info("HTTP request completed");

    response
}

/// Fields of the "started" record, copied out so no borrow of the request
/// outlives this call.
fn started_fields(request: &Request) -> [(&'static str, Value); 4] {
    let header_str = |name: header::HeaderName| -> String {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(-1);

    [
        (fields::USER_AGENT, Value::from(header_str(header::USER_AGENT))),
        (fields::REMOTE_ADDR, Value::from(remote_addr)),
        (fields::CONTENT_TYPE, Value::from(header_str(header::CONTENT_TYPE))),
        (fields::CONTENT_LENGTH, Value::from(content_length)),
    ]
}

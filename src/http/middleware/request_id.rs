//! Request-ID stage.

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::http::context::RequestContext;
use crate::http::middleware::PipelineState;
use crate::http::request::{RequestId, X_CORRELATION_ID, X_REQUEST_ID};

/// Create the request's context and echo its ID on the response.
pub async fn assign_request_id(
    State(state): State<PipelineState>,
    mut request: Request,
    next: Next,
) -> Response {
    let correlation_id = request
        .headers()
        .get(&X_CORRELATION_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    let ctx = RequestContext::new(RequestId::generate(), correlation_id, &state.logger);
    let request_id = HeaderValue::from_str(ctx.request_id().as_str()).ok();
    let correlation_id = ctx
        .correlation_id()
        .and_then(|value| HeaderValue::from_str(value).ok());
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Some(value) = request_id {
        headers.insert(X_REQUEST_ID, value);
    }
    if let Some(value) = correlation_id {
        headers.insert(X_CORRELATION_ID, value);
    }
    response
}

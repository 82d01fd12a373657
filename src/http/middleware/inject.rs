//! Context-injection stage.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::http::context::RequestContext;
use crate::http::middleware::PipelineState;
use crate::http::request::RequestId;

/// Give handlers a logger that already names the request's method and path.
pub async fn inject_context(
    State(state): State<PipelineState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = request
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_else(|| RequestContext::new(RequestId::generate(), None, &state.logger));

    let logger = ctx
        .logger()
        .with_request(request.method().as_str(), request.uri().path());
    request.extensions_mut().insert(ctx.with_logger(logger));

    next.run(request).await
}

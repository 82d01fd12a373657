//! Per-request context.
//!
//! One typed value in the request extensions carries everything downstream
//! code needs about the request: its ID, the caller's correlation ID and a
//! logger already annotated with both. The `X-Request-ID` header, JSON bodies
//! and log records all read the ID from here, so they cannot disagree.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, StatusCode};

use crate::http::request::RequestId;
use crate::observability::Logger;

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    correlation_id: Option<String>,
    logger: Logger,
}

impl RequestContext {
    /// Build a context whose logger is `base` annotated with the request identity.
    pub fn new(request_id: RequestId, correlation_id: Option<String>, base: &Logger) -> Self {
        let mut ctx = Self {
            request_id,
            correlation_id,
            logger: base.clone(),
        };
        ctx.logger = base.with_context(&ctx);
        ctx
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Logger carrying the request's identity fields.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Replace the logger, keeping the identity.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<&Self> {
        extensions.get::<Self>()
    }
}

/// Handlers take `ctx: RequestContext` directly.
///
/// A request that bypassed the middleware pipeline has no context and is
/// rejected with 500.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions)
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

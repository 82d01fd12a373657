//! Request identity.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Name the headers the ID and the caller's correlation ID travel in
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The ID is a shared string: cloning it into logs and responses never copies

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderName;
use uuid::Uuid;

/// Response header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Optional caller-supplied correlation header, echoed back when present.
pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Identifier correlating one request's logs and response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<_> = (0..10_000).map(|_| RequestId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn generated_id_is_a_valid_header_value() {
        let id = RequestId::generate();
        assert!(!id.as_str().is_empty());
        assert!(axum::http::HeaderValue::from_str(id.as_str()).is_ok());
    }
}

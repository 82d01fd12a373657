//! JSON response helpers.
//!
//! Every body produced by the service carries the request ID so a caller can
//! quote it when reporting a problem.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::http::request::RequestId;

/// Body message for faults intercepted by the recovery stage.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// `{"status": ..., "request_id": ...}`
pub fn status(code: StatusCode, status: &str, request_id: &RequestId) -> Response {
    (
        code,
        Json(json!({
            "status": status,
            "request_id": request_id.as_str(),
        })),
    )
        .into_response()
}

/// `{"error": ..., "request_id": ...}`
pub fn error(code: StatusCode, message: &str, request_id: &RequestId) -> Response {
    (
        code,
        Json(json!({
            "error": message,
            "request_id": request_id.as_str(),
        })),
    )
        .into_response()
}

/// Fixed 500 used when a handler faults.
pub fn internal_error(request_id: &RequestId) -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE, request_id)
}

//! Field names shared by every structured log record.
//!
//! Log aggregation queries rely on these staying stable.

// Identity, attached at logger creation.
pub const SERVICE: &str = "service";
pub const VERSION: &str = "version";
pub const ENVIRONMENT: &str = "environment";

// Record envelope.
pub const TIME: &str = "time";
pub const LEVEL: &str = "level";
pub const SOURCE: &str = "source";
pub const MESSAGE: &str = "msg";

/// Emitting module, only on records that did not come from a `Logger`.
pub const TARGET: &str = "target";

/// Subsystem originating the record ("server", "database", "api", ...).
pub const COMPONENT: &str = "component";

/// Logical operation name within a component.
pub const OPERATION: &str = "operation";

pub const ERROR: &str = "error";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// Correlation.
pub const REQUEST_ID: &str = "request_id";
pub const CORRELATION_ID: &str = "correlation_id";

// HTTP.
pub const HTTP_METHOD: &str = "http_method";
pub const HTTP_PATH: &str = "http_path";
pub const HTTP_STATUS: &str = "http_status";
pub const RESPONSE_SIZE: &str = "response_size";
pub const USER_AGENT: &str = "user_agent";
pub const REMOTE_ADDR: &str = "remote_addr";
pub const CONTENT_TYPE: &str = "content_type";
pub const CONTENT_LENGTH: &str = "content_length";

/// Payload of a recovered handler panic.
pub const PANIC: &str = "panic";

/// Backtrace captured where the handler panicked.
pub const STACK: &str = "stack";

// Database.
pub const DB_OPERATION: &str = "db_operation";
pub const DB_TABLE: &str = "db_table";

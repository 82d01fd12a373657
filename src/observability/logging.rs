//! Structured logging.
//!
//! # Responsibilities
//! - Build one `tracing` subscriber per configured output at process start
//! - Attach `service`, `version` and `environment` to every record
//! - Derive contextual loggers (`with_*`) without touching the parent
//! - Drop records below the configured level before any work is done
//!
//! # Design Decisions
//! - Uses the tracing crate: each record is a `tracing` event dispatched to the
//!   logger's own subscriber (`EnvFilter` + fmt layer + `MakeWriter`)
//! - Field sets are insertion-ordered; on key collision the newest value wins
//!   but keeps its original position
//! - JSON records are flat objects, text records are `key=value` pairs

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::Dispatch;
use tracing_appender::rolling::InitError;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use crate::config::{LogLevel, LoggerConfig};
use crate::http::context::RequestContext;
use crate::observability::fields;
use crate::observability::format::RecordFormat;
use crate::observability::sink;

/// Ordered mapping from field name to value.
pub type Fields = Map<String, Value>;

/// The configured output could not be used.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("file path is required when output is 'file'")]
    MissingFilePath,

    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: InitError,
    },
}

/// Level applied to events from other crates unless `RUST_LOG` says otherwise.
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::WARN;

struct Core {
    level: LogLevel,
    dispatch: Dispatch,
}

/// Leveled logger carrying an immutable field set.
///
/// Cloning is cheap; the subscriber is shared between a logger and
/// everything derived from it.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    fields: Arc<Fields>,
}

impl Logger {
    /// Create a logger writing to the output named in the configuration.
    pub fn new(config: &LoggerConfig) -> Result<Self, LoggerError> {
        let writer = sink::make_writer(config)?;
        Ok(Self::with_writer(config, writer))
    }

    /// Create a logger writing to an explicit writer, ignoring `config.output`.
    pub fn with_writer<W>(config: &LoggerConfig, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let format = RecordFormat::new(config);
        let identity = format.identity().clone();

        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(format)
            .with_writer(writer);
        let subscriber = tracing_subscriber::registry()
            .with(env_filter(config.level))
            .with(layer);

        Self {
            core: Arc::new(Core {
                level: config.level,
                dispatch: Dispatch::new(subscriber),
            }),
            fields: Arc::new(identity),
        }
    }

    /// The subscriber behind this logger.
    pub(crate) fn dispatch(&self) -> &Dispatch {
        &self.core.dispatch
    }

    /// Whether a record at `level` would be written.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.core.level
    }

    /// The fields attached to every record from this logger.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Derive a logger with `extra` merged over this logger's fields.
    pub fn with_fields<I, K, V>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut merged = Fields::clone(&self.fields);
        for (key, value) in extra {
            merged.insert(key.into(), value.into());
        }
        Self {
            core: Arc::clone(&self.core),
            fields: Arc::new(merged),
        }
    }

    pub fn with_component(&self, component: &str) -> Self {
        self.with_fields([(fields::COMPONENT, component)])
    }

    pub fn with_operation(&self, operation: &str) -> Self {
        self.with_fields([(fields::OPERATION, operation)])
    }

    pub fn with_error(&self, err: &dyn fmt::Display) -> Self {
        self.with_fields([(fields::ERROR, err.to_string())])
    }

    pub fn with_duration(&self, duration: Duration) -> Self {
        self.with_fields([(fields::DURATION_MS, millis(duration))])
    }

    pub fn with_request(&self, method: &str, path: &str) -> Self {
        self.with_fields([(fields::HTTP_METHOD, method), (fields::HTTP_PATH, path)])
    }

    /// `size` is `-1` when the body length is unknown.
    pub fn with_response(&self, status: u16, size: i64) -> Self {
        self.with_fields([
            (fields::HTTP_STATUS, Value::from(status)),
            (fields::RESPONSE_SIZE, Value::from(size)),
        ])
    }

    pub fn with_database(&self, operation: &str, table: &str) -> Self {
        self.with_fields([(fields::DB_OPERATION, operation), (fields::DB_TABLE, table)])
    }

    /// Attach the request's correlation identifiers.
    pub fn with_context(&self, ctx: &RequestContext) -> Self {
        let mut extra = vec![(fields::REQUEST_ID, ctx.request_id().as_str().to_string())];
        if let Some(correlation_id) = ctx.correlation_id() {
            extra.push((fields::CORRELATION_ID, correlation_id.to_string()));
        }
        self.with_fields(extra)
    }

    #[track_caller]
    pub fn debug(&self, msg: &str) {
        self.emit(LogLevel::Debug, msg, None, Location::caller());
    }

    #[track_caller]
    pub fn info(&self, msg: &str) {
        self.emit(LogLevel::Info, msg, None, Location::caller());
    }

    #[track_caller]
    pub fn warn(&self, msg: &str) {
        self.emit(LogLevel::Warn, msg, None, Location::caller());
    }

    #[track_caller]
    pub fn error(&self, msg: &str) {
        self.emit(LogLevel::Error, msg, None, Location::caller());
    }

    /// Emit one record with fields that apply to this call only.
    #[track_caller]
    pub fn log<I, K, V>(&self, level: LogLevel, msg: &str, extra: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        if !self.enabled(level) {
            return;
        }
        let extra = extra
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.emit(level, msg, Some(extra), Location::caller());
    }

    /// Emit at error level and terminate the process with status 1.
    ///
    /// Only for startup and shutdown boundaries.
    #[track_caller]
    pub fn fatal(&self, msg: &str) -> ! {
        self.emit(LogLevel::Error, msg, None, Location::caller());
        std::process::exit(1)
    }

    /// Report a database call: info on success, error with the cause on failure.
    #[track_caller]
    pub fn log_database<T, E: fmt::Display>(
        &self,
        operation: &str,
        table: &str,
        duration: Duration,
        outcome: Result<T, E>,
    ) {
        let logger = self.with_database(operation, table).with_duration(duration);
        match outcome {
            Ok(_) => logger.emit(LogLevel::Info, "Database operation completed", None, Location::caller()),
            Err(err) => logger.with_error(&err).emit(
                LogLevel::Error,
                "Database operation failed",
                None,
                Location::caller(),
            ),
        }
    }

    /// Report a business operation: info on success, error with the cause on failure.
    #[track_caller]
    pub fn log_business<T, E: fmt::Display>(&self, operation: &str, duration: Duration, outcome: Result<T, E>) {
        let logger = self.with_operation(operation).with_duration(duration);
        match outcome {
            Ok(_) => logger.emit(LogLevel::Info, "Business operation completed", None, Location::caller()),
            Err(err) => logger.with_error(&err).emit(
                LogLevel::Error,
                "Business operation failed",
                None,
                Location::caller(),
            ),
        }
    }

    fn emit(&self, level: LogLevel, msg: &str, extra: Option<Fields>, location: &Location<'_>) {
        if !self.enabled(level) {
            return;
        }

        let payload = match extra {
            Some(extra) => {
                let mut merged = Fields::clone(&self.fields);
                merged.extend(extra);
                Value::Object(merged).to_string()
            }
            None => serde_json::to_string(&*self.fields).unwrap_or_default(),
        };
        let source = format!("{}:{}", location.file(), location.line());
        let payload = payload.as_str();
        let source = source.as_str();

        // Field names must match `format::FIELDS_KEY` and `format::SOURCE_KEY`.
        tracing::dispatcher::with_default(&self.core.dispatch, || match level {
            LogLevel::Debug => {
                tracing::debug!(record.fields = payload, record.source = source, "{}", msg)
            }
            LogLevel::Info => {
                tracing::info!(record.fields = payload, record.source = source, "{}", msg)
            }
            LogLevel::Warn => {
                tracing::warn!(record.fields = payload, record.source = source, "{}", msg)
            }
            LogLevel::Error => {
                tracing::error!(record.fields = payload, record.source = source, "{}", msg)
            }
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.core.level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// This crate at the configured level, everything else at `RUST_LOG` or warn.
fn env_filter(level: LogLevel) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(DEPENDENCY_LEVEL.into())
        .from_env_lossy();
    match format!("{}={}", env!("CARGO_CRATE_NAME"), level_filter(level)).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, LogOutput};
    use crate::http::request::RequestId;
    use crate::observability::sink::MemorySink;
    use serde_json::json;

    fn capture(level: LogLevel, format: LogFormat) -> (Logger, MemorySink) {
        let config = LoggerConfig {
            level,
            format,
            output: LogOutput::Stdout,
            service: "orders".into(),
            version: "1.2.3".into(),
            environment: "test".into(),
            ..LoggerConfig::default()
        };
        let sink = MemorySink::new();
        (Logger::with_writer(&config, sink.clone()), sink)
    }

    #[test]
    fn json_record_has_envelope_and_identity() {
        let (logger, sink) = capture(LogLevel::Info, LogFormat::Json);
        logger.with_component("api").info("hello");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["msg"], "hello");
        assert_eq!(record["level"], "INFO");
        assert_eq!(record["service"], "orders");
        assert_eq!(record["version"], "1.2.3");
        assert_eq!(record["environment"], "test");
        assert_eq!(record["component"], "api");
        assert!(record["time"].as_str().is_some_and(|t| t.ends_with('Z')));
        assert!(record.get("source").is_none());
    }

    #[test]
    fn derivation_leaves_parent_untouched() {
        let (base, _) = capture(LogLevel::Info, LogFormat::Json);
        let before = base.fields().clone();

        let first = base.with_component("db");
        let second = base.with_fields([("request_id", "abc")]);

        assert_eq!(base.fields(), &before);
        assert_eq!(first.field("component"), Some(&json!("db")));
        assert!(first.field("request_id").is_none());
        assert_eq!(second.field("request_id"), Some(&json!("abc")));
        assert!(second.field("component").is_none());
    }

    #[test]
    fn later_value_wins_on_collision() {
        let (base, sink) = capture(LogLevel::Info, LogFormat::Json);
        let logger = base.with_fields([("a", 1)]).with_fields([("a", 2)]);

        assert_eq!(logger.field("a"), Some(&json!(2)));
        logger.info("merged");
        assert_eq!(sink.records()[0]["a"], 2);
    }

    #[test]
    fn warn_threshold_drops_debug_and_info() {
        let (logger, sink) = capture(LogLevel::Warn, LogFormat::Json);
        logger.debug("d");
        logger.info("i");
        logger.log(LogLevel::Info, "i2", [("k", "v")]);
        assert!(sink.is_empty());

        logger.warn("w");
        logger.error("e");
        let levels: Vec<_> = sink
            .records()
            .iter()
            .map(|r| r["level"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(levels, vec!["WARN", "ERROR"]);
    }

    #[test]
    fn call_fields_override_logger_fields() {
        let (logger, sink) = capture(LogLevel::Debug, LogFormat::Json);
        logger
            .with_fields([("attempt", 1)])
            .log(LogLevel::Debug, "retry", [("attempt", json!(2)), ("extra", json!(true))]);

        let record = &sink.records()[0];
        assert_eq!(record["attempt"], 2);
        assert_eq!(record["extra"], true);
    }

    #[test]
    fn convenience_derivations_use_fixed_names() {
        let (logger, _) = capture(LogLevel::Info, LogFormat::Json);
        let derived = logger
            .with_operation("create")
            .with_error(&"boom")
            .with_duration(Duration::from_millis(1500))
            .with_request("GET", "/x")
            .with_response(200, 17)
            .with_database("select", "users");

        assert_eq!(derived.field("operation"), Some(&json!("create")));
        assert_eq!(derived.field("error"), Some(&json!("boom")));
        assert_eq!(derived.field("duration_ms"), Some(&json!(1500)));
        assert_eq!(derived.field("http_method"), Some(&json!("GET")));
        assert_eq!(derived.field("http_path"), Some(&json!("/x")));
        assert_eq!(derived.field("http_status"), Some(&json!(200)));
        assert_eq!(derived.field("response_size"), Some(&json!(17)));
        assert_eq!(derived.field("db_operation"), Some(&json!("select")));
        assert_eq!(derived.field("db_table"), Some(&json!("users")));
    }

    #[test]
    fn with_context_adds_request_identity() {
        let (logger, _) = capture(LogLevel::Info, LogFormat::Json);
        let ctx = RequestContext::new(RequestId::from("req-1"), Some("corr-9".into()), &logger);

        let derived = logger.with_context(&ctx);
        assert_eq!(derived.field("request_id"), Some(&json!("req-1")));
        assert_eq!(derived.field("correlation_id"), Some(&json!("corr-9")));
    }

    #[test]
    fn text_format_quotes_when_needed() {
        let (logger, sink) = capture(LogLevel::Info, LogFormat::Text);
        logger.with_fields([("path", "/a b")]).info("request started");

        let line = &sink.lines()[0];
        assert!(line.starts_with("time="), "{line}");
        assert!(line.contains(" level=INFO "), "{line}");
        assert!(line.contains(r#"msg="request started""#), "{line}");
        assert!(line.contains(" service=orders "), "{line}");
        assert!(line.ends_with(r#"path="/a b""#), "{line}");
    }

    #[test]
    fn add_source_records_call_site() {
        let config = LoggerConfig {
            add_source: true,
            ..LoggerConfig::default()
        };
        let sink = MemorySink::new();
        let logger = Logger::with_writer(&config, sink.clone());
        logger.info("where");

        let source = sink.records()[0]["source"].as_str().unwrap_or_default().to_string();
        assert!(source.starts_with(file!()), "{source}");
    }

    #[test]
    fn log_business_reports_outcome() {
        let (logger, sink) = capture(LogLevel::Info, LogFormat::Json);
        logger.log_business("charge", Duration::from_millis(3), Ok::<(), &str>(()));
        logger.log_business("refund", Duration::from_millis(4), Err::<(), _>("declined"));

        let done = sink.records_with_message("Business operation completed");
        assert_eq!(done[0]["operation"], "charge");
        assert_eq!(done[0]["duration_ms"], 3);

        let failed = sink.records_with_message("Business operation failed");
        assert_eq!(failed[0]["level"], "ERROR");
        assert_eq!(failed[0]["error"], "declined");
    }

    #[test]
    fn log_database_reports_outcome() {
        let (logger, sink) = capture(LogLevel::Info, LogFormat::Json);
        logger.log_database("ping", "", Duration::ZERO, Err::<(), _>("connection refused"));

        let failed = sink.records_with_message("Database operation failed");
        assert_eq!(failed[0]["db_operation"], "ping");
        assert_eq!(failed[0]["error"], "connection refused");
    }

    #[test]
    fn shared_logger_is_safe_across_threads() {
        let (logger, sink) = capture(LogLevel::Info, LogFormat::Json);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let logger = logger.with_fields([("worker", i)]);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        logger.info("tick");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.records().len(), 200);
        assert!(logger.field("worker").is_none());
    }

    #[test]
    fn file_output_receives_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.log");
        let config = LoggerConfig {
            output: LogOutput::File,
            file_path: path.display().to_string(),
            ..LoggerConfig::default()
        };

        let logger = Logger::new(&config).unwrap();
        logger.with_component("startup").info("written to disk");

        let content = std::fs::read_to_string(&path).unwrap();
        let record: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record["msg"], "written to disk");
        assert_eq!(record["component"], "startup");
        assert_eq!(record["service"], "service-template");
    }

    #[test]
    fn record_keys_follow_envelope_order() {
        let (logger, sink) = capture(LogLevel::Info, LogFormat::Json);
        logger.with_fields([("z", 1), ("a", 2)]).info("ordered");

        let line = &sink.lines()[0];
        let keys: Vec<_> = serde_json::from_str::<Fields>(line).unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            ["time", "level", "msg", "service", "version", "environment", "z", "a"]
        );
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Service name used when the logger config leaves it blank.
pub const DEFAULT_SERVICE_NAME: &str = "service-template";

/// Environment name used when the logger config leaves it blank.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub http: HttpConfig,

    /// Postgres connection settings.
    pub database: DatabaseConfig,

    /// Structured logger settings.
    pub logger: LoggerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to bind.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Postgres connection configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,

    /// libpq style SSL mode (`disable`, `prefer`, `require`, ...).
    pub ssl_mode: String,

    /// Upper bound on pooled connections.
    pub max_conns: u32,

    /// Connections kept open while idle.
    pub min_conns: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_mode: "disable".to_string(),
            max_conns: 10,
            min_conns: 1,
        }
    }
}

// Hand-written so the password never lands in a log line.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("max_conns", &self.max_conns)
            .field("min_conns", &self.min_conns)
            .finish()
    }
}

/// Severity threshold for the structured logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Upper-case label written into every record.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Lenient parse used for environment variables; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Record encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Where records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Structured logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    /// Target file when `output = "file"`; blank otherwise.
    pub file_path: String,

    /// Attach the `file:line` of each call site as `source`.
    pub add_source: bool,

    pub service: String,
    pub version: String,
    pub environment: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            file_path: String::new(),
            add_source: false,
            service: DEFAULT_SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl LoggerConfig {
    /// Replace blank identity fields with their defaults.
    pub fn fill_defaults(&mut self) {
        let defaults = Self::default();
        if self.service.trim().is_empty() {
            self.service = defaults.service;
        }
        if self.version.trim().is_empty() {
            self.version = defaults.version;
        }
        if self.environment.trim().is_empty() {
            self.environment = defaults.environment;
        }
    }

    /// Build a logger config from the process environment.
    ///
    /// Reads `LOG_LEVEL`, `LOG_FORMAT`, `LOG_OUTPUT`, `LOG_FILE_PATH`,
    /// `LOG_ADD_SOURCE`, `SERVICE_NAME`, `SERVICE_VERSION` and `ENVIRONMENT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LoggerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = non_blank("LOG_LEVEL").as_deref().and_then(LogLevel::parse) {
            config.level = level;
        }
        if let Some(format) = non_blank("LOG_FORMAT") {
            if format.eq_ignore_ascii_case("text") {
                config.format = LogFormat::Text;
            }
        }
        if let Some(output) = non_blank("LOG_OUTPUT") {
            config.output = match output.to_ascii_lowercase().as_str() {
                "stderr" => LogOutput::Stderr,
                "file" => LogOutput::File,
                _ => LogOutput::Stdout,
            };
        }
        if let Some(path) = non_blank("LOG_FILE_PATH") {
            config.file_path = path;
        }
        config.add_source = non_blank("LOG_ADD_SOURCE").is_some_and(|value| value == "true");
        if let Some(service) = non_blank("SERVICE_NAME") {
            config.service = service;
        }
        if let Some(version) = non_blank("SERVICE_VERSION") {
            config.version = version;
        }
        if let Some(environment) = non_blank("ENVIRONMENT") {
            config.environment = environment;
        }
        config
    }
}

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! schema defaults ← config file (TOML) ← APP_* environment
//!     → loader.rs (figment layering, extract)
//!     → schema.rs (logger defaults filled in)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed by value to the subsystems that need it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, DEFAULT_CONFIG_PATH, ENV_PREFIX};
pub use schema::{AppConfig, DatabaseConfig, HttpConfig, LogFormat, LogLevel, LogOutput, LoggerConfig};
pub use validation::{validate_config, ValidationError};

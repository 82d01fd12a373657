//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required connection settings are present
//! - Value ranges (ports non-zero, pool bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{AppConfig, LogOutput};

const SSL_MODES: [&str; 6] = ["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("database.min_conns ({min}) exceeds database.max_conns ({max})")]
    PoolBounds { min: u32, max: u32 },

    #[error("unknown database.ssl_mode '{0}'")]
    SslMode(String),

    #[error("logger.file_path is required when logger.output is 'file'")]
    MissingLogFile,
}

/// Check the configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http.host.trim().is_empty() {
        errors.push(ValidationError::Missing("http.host"));
    }
    if config.http.port == 0 {
        errors.push(ValidationError::Zero("http.port"));
    }

    let db = &config.database;
    let required = [
        ("database.host", &db.host),
        ("database.database", &db.database),
        ("database.username", &db.username),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::Missing(field));
        }
    }
    if db.port == 0 {
        errors.push(ValidationError::Zero("database.port"));
    }
    if db.max_conns == 0 {
        errors.push(ValidationError::Zero("database.max_conns"));
    }
    if db.min_conns > db.max_conns {
        errors.push(ValidationError::PoolBounds {
            min: db.min_conns,
            max: db.max_conns,
        });
    }
    if !SSL_MODES.contains(&db.ssl_mode.as_str()) {
        errors.push(ValidationError::SslMode(db.ssl_mode.clone()));
    }

    if config.logger.output == LogOutput::File && config.logger.file_path.trim().is_empty() {
        errors.push(ValidationError::MissingLogFile);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

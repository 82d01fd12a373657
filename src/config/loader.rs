//! Configuration loading from disk.
//!
//! Sources, lowest precedence first: the schema defaults, the TOML file, then
//! environment overrides named `APP_<SECTION>_<KEY>`, e.g. `APP_HTTP_PORT=9090`
//! or `APP_DATABASE_SSL_MODE=require`.

use std::fs;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "APP_";

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load config: {0}")]
    Figment(#[from] figment::Error),

    #[error(
        "validation failed: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file, applying `APP_*` overrides.
///
/// A missing file is an error; there is no silent fallback to defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Layer config text and the environment over the defaults, fill logger
/// defaults and validate.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::string(content))
        .merge(env_overrides())
        .extract()?;
    config.logger.fill_defaults();

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// `APP_DATABASE_SSL_MODE` → `database.ssl_mode`.
///
/// Section names contain no underscore, so the first one separates the
/// section from the key. Variables without a key part are ignored.
pub fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX)
        .filter(|key| key.as_str().contains('_'))
        .map(|key| key.as_str().replacen('_', ".", 1).into())
}

//! Layered HTTP service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ server (accept loop, connection timeouts)
//!                        │
//!                        ▼
//!                     middleware: request ID → access log → recovery → context
//!                        │
//!                        ▼
//!                     handlers ──▶ services ──▶ repositories ──▶ Postgres
//!
//!     Cross-cutting: config (TOML + APP_* env), structured logger, lifecycle
//! ```
//!
//! # Exit Codes
//! - `0` after a signal-driven graceful shutdown
//! - `1` when configuration, logger setup or startup fails

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use service_template::config::{load_config, LoggerConfig, DEFAULT_CONFIG_PATH};
use service_template::lifecycle::{self, shutdown_signal};
use service_template::observability::init_tracing;
use service_template::Logger;

#[derive(Debug, Parser)]
#[command(name = "service-template", version, about = "Layered HTTP service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            // No configured logger yet: fall back to the environment-only one.
            match Logger::new(&LoggerConfig::from_env()) {
                Ok(logger) => logger
                    .with_component("config")
                    .with_error(&err)
                    .error("Failed to load configuration"),
                Err(_) => eprintln!("failed to load configuration: {err}"),
            }
            return ExitCode::FAILURE;
        }
    };

    let logger = match Logger::new(&config.logger) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("failed to initialize logger: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_tracing(&logger) {
        logger
            .with_error(&err)
            .warn("Dependency diagnostics unavailable");
    }

    let app_logger = logger.with_component("app");
    app_logger
        .with_fields([("config_path", cli.config.display().to_string())])
        .info("Configuration loaded");

    if let Err(err) = lifecycle::run(config, logger.clone(), shutdown_signal()).await {
        app_logger.with_error(&err).fatal("Application failed");
    }

    app_logger.info("Shutdown complete");
    ExitCode::SUCCESS
}

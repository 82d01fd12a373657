//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect to Postgres before anything else
//! - Wire repositories → services → routes → server, in dependency order
//! - Serve until the shutdown signal, then stop the server and close the pool
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned to `main`, which exits non-zero
//! - Every step logs under its own `component`

use std::future::Future;

use thiserror::Error;

use crate::config::{AppConfig, HttpConfig};
use crate::database;
use crate::http::{self, HttpServer, ServerError, ServerTimeouts};
use crate::observability::Logger;
use crate::repository::Repositories;
use crate::service::Services;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not init postgres connection: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not start http server: {0}")]
    Server(#[from] ServerError),
}

/// Run the service until `signal` resolves.
pub async fn run<F>(config: AppConfig, logger: Logger, signal: F) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    logger.with_component("app").info("Initializing web server");

    let db_logger = logger.with_component("database");
    db_logger.info("Connecting to database");
    let pool = match database::connect(&config.database).await {
        Ok(pool) => pool,
        Err(err) => {
            db_logger
                .with_error(&err)
                .error("Failed to initialize database connection");
            return Err(err.into());
        }
    };
    db_logger.info("Database connection established");

    logger.with_component("repository").info("Initializing repositories");
    let repos = Repositories::postgres(pool.clone(), &logger);

    logger.with_component("service").info("Initializing services");
    let services = Services::new(&repos);

    let result = serve_until(config.http, services, logger.clone(), ServerTimeouts::default(), signal).await;

    db_logger.info("Closing database connection");
    pool.close().await;

    result
}

/// Serve `services` over HTTP until `signal` resolves, then stop gracefully.
pub async fn serve_until<F>(
    http_config: HttpConfig,
    services: Services,
    logger: Logger,
    timeouts: ServerTimeouts,
    signal: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    logger.with_component("handler").info("Initializing handlers");
    let app = http::app(services, logger.clone(), &timeouts);

    let server_logger = logger.with_component("server");
    server_logger.info("Initializing HTTP server");
    let mut server = HttpServer::new(http_config, app, logger.clone()).with_timeouts(timeouts);

    server_logger
        .with_fields([
            ("host", serde_json::Value::from(server.config().host.clone())),
            ("port", serde_json::Value::from(server.config().port)),
        ])
        .info("Starting HTTP server");
    server.start().await?;
    server_logger.info("HTTP server started successfully");

    signal.await;
    logger.with_component("app").info("Received shutdown signal");

    server.stop().await;
    Ok(())
}

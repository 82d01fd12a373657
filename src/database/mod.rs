//! Postgres connection pool.
//!
//! # Responsibilities
//! - Translate `DatabaseConfig` into sqlx connect options
//! - Size the pool from `max_conns` / `min_conns`
//! - Prove connectivity once before the service starts taking traffic

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use crate::config::DatabaseConfig;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect options for the configured server.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let ssl_mode: PgSslMode = config.ssl_mode.parse()?;
    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.username)
        .password(&config.password)
        .ssl_mode(ssl_mode))
}

/// Open the pool and ping it. The pool is closed again if the ping fails.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_conns)
        .min_connections(config.min_conns)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options(config)?)
        .await?;

    if let Err(err) = sqlx::query("SELECT 1").execute(&pool).await {
        pool.close().await;
        return Err(err);
    }

    Ok(pool)
}

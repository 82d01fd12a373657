//! Data access layer.
//!
//! Repositories hide the pool behind small traits so services (and tests)
//! never depend on Postgres directly. Driver errors are returned as they are.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::observability::Logger;

/// Storage behind the example resource.
pub trait ExampleRepository: Send + Sync {
    fn example_method(&self) -> Result<(), sqlx::Error>;
}

/// Connectivity check behind readiness.
#[async_trait]
pub trait HealthRepository: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

/// Placeholder resource store; it has no table yet, so it holds no pool.
#[derive(Debug, Default)]
pub struct PgExampleRepository;

impl ExampleRepository for PgExampleRepository {
    fn example_method(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

pub struct PgHealthRepository {
    pool: PgPool,
    logger: Logger,
}

impl PgHealthRepository {
    pub fn new(pool: PgPool, logger: &Logger) -> Self {
        Self {
            pool,
            logger: logger.with_component("repository"),
        }
    }
}

#[async_trait]
impl HealthRepository for PgHealthRepository {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        let started = Instant::now();
        let outcome = sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ());
        self.logger
            .log_database("ping", "", started.elapsed(), outcome.as_ref());
        outcome
    }
}

/// Every repository the services need.
#[derive(Clone)]
pub struct Repositories {
    pub example: Arc<dyn ExampleRepository>,
    pub health: Arc<dyn HealthRepository>,
}

impl Repositories {
    pub fn new(example: Arc<dyn ExampleRepository>, health: Arc<dyn HealthRepository>) -> Self {
        Self { example, health }
    }

    /// Postgres-backed repositories.
    pub fn postgres(pool: PgPool, logger: &Logger) -> Self {
        Self::new(
            Arc::new(PgExampleRepository),
            Arc::new(PgHealthRepository::new(pool, logger)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use crate::config::{DatabaseConfig, LoggerConfig};
    use crate::database;
    use crate::observability::MemorySink;

    #[tokio::test]
    async fn unreachable_database_fails_ping_and_logs_it() {
        let sink = MemorySink::new();
        let logger = Logger::with_writer(&LoggerConfig::default(), sink.clone());
        let config = DatabaseConfig {
            host: "127.0.0.1".into(),
            port: 1,
            database: "app".into(),
            username: "svc".into(),
            ..DatabaseConfig::default()
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy_with(database::connect_options(&config).unwrap());

        let repositories = Repositories::postgres(pool, &logger);
        assert!(repositories.example.example_method().is_ok());
        assert!(repositories.health.ping().await.is_err());

        let failed = sink.records_with_message("Database operation failed");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["db_operation"], "ping");
        assert_eq!(failed[0]["component"], "repository");
        assert!(failed[0]["error"].as_str().is_some_and(|err| !err.is_empty()));
    }
}

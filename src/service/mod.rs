//! Business layer.
//!
//! Services delegate to repositories; nothing here adds behavior yet, but
//! handlers depend only on these traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::repository::{ExampleRepository, HealthRepository, Repositories};

pub trait ExampleService: Send + Sync {
    fn example_method(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
pub trait HealthService: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

pub struct DefaultExampleService {
    repo: Arc<dyn ExampleRepository>,
}

impl DefaultExampleService {
    pub fn new(repo: Arc<dyn ExampleRepository>) -> Self {
        Self { repo }
    }
}

impl ExampleService for DefaultExampleService {
    fn example_method(&self) -> Result<(), sqlx::Error> {
        self.repo.example_method()
    }
}

pub struct DefaultHealthService {
    repo: Arc<dyn HealthRepository>,
}

impl DefaultHealthService {
    pub fn new(repo: Arc<dyn HealthRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl HealthService for DefaultHealthService {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.repo.ping().await
    }
}

/// Handler-facing service graph, shared as axum state.
#[derive(Clone)]
pub struct Services {
    pub example: Arc<dyn ExampleService>,
    pub health: Arc<dyn HealthService>,
}

impl Services {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            example: Arc::new(DefaultExampleService::new(Arc::clone(&repos.example))),
            health: Arc::new(DefaultHealthService::new(Arc::clone(&repos.health))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingExample;

    impl ExampleRepository for FailingExample {
        fn example_method(&self) -> Result<(), sqlx::Error> {
            Err(sqlx::Error::Protocol("example store offline".into()))
        }
    }

    struct HealthyDatabase;

    #[async_trait]
    impl HealthRepository for HealthyDatabase {
        async fn ping(&self) -> Result<(), sqlx::Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn services_delegate_to_repositories() {
        let repos = Repositories::new(Arc::new(FailingExample), Arc::new(HealthyDatabase));
        let services = Services::new(&repos);

        let err = services.example.example_method().unwrap_err();
        assert!(err.to_string().contains("example store offline"));
        assert!(services.health.ping().await.is_ok());
    }
}

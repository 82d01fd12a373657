//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use service_template::config::{HttpConfig, LoggerConfig};
use service_template::http::{HttpServer, ServerTimeouts};
use service_template::observability::MemorySink;
use service_template::repository::{ExampleRepository, HealthRepository, Repositories};
use service_template::service::Services;
use service_template::Logger;

/// Logger whose records land in the returned sink.
pub fn capture_logger() -> (Logger, MemorySink) {
    let sink = MemorySink::new();
    let logger = Logger::with_writer(&LoggerConfig::default(), sink.clone());
    (logger, sink)
}

/// Example repository answering with a fixed outcome.
pub struct StubExample {
    pub failure: Option<&'static str>,
}

impl ExampleRepository for StubExample {
    fn example_method(&self) -> Result<(), sqlx::Error> {
        match self.failure {
            Some(message) => Err(sqlx::Error::Protocol(message.into())),
            None => Ok(()),
        }
    }
}

/// Health check that waits `delay` before answering.
pub struct StubHealth {
    pub failure: Option<&'static str>,
    pub delay: Duration,
}

impl StubHealth {
    pub fn healthy() -> Self {
        Self {
            failure: None,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            failure: Some(message),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { failure: None, delay }
    }
}

#[async_trait]
impl HealthRepository for StubHealth {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.failure {
            Some(message) => Err(sqlx::Error::Protocol(message.into())),
            None => Ok(()),
        }
    }
}

pub fn services(example: StubExample, health: StubHealth) -> Services {
    Services::new(&Repositories::new(Arc::new(example), Arc::new(health)))
}

pub fn healthy_services() -> Services {
    services(StubExample { failure: None }, StubHealth::healthy())
}

pub fn loopback() -> HttpConfig {
    HttpConfig {
        host: "127.0.0.1".into(),
        port: 0,
    }
}

/// Start `router` on an ephemeral loopback port.
pub async fn spawn_server(router: Router, logger: &Logger, timeouts: ServerTimeouts) -> (HttpServer, SocketAddr) {
    let mut server = HttpServer::new(loopback(), router, logger.clone()).with_timeouts(timeouts);
    let addr = server.start().await.unwrap();
    (server, addr)
}

/// Start the full application over `services`.
pub async fn spawn_app(services: Services, logger: &Logger, timeouts: ServerTimeouts) -> (HttpServer, SocketAddr) {
    let app = service_template::http::app(services, logger.clone(), &timeouts);
    spawn_server(app, logger, timeouts).await
}

/// Client that opens a fresh connection per request.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

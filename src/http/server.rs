//! HTTP server lifecycle.
//!
//! # Responsibilities
//! - Bind the configured host:port and accept connections in a background task
//! - Serve each connection with HTTP/1.1 or HTTP/2 via hyper-util
//! - Enforce the header-read and idle timeouts per connection
//!
//! # Design Decisions
//! - The header-read bound starts at the first byte of a new request, not
//!   when the previous response ends, so keep-alive waits are bounded by the
//!   idle timeout alone. hyper's own header timer is therefore disabled and
//!   the connection's reads are observed directly.
//! - HTTP/2 connections skip the header bound; their streams are multiplexed
//!   over one socket and hyper keeps them alive with its own pings.
//! - Stop gracefully: stop accepting, let in-flight requests finish, force-close
//!   whatever is still open when the shutdown bound expires
//!
//! # States
//! ```text
//! Stopped ──start()──▶ Running ──stop()──▶ Stopping ──▶ Stopped
//! ```

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tower::ServiceExt;

use crate::config::HttpConfig;
use crate::lifecycle::Shutdown;
use crate::observability::Logger;

/// Fixed connection and shutdown limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimeouts {
    /// Reading the request body.
    pub read: Duration,
    /// Producing the response.
    pub write: Duration,
    /// Keep-alive connection with no request in flight.
    pub idle: Duration,
    /// Receiving the request line and headers.
    pub read_header: Duration,
    /// Draining in-flight requests on stop.
    pub shutdown: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(10),
            write: Duration::from_secs(15),
            idle: Duration::from_secs(60),
            read_header: Duration::from_secs(5),
            shutdown: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
    Stopping,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server is already running")]
    AlreadyRunning,
}

/// HTTP server owning one listener and one handler graph.
pub struct HttpServer {
    config: HttpConfig,
    router: Router,
    logger: Logger,
    timeouts: ServerTimeouts,
    state: ServerState,
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl HttpServer {
    /// Create a stopped server for `router`.
    pub fn new(config: HttpConfig, router: Router, logger: Logger) -> Self {
        Self {
            config,
            router,
            logger: logger.with_component("server"),
            timeouts: ServerTimeouts::default(),
            state: ServerState::Stopped,
            shutdown: Shutdown::new(),
            task: None,
            local_addr: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Address actually bound, once running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Bind and start accepting in the background.
    ///
    /// Returns as soon as the socket is bound. Errors after that point are
    /// logged by the accept loop and never reach the caller.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if self.state != ServerState::Stopped {
            return Err(ServerError::AlreadyRunning);
        }

        let address = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address, source })?;

        self.shutdown = Shutdown::new();
        let accept = AcceptLoop {
            listener,
            router: self.router.clone(),
            logger: self.logger.clone(),
            timeouts: self.timeouts,
            shutdown: self.shutdown.clone(),
        };
        self.task = Some(tokio::spawn(accept.run()));
        self.local_addr = Some(local_addr);
        self.state = ServerState::Running;

        self.logger
            .with_fields([("address", local_addr.to_string())])
            .info("HTTP server listening");
        Ok(local_addr)
    }

    /// Stop gracefully within the shutdown bound, then force-close.
    ///
    /// Always ends in `Stopped`; failures are logged, never returned.
    pub async fn stop(&mut self) {
        let Some(mut task) = self.task.take() else {
            self.state = ServerState::Stopped;
            return;
        };

        self.state = ServerState::Stopping;
        self.logger.info("Stopping HTTP server");
        self.shutdown.trigger();

        match tokio::time::timeout(self.timeouts.shutdown, &mut task).await {
            Ok(Ok(())) => self.logger.info("HTTP server stopped"),
            Ok(Err(err)) => self
                .logger
                .with_error(&err)
                .error("HTTP server task failed during shutdown"),
            Err(_) => {
                self.logger
                    .with_duration(self.timeouts.shutdown)
                    .warn("Shutdown timed out, closing remaining connections");
                task.abort();
                if let Err(err) = task.await {
                    if !err.is_cancelled() {
                        self.logger
                            .with_error(&err)
                            .error("HTTP server task failed during forced shutdown");
                    }
                }
            }
        }

        self.local_addr = None;
        self.state = ServerState::Stopped;
    }
}

struct AcceptLoop {
    listener: TcpListener,
    router: Router,
    logger: Logger,
    timeouts: ServerTimeouts,
    shutdown: Shutdown,
}

impl AcceptLoop {
    async fn run(self) {
        let mut shutdown = self.shutdown.subscribe();
        // Dropping the set (on abort) drops every connection with it.
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    self.logger
                        .with_fields([("in_flight_connections", connections.len())])
                        .info("Shutdown signal received, draining connections");
                    break;
                }

                accepted = self.listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            self.logger.with_error(&err).error("Failed to accept connection");
                            continue;
                        }
                    };
                    connections.spawn(serve_connection(
                        stream,
                        remote_addr,
                        self.router.clone(),
                        self.logger.clone(),
                        self.timeouts,
                        self.shutdown.subscribe(),
                    ));
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(self.listener);
        while connections.join_next().await.is_some() {}
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    router: Router,
    logger: Logger,
    timeouts: ServerTimeouts,
    mut shutdown: broadcast::Receiver<()>,
) {
    let logger = logger.with_fields([("peer", remote_addr.to_string())]);
    let activity = Arc::new(Activity::new());

    let service = {
        let activity = Arc::clone(&activity);
        service_fn(move |request: hyper::Request<Incoming>| {
            let router = router.clone();
            let in_flight = activity.begin();
            async move {
                let mut request = request.map(Body::new);
                request.extensions_mut().insert(ConnectInfo(remote_addr));
                let response = router.oneshot(request).await;
                drop(in_flight);
                response
            }
        })
    };

    let mut builder = ConnBuilder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(None::<Duration>);
    builder.http2().timer(TokioTimer::new());

    let io = TokioIo::new(Tracked {
        inner: stream,
        activity: Arc::clone(&activity),
    });
    let connection = builder.serve_connection(io, service);
    tokio::pin!(connection);

    let mut check = tokio::time::interval(check_period(timeouts.idle.min(timeouts.read_header)));
    let mut closing = false;

    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(err) = result {
                    logger.with_error(&err).debug("Connection closed with error");
                }
                break;
            }

            _ = shutdown.recv(), if !closing => {
                connection.as_mut().graceful_shutdown();
                closing = true;
            }

            _ = check.tick() => {
                if activity.header_overdue(timeouts.read_header) {
                    // Dropping the connection closes the socket.
                    logger.debug("Closing connection with incomplete request headers");
                    break;
                }
                if !closing && activity.idle_for().is_some_and(|idle| idle >= timeouts.idle) {
                    logger.debug("Closing idle connection");
                    connection.as_mut().graceful_shutdown();
                    closing = true;
                }
            }
        }
    }
}

fn check_period(limit: Duration) -> Duration {
    (limit / 4).clamp(Duration::from_millis(10), Duration::from_secs(1))
}

/// Connection preface sent first by every HTTP/2 client.
const HTTP2_PREFACE: &[u8] = b"PRI ";

/// Request activity on one connection.
struct Activity {
    opened: Instant,
    in_flight: AtomicUsize,
    last_active_ms: AtomicU64,
    /// Start of the request head being received, plus one; zero when none.
    head_started_ms: AtomicU64,
    seen_bytes: AtomicBool,
    multiplexed: AtomicBool,
}

impl Activity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_active_ms: AtomicU64::new(0),
            head_started_ms: AtomicU64::new(0),
            seen_bytes: AtomicBool::new(false),
            multiplexed: AtomicBool::new(false),
        }
    }

    fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.head_started_ms.store(0, Ordering::SeqCst);
        self.touch();
        InFlight(Arc::clone(self))
    }

    /// Bytes arrived from the peer.
    ///
    /// With no request in flight they open a new request head, which starts
    /// the header-read clock unless it is already running.
    fn on_read(&self, bytes: &[u8]) {
        if !self.seen_bytes.swap(true, Ordering::SeqCst) && bytes.starts_with(HTTP2_PREFACE) {
            self.multiplexed.store(true, Ordering::SeqCst);
        }
        self.touch();
        if self.multiplexed.load(Ordering::SeqCst) || self.in_flight.load(Ordering::SeqCst) > 0 {
            return;
        }
        let _ = self.head_started_ms.compare_exchange(
            0,
            self.now_ms().saturating_add(1),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn touch(&self) {
        self.last_active_ms.store(self.now_ms(), Ordering::SeqCst);
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Time since the last request ended, or `None` while one is running.
    fn idle_for(&self) -> Option<Duration> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let last = self.last_active_ms.load(Ordering::SeqCst);
        Some(Duration::from_millis(self.now_ms().saturating_sub(last)))
    }

    /// Whether a request head has been arriving for `limit` or longer.
    fn header_overdue(&self, limit: Duration) -> bool {
        match self.head_started_ms.load(Ordering::SeqCst) {
            0 => false,
            started => Duration::from_millis(self.now_ms().saturating_sub(started - 1)) >= limit,
        }
    }
}

struct InFlight(Arc<Activity>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Socket wrapper reporting every read to the connection's [`Activity`].
struct Tracked<T> {
    inner: T,
    activity: Arc<Activity>,
}

impl<T: AsyncRead + Unpin> AsyncRead for Tracked<T> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let polled = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = polled {
            let read = &buf.filled()[before..];
            if !read.is_empty() {
                this.activity.on_read(read);
            }
        }
        polled
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for Tracked<T> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

//! Shared utilities for control server integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use control_plane::config::ControlConfig;
use control_plane::control::{ControlServer, EndpointResult, Endpoints};
use control_plane::net::ListenRetry;
use tempfile::TempDir;
use tokio::sync::Notify;
use tracing::Span;

/// A control config pointing into a fresh temporary directory.
pub fn socket_config() -> (TempDir, ControlConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = ControlConfig::with_socket(dir.path().join("control.sock"));
    (dir, config)
}

/// A server with a short retry interval so tests do not wait seconds.
pub fn fast_server(config: &ControlConfig) -> ControlServer {
    ControlServer::new(Some(config), Span::none())
        .unwrap()
        .with_listen_retry(ListenRetry::new(10, Duration::from_millis(100)))
}

/// Endpoints whose reload handler never finishes (or finishes after a delay).
#[allow(dead_code)]
pub struct SlowReload {
    /// Notified once the reload handler has been entered.
    pub entered: Notify,
    /// `None` stalls forever.
    pub delay: Option<Duration>,
}

#[allow(dead_code)]
impl SlowReload {
    pub fn stalled() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            delay: None,
        })
    }

    pub fn delayed(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            delay: Some(delay),
        })
    }
}

#[async_trait]
impl Endpoints for SlowReload {
    async fn put_environ(&self, _body: Bytes) -> EndpointResult {
        Ok(StatusCode::OK)
    }

    async fn post_reload(&self, _body: Bytes) -> EndpointResult {
        self.entered.notify_one();
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
        Ok(StatusCode::OK)
    }

    async fn post_metric(&self, _body: Bytes) -> EndpointResult {
        Ok(StatusCode::OK)
    }

    async fn post_enable_maintenance(&self, _body: Bytes) -> EndpointResult {
        Ok(StatusCode::OK)
    }

    async fn post_disable_maintenance(&self, _body: Bytes) -> EndpointResult {
        Ok(StatusCode::OK)
    }
}

//! Client for the control socket.
//!
//! Speaks HTTP/1.1 over the Unix socket, one request per connection, the same
//! way the server expects to be talked to.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::control::routes::Endpoint;

/// Largest response body the client will buffer.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to control socket {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("failed to read response: {0}")]
    Body(#[from] axum::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("control server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Client bound to one control socket path.
#[derive(Debug, Clone)]
pub struct ControlClient {
    socket: PathBuf,
}

impl ControlClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Merge variables into the supervisor environment.
    pub async fn put_environ(&self, vars: &HashMap<String, String>) -> Result<(), ClientError> {
        self.post_json(Endpoint::Environ, vars).await
    }

    /// Ask the supervisor to reload its configuration.
    pub async fn reload(&self) -> Result<(), ClientError> {
        self.post(Endpoint::Reload, Body::empty()).await
    }

    /// Push metric samples.
    pub async fn put_metric(&self, metrics: &BTreeMap<String, serde_json::Value>) -> Result<(), ClientError> {
        self.post_json(Endpoint::Metric, metrics).await
    }

    /// Enter (`true`) or leave (`false`) maintenance mode.
    pub async fn set_maintenance(&self, enabled: bool) -> Result<(), ClientError> {
        let endpoint = if enabled {
            Endpoint::MaintenanceEnable
        } else {
            Endpoint::MaintenanceDisable
        };
        self.post(endpoint, Body::empty()).await
    }

    /// Send a raw request and return status and body, whatever the status.
    pub async fn request(&self, method: Method, path: &str, body: Body) -> Result<(StatusCode, Bytes), ClientError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| ClientError::Connect {
                path: self.socket.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Body>(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "control client: connection error");
            }
        });

        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, "control")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)?;

        let response = sender.send_request(request).await?;
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(Body::new(body), MAX_RESPONSE_BYTES).await?;
        Ok((parts.status, bytes))
    }

    async fn post_json<T: Serialize + ?Sized>(&self, endpoint: Endpoint, value: &T) -> Result<(), ClientError> {
        let body = serde_json::to_vec(value)?;
        self.post(endpoint, Body::from(body)).await
    }

    async fn post(&self, endpoint: Endpoint, body: Body) -> Result<(), ClientError> {
        let (status, body) = self.request(Method::POST, endpoint.path(), body).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }
}

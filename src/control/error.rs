//! Control server error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced by the control server lifecycle.
#[derive(Debug, Error)]
pub enum ControlError {
    /// No `[control]` configuration was supplied.
    #[error("control server not loading due to missing config")]
    ConfigMissing,

    /// `start` was called on a server that is already serving.
    #[error("control server is already serving at {}", .0.display())]
    AlreadyStarted(PathBuf),

    /// Every attempt to bind the control socket failed. The owning process
    /// must not keep running without its control plane.
    #[error("error listening to socket at {} after {attempts} attempts: {source}", .path.display())]
    ListenExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// In-flight requests did not drain before the shutdown deadline.
    #[error("failed to gracefully shutdown control server within {0:?}")]
    ShutdownTimeout(Duration),

    /// The event loop task panicked or was cancelled.
    #[error("control event loop aborted: {0}")]
    EventLoopAborted(#[from] tokio::task::JoinError),
}

impl ControlError {
    /// Whether the owning process should exit on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ControlError::ConfigMissing | ControlError::ListenExhausted { .. })
    }
}

/// Errors returned by endpoint handlers, rendered as HTTP responses.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The request body is larger than the endpoint will read.
    #[error("request body exceeds {0} bytes")]
    TooLarge(usize),

    /// The request body is not the JSON the endpoint expects.
    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The handler failed for another reason.
    #[error("{0}")]
    Internal(String),
}

impl EndpointError {
    pub fn status(&self) -> StatusCode {
        match self {
            EndpointError::Body(_) => StatusCode::BAD_REQUEST,
            EndpointError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            EndpointError::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EndpointError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

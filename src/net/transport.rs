//! HTTP/1.1 serving over a bound Unix socket.
//!
//! # Responsibilities
//! - Accept connections and hand each one to the control router
//! - Close every connection after its response (no keep-alive)
//! - Stop accepting on request and drain in-flight requests within a deadline
//!
//! # Design Decisions
//! - The accept loop runs on its own task so serving never blocks the caller
//! - Connection tasks live in a JoinSet owned by that task; aborting it on a
//!   missed deadline drops every connection still open

use std::time::Duration;

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, Span};

use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};

/// The drain did not complete before its deadline.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("in-flight requests did not drain within {0:?}")]
pub struct DrainTimeout(pub Duration);

/// Handle to a running accept loop.
#[derive(Debug)]
pub struct Transport {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl Transport {
    /// Start serving `router` on `listener` in the background; the accept
    /// loop logs inside `span`.
    pub fn serve(listener: UnixListener, router: Router, span: Span) -> Self {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        let task = tokio::spawn(accept_loop(listener, router, signal).instrument(span));
        Self { shutdown, task }
    }

    /// Whether the accept loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting and wait up to `timeout` for in-flight requests.
    ///
    /// On timeout the remaining connections are dropped and
    /// [`DrainTimeout`] is returned.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), DrainTimeout> {
        self.shutdown.trigger();

        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "control: accept loop ended abnormally");
                Ok(())
            }
            Err(_) => {
                task.abort();
                Err(DrainTimeout(timeout))
            }
        }
    }
}

async fn accept_loop(listener: UnixListener, router: Router, mut signal: ShutdownSignal) {
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        tracing::warn!(error = %e, "control: accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                };

                let service = TowerToHyperService::new(router.clone());
                let conn = http1::Builder::new()
                    .keep_alive(false)
                    .serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn);

                connections.spawn(
                    async move {
                        if let Err(e) = conn.await {
                            tracing::debug!(error = %e, "control: connection closed with error");
                        }
                    }
                    .in_current_span(),
                );
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = signal.wait() => break,
        }
    }

    // Stop accepting before waiting on the stragglers.
    drop(listener);
    tracing::debug!(in_flight = connections.len(), "control: draining connections");
    graceful.shutdown().await;
    while connections.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;

    #[tokio::test]
    async fn test_idle_transport_drains_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let listener = UnixListener::bind(dir.path().join("t.sock")).unwrap();
        let transport = Transport::serve(listener, Router::new().route("/", post(|| async { "ok" })), Span::none());

        assert!(!transport.is_finished());
        transport.shutdown(Duration::from_millis(600)).await.unwrap();
    }
}

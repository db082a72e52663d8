//! Control server lifecycle.
//!
//! # Responsibilities
//! - Subscribe to the supervisor bus and watch for terminal events
//! - Acquire the control socket, tolerating a previous instance still
//!   releasing it
//! - Serve the control router until a terminal event arrives
//! - Tear down within a short deadline so a reload request cannot stall
//!   its own reload
//!
//! # State Machine
//! ```text
//! new() ──► run(bus) ──► start() ──► event loop ──► stop()
//!  │          │            │            │             │
//!  │          subscribe    bind+serve   Running       drain (bounded)
//!  queue                                  │           remove socket
//!  allocated              terminal event ─┘           unsubscribe
//!                                                     close queue
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Span;

use crate::config::ControlConfig;
use crate::control::endpoints::{BusEndpoints, Endpoints};
use crate::control::error::ControlError;
use crate::control::routes::build_router;
use crate::events::{Event, EventBus, SubscriptionId};
use crate::net::listener::{bind_unix, ListenRetry, ListenerError};
use crate::net::transport::Transport;

/// Capacity of the inbound event queue.
pub const INBOX_CAPACITY: usize = 10;

/// Deadline for draining in-flight requests on stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(600);

/// HTTP control plane served on a Unix domain socket.
pub struct ControlServer {
    addr: PathBuf,
    inbox: mpsc::Receiver<Event>,
    inbox_tx: Option<mpsc::Sender<Event>>,
    bus: Option<EventBus>,
    subscription: Option<SubscriptionId>,
    transport: Option<Transport>,
    endpoints: Option<Arc<dyn Endpoints>>,
    listen_retry: ListenRetry,
    shutdown_timeout: Duration,
    log: Span,
}

impl ControlServer {
    /// Create a server for the configured socket path.
    ///
    /// Allocates the inbound queue only; the socket is not touched until
    /// [`ControlServer::start`].
    pub fn new(config: Option<&ControlConfig>, log: Span) -> Result<Self, ControlError> {
        let config = config.ok_or(ControlError::ConfigMissing)?;
        let (inbox_tx, inbox) = mpsc::channel(INBOX_CAPACITY);

        Ok(Self {
            addr: config.socket.clone(),
            inbox,
            inbox_tx: Some(inbox_tx),
            bus: None,
            subscription: None,
            transport: None,
            endpoints: None,
            listen_retry: ListenRetry::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            log,
        })
    }

    /// Serve these handlers instead of [`BusEndpoints`].
    pub fn with_endpoints(mut self, endpoints: Arc<dyn Endpoints>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Override the socket bind retry budget.
    pub fn with_listen_retry(mut self, retry: ListenRetry) -> Self {
        self.listen_retry = retry;
        self
    }

    /// Override the drain deadline used by [`ControlServer::stop`].
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Socket path this server binds.
    pub fn addr(&self) -> &Path {
        &self.addr
    }

    /// Whether the server currently holds its socket.
    pub fn is_serving(&self) -> bool {
        self.transport.is_some()
    }

    /// Subscribe to `bus`, start serving and hand the server to its event
    /// loop. The loop stops the server on the first terminal event.
    pub async fn run(mut self, bus: &EventBus) -> Result<RunningServer, ControlError> {
        if let Some(tx) = self.inbox_tx.take() {
            self.subscription = Some(bus.subscribe(tx));
        }
        self.bus = Some(bus.clone());

        if let Err(e) = self.start().await {
            if let Some(id) = self.subscription.take() {
                bus.unsubscribe(id);
            }
            return Err(e);
        }

        let addr = self.addr.clone();
        let task = tokio::spawn(self.event_loop());
        Ok(RunningServer { addr, task })
    }

    /// Build the route table, acquire the socket and serve in the
    /// background. Returns as soon as the listener is bound.
    pub async fn start(&mut self) -> Result<(), ControlError> {
        if self.transport.is_some() {
            return Err(ControlError::AlreadyStarted(self.addr.clone()));
        }

        let endpoints = match &self.endpoints {
            Some(endpoints) => endpoints.clone(),
            None => {
                let bus = self.bus.clone().unwrap_or_else(|| {
                    tracing::debug!(parent: &self.log, "control: no bus attached, endpoint events go nowhere");
                    EventBus::new()
                });
                Arc::new(BusEndpoints::new(bus))
            }
        };
        let router = build_router(endpoints);
        tracing::debug!(parent: &self.log, "control: initialized router for control server");

        let acquired = bind_unix(&self.addr, self.listen_retry)
            .await
            .map_err(|e| match e {
                ListenerError::Exhausted { attempts, source } => ControlError::ListenExhausted {
                    path: self.addr.clone(),
                    attempts,
                    source,
                },
            })?;
        if acquired.attempt > 1 {
            tracing::debug!(
                parent: &self.log,
                attempts = acquired.attempt,
                "control: socket released by previous holder"
            );
        }

        tracing::info!(parent: &self.log, socket = %self.addr.display(), "control: serving");
        self.transport = Some(Transport::serve(acquired.value, router, self.log.clone()));
        Ok(())
    }

    /// Shut the server down.
    ///
    /// Draining is bounded by the shutdown timeout; whatever happens there,
    /// the socket file is removed, the bus subscription dropped and the
    /// inbound queue closed. Consumes the server: it cannot be restarted.
    pub async fn stop(mut self) -> Result<(), ControlError> {
        tracing::debug!(parent: &self.log, "control: stopping control server");

        let mut drained = Ok(());
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.shutdown(self.shutdown_timeout).await {
                tracing::warn!(parent: &self.log, error = %e, "control: failed to gracefully shutdown control server");
                drained = Err(ControlError::ShutdownTimeout(e.0));
            }

            // Only a server that bound the path may remove it.
            if let Err(e) = tokio::fs::remove_file(&self.addr).await {
                tracing::debug!(parent: &self.log, error = %e, "control: could not remove socket file");
            }
        }

        if let (Some(bus), Some(id)) = (self.bus.take(), self.subscription.take()) {
            bus.unsubscribe(id);
        }
        self.inbox.close();

        if drained.is_ok() {
            tracing::debug!(parent: &self.log, "control: completed graceful shutdown of control server");
        }
        drained
    }

    // The server's own bus handle keeps its queue registered, so only a
    // terminal event ends the loop.
    async fn event_loop(mut self) -> Result<(), ControlError> {
        while let Some(event) = self.inbox.recv().await {
            match event {
                Event::QuitByClose | Event::GlobalShutdown => {
                    tracing::debug!(parent: &self.log, event = %event, "control: terminal event received");
                    break;
                }
                _ => {}
            }
        }
        self.stop().await
    }
}

impl std::fmt::Debug for ControlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlServer")
            .field("addr", &self.addr)
            .field("serving", &self.is_serving())
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// A server whose event loop is running.
#[derive(Debug)]
pub struct RunningServer {
    addr: PathBuf,
    task: JoinHandle<Result<(), ControlError>>,
}

impl RunningServer {
    pub fn addr(&self) -> &Path {
        &self.addr
    }

    /// Whether the event loop has stopped the server.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the event loop to stop the server; yields the result of
    /// the stop.
    pub async fn wait(self) -> Result<(), ControlError> {
        self.task.await?
    }
}

//! Control plane subsystem.
//!
//! # Data Flow
//! ```text
//! Unix socket request
//!     → routes.rs (fixed table, POST-only adapter, 405 otherwise)
//!     → endpoints.rs (Endpoints trait; BusEndpoints publishes events)
//!     → supervisor bus
//!
//! Supervisor bus
//!     → server.rs inbound queue (capacity 10)
//!     → event loop: GlobalShutdown / QuitByClose → stop
//! ```
//!
//! # Design Decisions
//! - The server owns its transport as a field; no transport API leaks out
//! - `stop` consumes the server, so it runs at most once per instance
//! - Listener exhaustion is an error value; the binary decides to exit

pub mod endpoints;
pub mod error;
pub mod routes;
pub mod server;

pub use endpoints::{BusEndpoints, EndpointResult, Endpoints, Environ};
pub use error::{ControlError, EndpointError};
pub use routes::{build_router, Endpoint};
pub use server::{ControlServer, RunningServer, DEFAULT_SHUTDOWN_TIMEOUT, INBOX_CAPACITY};

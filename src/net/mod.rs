//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured socket path
//!     → listener.rs (bind with fixed retry budget)
//!     → transport.rs (accept loop, one HTTP/1.1 request per connection)
//!     → control router
//!
//! Transport States:
//!     Serving → Draining → Closed (or Abandoned after the drain deadline)
//! ```
//!
//! # Design Decisions
//! - The socket path is the one exclusive resource; a previous instance may
//!   still hold it during a reload
//! - Keep-alive disabled: every control request closes its connection
//! - Every connection task is owned by the transport so abandoning it on
//!   timeout tears the connections down with it

pub mod listener;
pub mod transport;

pub use listener::{bind_unix, ListenRetry, ListenerError};
pub use transport::{DrainTimeout, Transport};

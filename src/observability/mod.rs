//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Control server, bus, endpoints:
//!     → tracing events inside the server's injected span
//!     → logging.rs (subscriber installed by the binary)
//!     → stdout / stderr (text, compact or JSON)
//!
//! Control requests:
//!     → tower-http TraceLayer spans around every request
//! ```

pub mod logging;

pub use logging::init_logging;

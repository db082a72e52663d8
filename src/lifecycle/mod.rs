//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     owner triggers → background tasks stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     one forwarder per process → SignalRouter → current generation's bus
//!     SIGTERM/SIGINT → GlobalShutdown on the bus (second one forces exit)
//!     SIGHUP → reload flag + GlobalShutdown on the bus
//! ```
//!
//! # Design Decisions
//! - Shutdown is a sticky flag: late subscribers still observe it
//! - Signals never stop subsystems directly; they go through the bus

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{forward_signals, SignalAction, SignalRouter};

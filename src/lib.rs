//! Supervisor control plane library.
//!
//! An HTTP control API on a Unix domain socket whose lifecycle is driven by
//! the supervisor's event bus.

pub mod client;
pub mod config;
pub mod control;
pub mod events;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::{ControlConfig, SupervisorConfig};
pub use control::{ControlError, ControlServer, RunningServer};
pub use events::{Event, EventBus};

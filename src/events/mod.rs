//! Supervisor event bus.
//!
//! # Data Flow
//! ```text
//! Publishers (signals, control endpoints, jobs)
//!     → bus.rs (fan-out to every subscriber queue)
//!     → bounded mpsc queue per subscriber
//!     → subscriber event loop (filters on event kind)
//! ```
//!
//! # Design Decisions
//! - Subscribers own their queue; the bus only keeps the sending half
//! - Bounded queues turn slow subscribers into publisher backpressure
//! - Event kinds are a closed enum matched exhaustively

pub mod bus;
pub mod event;

pub use bus::{EventBus, SubscriptionId};
pub use event::{Event, MetricSample};

//! Event kinds carried by the supervisor bus.

use std::fmt;

/// A single metric observation pushed through the control API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    /// Metric name as registered by the supervisor.
    pub name: String,
    /// Rendered value (numbers and booleans keep their JSON text form).
    pub value: String,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.value)
    }
}

/// Events published on the supervisor bus.
///
/// The set is closed: subscribers match on the variants they care about and
/// fold everything else into a default arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The supervisor finished starting its subsystems.
    GlobalStartup,
    /// The supervisor is shutting down (or reloading).
    GlobalShutdown,
    /// The bus is being closed underneath its subscribers.
    QuitByClose,
    /// Maintenance mode was requested.
    EnterMaintenance,
    /// Maintenance mode was lifted.
    ExitMaintenance,
    /// A metric sample was ingested.
    Metric(MetricSample),
    /// An OS signal was received by the supervisor.
    Signal(String),
}

impl Event {
    /// Whether receipt of this event must end a subscriber's event loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::QuitByClose | Event::GlobalShutdown)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::GlobalStartup => f.write_str("global-startup"),
            Event::GlobalShutdown => f.write_str("global-shutdown"),
            Event::QuitByClose => f.write_str("quit-by-close"),
            Event::EnterMaintenance => f.write_str("enter-maintenance"),
            Event::ExitMaintenance => f.write_str("exit-maintenance"),
            Event::Metric(sample) => write!(f, "metric({})", sample),
            Event::Signal(name) => write!(f, "signal({})", name),
        }
    }
}

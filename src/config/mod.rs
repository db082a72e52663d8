//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SupervisorConfig (validated, immutable)
//!
//! On reload:
//!     control endpoint sets the bus reload flag and shuts the bus down
//!     → supervisor loop loads the file again
//!     → a fresh ControlServer is built from the new [control] table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A missing [control] table is kept as None, not defaulted

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ControlConfig, LogFormat, LogOutput, LoggingConfig, SupervisorConfig};
pub use validation::ValidationError;

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the control socket path is usable as a Unix socket address
//! - Check logging settings are recognised
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SupervisorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::os::unix::ffi::OsStrExt;

use thiserror::Error;

use crate::config::schema::SupervisorConfig;

/// Longest path accepted in `sockaddr_un.sun_path`, excluding the NUL.
pub const MAX_SOCKET_PATH_LEN: usize = 107;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("control.socket must not be empty")]
    EmptySocketPath,

    #[error("control.socket must not contain a NUL byte")]
    NulInSocketPath,

    #[error("control.socket is {len} bytes, the limit is {max}")]
    SocketPathTooLong { len: usize, max: usize },

    #[error("logging.level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(control) = &config.control {
        let raw = control.socket.as_os_str().as_bytes();
        if raw.is_empty() {
            errors.push(ValidationError::EmptySocketPath);
        }
        if raw.contains(&0) {
            errors.push(ValidationError::NulInSocketPath);
        }
        if raw.len() > MAX_SOCKET_PATH_LEN {
            errors.push(ValidationError::SocketPathTooLong {
                len: raw.len(),
                max: MAX_SOCKET_PATH_LEN,
            });
        }
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

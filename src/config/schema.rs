//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. Every table has defaults except `[control]`, whose absence means the
//! supervisor runs without a control plane configured.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default location of the control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/control-plane.socket";

/// Root configuration for the supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Control plane settings. `None` when the table is missing.
    pub control: Option<ControlConfig>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Control plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Filesystem path of the Unix domain socket to serve on.
    pub socket: PathBuf,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

impl ControlConfig {
    /// Config pointing at a specific socket path.
    pub fn with_socket(path: impl Into<PathBuf>) -> Self {
        Self {
            socket: path.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, multi-field lines.
    #[default]
    Text,
    /// Abbreviated single-line output.
    Compact,
    /// One JSON object per line.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Output stream.
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stdout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_control_table() {
        let config: SupervisorConfig = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert!(config.control.is_none());
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_empty_control_table_uses_default_socket() {
        let config: SupervisorConfig = toml::from_str("[control]\n").unwrap();
        let control = config.control.unwrap();
        assert_eq!(control.socket, PathBuf::from(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            [control]
            socket = "/tmp/cp.sock"

            [logging]
            level = "warn"
            format = "json"
            output = "stderr"
        "#;
        let config: SupervisorConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.control.unwrap().socket, PathBuf::from("/tmp/cp.sock"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.output, LogOutput::Stderr);
    }
}

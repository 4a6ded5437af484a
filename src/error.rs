//! Error types for the client core.
//!
//! Only configuration faults are fatal. Transport faults drive reconnection,
//! send faults are reported back to the caller, and input faults end up as
//! System messages in the active window.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup errors: the client does not attempt to connect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no WebSocket endpoint configured")]
    MissingEndpoint,

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("no default channel configured")]
    MissingChannel,

    #[error("invalid channel name {name:?}: {reason}")]
    InvalidChannel { name: String, reason: String },

    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine a configuration directory")]
    NoConfigDir,
}

/// Faults raised by the WebSocket transport. None of them are fatal.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("connection timed out")]
    Timeout,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A send attempted while the session cannot carry it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,
}

/// User input faults. The `Display` text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid nickname")]
    InvalidNickname(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("You must specify a channel to part from")]
    PartWithoutChannel,

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl ConfigError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingEndpoint => "missing_endpoint",
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::MissingChannel => "missing_channel",
            Self::InvalidChannel { .. } => "invalid_channel",
            Self::ZeroLimit { .. } => "zero_limit",
            Self::Read { .. } => "read_error",
            Self::Parse { .. } => "parse_error",
            Self::NoConfigDir => "no_config_dir",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_messages() {
        assert_eq!(
            InputError::UnknownCommand("foo".into()).to_string(),
            "Unknown command: foo"
        );
        assert_eq!(
            InputError::InvalidNickname("bad nick".into()).to_string(),
            "Invalid nickname"
        );
        assert_eq!(
            InputError::Usage("/join <channel>").to_string(),
            "Usage: /join <channel>"
        );
    }

    #[test]
    fn test_config_error_codes() {
        assert_eq!(ConfigError::MissingEndpoint.error_code(), "missing_endpoint");
        assert_eq!(
            ConfigError::ZeroLimit { field: "message_limit" }.to_string(),
            "message_limit must be greater than zero"
        );
    }
}

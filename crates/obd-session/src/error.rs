//! Session Error Types

use obd_protocol::ObdError;
use thiserror::Error;

/// Failures surfaced by session operations
///
/// These never escape a command; they end up in session state, the session
/// log and notifications.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Session is not set up for the requested operation (e.g. no port)
    #[error("{0}")]
    Configuration(String),

    /// Serial or adapter I/O failure
    #[error("{0}")]
    Transport(String),

    /// Adapter reachable but the vehicle is not responding as expected
    #[error("{0}")]
    Protocol(String),

    /// User input rejected before touching the vehicle
    #[error("{0}")]
    Validation(String),
}

impl SessionError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Configuration(_) => "configuration",
            SessionError::Transport(_) => "transport",
            SessionError::Protocol(_) => "protocol",
            SessionError::Validation(_) => "validation",
        }
    }
}

impl From<ObdError> for SessionError {
    fn from(err: ObdError) -> Self {
        match err {
            ObdError::SerialError(detail) => SessionError::Transport(format!(
                "Serial Port Error: {}. Ensure adapter is connected and port is correct.",
                detail
            )),
            other => SessionError::Transport(other.to_string()),
        }
    }
}

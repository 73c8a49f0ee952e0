//! OBD-II Error Types

use crate::command::Command;
use thiserror::Error;

/// Errors raised by an adapter library or by port enumeration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObdError {
    /// Serial port could not be opened or failed mid-transfer
    #[error("{0}")]
    SerialError(String),

    /// Timeout waiting for the adapter
    #[error("Timeout waiting for OBD response after {0}ms")]
    Timeout(u64),

    /// Command not supported by the adapter or vehicle
    #[error("Command {0} not supported by vehicle")]
    Unsupported(Command),

    /// Adapter not responding
    #[error("OBD adapter not responding")]
    AdapterNotResponding,

    /// Connection has already been closed
    #[error("OBD connection is closed")]
    Closed,
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}

impl From<tokio_serial::Error> for ObdError {
    fn from(err: tokio_serial::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}

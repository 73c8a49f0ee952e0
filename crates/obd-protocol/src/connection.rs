//! Adapter Connection Traits
//!
//! Adapter libraries are blocking: every method may sit on serial I/O for
//! seconds. Callers are expected to run them on a blocking thread pool.

use crate::command::Command;
use crate::error::ObdError;
use crate::response::Response;
use crate::status::ObdStatus;
use std::sync::Arc;

/// Callback invoked by the adapter's reader thread for every watched sample
///
/// Samples for different commands arrive in no particular order.
pub type SampleCallback = Arc<dyn Fn(Response) + Send + Sync>;

/// An open connection to an OBD-II adapter
pub trait ObdConnection: Send + Sync {
    /// Current link status
    fn status(&self) -> ObdStatus;

    /// Issue a single command and wait for the decoded response
    fn query(&self, command: Command) -> Result<Response, ObdError>;

    /// Monitor a command continuously, optionally delivering samples to `callback`
    fn watch(&self, command: Command, callback: Option<SampleCallback>) -> Result<(), ObdError>;

    /// Stop monitoring every watched command
    fn unwatch_all(&self) -> Result<(), ObdError>;

    /// Start the background reader that services watched commands
    fn start(&self) -> Result<(), ObdError>;

    /// Stop the background reader
    fn stop(&self) -> Result<(), ObdError>;

    /// Close the serial link; the connection is unusable afterwards
    fn close(&self) -> Result<(), ObdError>;
}

/// Opens connections on a serial device
pub trait Connector: Send + Sync {
    /// Open the adapter on `port` (e.g. `/dev/ttyUSB0` or `COM3`)
    fn open(&self, port: &str) -> Result<Arc<dyn ObdConnection>, ObdError>;
}

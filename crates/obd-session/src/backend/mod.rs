//! Vehicle backends
//!
//! A session talks to the vehicle through a [`VehicleBackend`], chosen once
//! per connect attempt: [`SimulatedBackend`] for mock mode, or
//! [`TransportBackend`] over a real adapter library. A successful connect
//! yields a [`VehicleLink`], the adapter handle the session owns until
//! disconnect.

mod simulated;
mod transport;

pub use simulated::{SimulatedBackend, MOCK_VIN};
pub use transport::TransportBackend;

use crate::error::SessionError;
use crate::state::{Dtc, LiveData};
use async_trait::async_trait;
use obd_protocol::{Command, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which kind of vehicle a backend talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Simulated,
    Transport,
}

impl BackendMode {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Simulated => "simulated",
            BackendMode::Transport => "transport",
        }
    }
}

/// Result of a successful connect
pub struct Connected {
    /// Handle for the rest of the connection
    pub link: Arc<dyn VehicleLink>,
    /// Vehicle identification number, `N/A` when unavailable
    pub vin: String,
    /// Telemetry known at connect time
    pub live_data: LiveData,
}

/// Adapter acknowledgement of a clear request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearOutcome {
    /// The adapter confirmed the codes were cleared
    pub confirmed: bool,
    /// Raw response, for the session log
    pub detail: String,
}

/// Opens links to a vehicle
#[async_trait]
pub trait VehicleBackend: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Connect through `port`; partially opened handles are released on error
    async fn connect(&self, port: &str) -> Result<Connected, SessionError>;
}

/// An open connection to a vehicle
#[async_trait]
pub trait VehicleLink: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Stored trouble codes; `None` when the adapter returned nothing
    async fn read_dtcs(&self) -> Result<Option<Vec<Dtc>>, SessionError>;

    /// Clear stored trouble codes
    async fn clear_dtcs(&self) -> Result<ClearOutcome, SessionError>;

    /// Stream samples of `command` into `sink` until `unwatch_all`
    async fn watch(&self, command: Command, sink: mpsc::Sender<Response>) -> Result<(), SessionError>;

    /// Stop every stream started with `watch`
    async fn unwatch_all(&self) -> Result<(), SessionError>;

    /// Stop and close the adapter; failures are logged, not returned
    async fn close(&self);
}

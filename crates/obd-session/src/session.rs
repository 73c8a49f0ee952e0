//! Diagnostic Session
//!
//! [`Session`] is the single owner of the dashboard state and of the
//! adapter handle. Commands are spread over the lifecycle, diagnostics and
//! telemetry modules; this file holds construction and the plain setters.

use crate::backend::{SimulatedBackend, TransportBackend, VehicleBackend, VehicleLink};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::live::LiveWatcher;
use crate::notify::{Notification, NotificationLevel};
use crate::state::SessionState;
use obd_protocol::{Connector, PortLister};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Resources tied to the current connection
///
/// Locked before the state whenever both are needed.
#[derive(Default)]
pub(crate) struct Handles {
    pub(crate) link: Option<Arc<dyn VehicleLink>>,
    pub(crate) watcher: Option<LiveWatcher>,
    /// Connect epoch of the attempt that may still own an adapter
    pub(crate) pending: Option<u64>,
}

/// One dashboard session against at most one vehicle
pub struct Session {
    id: Uuid,
    pub(crate) config: SessionConfig,
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) handles: Mutex<Handles>,
    pub(crate) ports: Arc<dyn PortLister>,
    simulated: SimulatedBackend,
    transport: Option<TransportBackend>,
}

impl Session {
    /// Create a session discovering ports through `ports`
    ///
    /// Real mode additionally needs [`Session::with_transport`].
    pub fn new(config: SessionConfig, ports: Arc<dyn PortLister>) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, mock = config.use_mock_mode, "Session created");
        Self {
            id,
            state: Arc::new(Mutex::new(SessionState::new(config.use_mock_mode))),
            handles: Mutex::new(Handles::default()),
            ports,
            simulated: SimulatedBackend::new(&config),
            transport: None,
            config,
        }
    }

    /// Attach the adapter library used in real mode
    pub fn with_transport(mut self, connector: Arc<dyn Connector>) -> Self {
        self.transport = Some(TransportBackend::new(connector, &self.config));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether real mode is available
    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Read-only copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn set_selected_port(&self, port: impl Into<String>) {
        self.state.lock().selected_port = port.into();
    }

    /// Switch between the simulated vehicle and the adapter
    ///
    /// Only allowed while no connection is open or being opened.
    pub fn set_mock_mode(&self, enabled: bool) -> Result<(), SessionError> {
        if !enabled && self.transport.is_none() {
            return Err(SessionError::Configuration(
                "No adapter transport configured; real mode is unavailable.".to_string(),
            ));
        }
        let mut state = self.state.lock();
        if !state.can_connect() {
            return Err(SessionError::Validation(
                "Mock mode can only be changed while disconnected.".to_string(),
            ));
        }
        if state.use_mock_mode != enabled {
            state.use_mock_mode = enabled;
            state
                .session_log
                .info(if enabled { "Mock mode enabled." } else { "Mock mode disabled." });
        }
        Ok(())
    }

    pub(crate) fn notify(&self, level: NotificationLevel, message: impl Into<String>) -> Notification {
        Notification::new(level, message, self.config.notification_duration_ms)
    }

    /// Backend for the requested mode
    pub(crate) fn backend(&self, use_mock_mode: bool) -> Result<&dyn VehicleBackend, SessionError> {
        if use_mock_mode {
            return Ok(&self.simulated as &dyn VehicleBackend);
        }
        match &self.transport {
            Some(transport) => Ok(transport as &dyn VehicleBackend),
            None => Err(SessionError::Configuration(
                "No adapter transport configured for real mode.".to_string(),
            )),
        }
    }
}

//! Connection Lifecycle
//!
//! Port discovery and the `NOT_CONNECTED -> CONNECTING -> CONNECTED | ERROR`
//! state machine. Every connect attempt and every disconnect bumps the
//! connect epoch; a connect only commits if nothing bumped it meanwhile.

use crate::backend::{BackendMode, Connected};
use crate::error::SessionError;
use crate::guard::StateReset;
use crate::session::{Handles, Session};
use crate::state::ConnectionStatus;
use metrics::counter;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Marks a connect attempt as in flight until it is dropped
///
/// Held until the attempt has either committed its link or released the
/// adapter, so a superseded attempt blocks new ones while it winds down.
struct PendingAttempt<'a> {
    handles: &'a Mutex<Handles>,
    epoch: u64,
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        let mut handles = self.handles.lock();
        if handles.pending == Some(self.epoch) {
            handles.pending = None;
        }
    }
}

impl Session {
    /// Refresh the list of serial ports
    pub async fn scan_ports(&self) {
        {
            let mut state = self.state.lock();
            state.is_scanning_ports = true;
            state.available_ports.clear();
            state.session_log.info("Scanning for available serial ports...");
        }
        let _busy = StateReset::new(&self.state, |s| s.is_scanning_ports = false);

        let lister = self.ports.clone();
        let result = match tokio::task::spawn_blocking(move || lister.list_ports()).await {
            Ok(listed) => listed.map_err(|e| e.to_string()),
            Err(join) => Err(join.to_string()),
        };

        let mut state = self.state.lock();
        match result {
            Ok(ports) => {
                let devices: Vec<String> = ports.into_iter().map(|p| p.device).collect();
                if devices.is_empty() {
                    state.session_log.info("No serial ports found.");
                } else {
                    state
                        .session_log
                        .info(format!("Found ports: {}", devices.join(", ")));
                }
                if !devices.contains(&state.selected_port) {
                    state.selected_port = devices.first().cloned().unwrap_or_default();
                }
                state.available_ports = devices;
            }
            Err(e) => {
                warn!("Port scan failed: {}", e);
                let message = format!("Error scanning ports: {}", e);
                state.connection_error = message.clone();
                state.session_log.error(message);
            }
        }
    }

    /// Connect to the vehicle on the selected port
    ///
    /// Does nothing while connected, while another attempt is running, or
    /// while a superseded attempt is still releasing its adapter.
    pub async fn connect(&self) {
        let (port, use_mock_mode, epoch) = {
            let mut handles = self.handles.lock();
            let mut state = self.state.lock();
            if !state.can_connect() {
                debug!("Connect ignored while {}", state.connection_status);
                return;
            }
            if let Some(previous) = handles.pending {
                debug!("Connect ignored while attempt {} releases the adapter", previous);
                state
                    .session_log
                    .info("Previous connection attempt is still releasing the adapter.");
                return;
            }
            state.connection_status = ConnectionStatus::Connecting;
            state.connection_error.clear();
            state.connect_epoch += 1;
            handles.pending = Some(state.connect_epoch);
            let port = state.selected_port.clone();
            state
                .session_log
                .info(format!("Attempting to connect to {}...", port));
            (port, state.use_mock_mode, state.connect_epoch)
        };
        let _pending = PendingAttempt {
            handles: &self.handles,
            epoch,
        };

        if port.is_empty() {
            self.fail_connect(epoch, SessionError::Configuration("No port selected.".to_string()));
            return;
        }

        let backend = match self.backend(use_mock_mode) {
            Ok(backend) => backend,
            Err(e) => {
                self.fail_connect(epoch, e);
                return;
            }
        };
        counter!("obd_connect_attempts_total", "mode" => backend.mode().as_str()).increment(1);
        info!(session = %self.id(), port = %port, mode = backend.mode().as_str(), "Connecting");

        match backend.connect(&port).await {
            Ok(connected) => self.commit_connection(epoch, &port, connected).await,
            Err(e) => self.fail_connect(epoch, e),
        }
    }

    async fn commit_connection(&self, epoch: u64, port: &str, connected: Connected) {
        let Connected {
            link,
            vin,
            live_data,
        } = connected;

        let superseded = {
            let mut handles = self.handles.lock();
            let mut state = self.state.lock();
            if state.connect_epoch != epoch {
                true
            } else {
                handles.link = Some(link.clone());
                state.connection_status = ConnectionStatus::Connected;
                state.vin = vin.clone();
                state.live_data = live_data;
                match link.mode() {
                    BackendMode::Simulated => state.session_log.info("Connected in mock mode."),
                    BackendMode::Transport => state.session_log.info(format!(
                        "Successfully connected to vehicle. VIN: {}",
                        vin
                    )),
                }
                false
            }
        };

        if superseded {
            link.close().await;
            self.state.lock().session_log.info(format!(
                "Connect attempt to {} superseded; adapter released.",
                port
            ));
        } else {
            info!(session = %self.id(), vin = %vin, "Connected");
        }
    }

    fn fail_connect(&self, epoch: u64, err: SessionError) {
        counter!("obd_connect_failures_total", "kind" => err.kind()).increment(1);
        let mut state = self.state.lock();
        if state.connect_epoch != epoch {
            debug!("Dropping failure of superseded connect: {}", err);
            return;
        }
        state.connection_status = ConnectionStatus::Error;
        state.connection_error = err.to_string();
        state.session_log.error(&err);
    }

    /// Close the connection and forget everything tied to it
    ///
    /// Safe to call in any state; an in-flight connect is superseded.
    pub async fn disconnect(&self) {
        let (link, watcher, epoch) = {
            let mut handles = self.handles.lock();
            let mut state = self.state.lock();
            state.session_log.info("Disconnecting...");
            state.is_watching_live = false;
            state.watch_epoch += 1;
            state.connect_epoch += 1;
            (handles.link.take(), handles.watcher.take(), state.connect_epoch)
        };

        if let Some(watcher) = watcher {
            watcher.stop();
        }
        if let Some(link) = link {
            link.close().await;
        }

        let mut state = self.state.lock();
        if state.connect_epoch == epoch {
            state.reset_connection();
        }
        state.session_log.info("Disconnected.");
        info!(session = %self.id(), "Disconnected");
    }

    /// Release the adapter before the session goes away
    pub async fn shutdown(&self) {
        let active = {
            let handles = self.handles.lock();
            let state = self.state.lock();
            handles.link.is_some() || state.connection_status == ConnectionStatus::Connecting
        };
        if active {
            self.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::session::testing::{mock_session, real_session};
    use crate::state::ConnectionStatus;
    use crate::{Session, SessionConfig, MOCK_VIN};
    use obd_protocol::mock::SCRIPTED_VIN;
    use obd_protocol::{ObdError, ObdStatus, PortInfo, PortLister, StaticPortLister};
    use std::sync::Arc;
    use std::time::Duration;

    struct FailingLister;

    impl PortLister for FailingLister {
        fn list_ports(&self) -> Result<Vec<PortInfo>, ObdError> {
            Err(ObdError::SerialError("permission denied".into()))
        }
    }

    #[tokio::test]
    async fn test_scan_selects_first_port() {
        let (session, _connector) = real_session();
        session.scan_ports().await;

        let state = session.snapshot();
        assert_eq!(state.available_ports, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
        assert_eq!(state.selected_port, "/dev/ttyUSB0");
        assert!(!state.is_scanning_ports);
        assert!(state.session_log.contains("Found ports: /dev/ttyUSB0, /dev/ttyUSB1"));
    }

    #[tokio::test]
    async fn test_scan_keeps_listed_selection() {
        let (session, _connector) = real_session();
        session.set_selected_port("/dev/ttyUSB1");
        session.scan_ports().await;
        assert_eq!(session.snapshot().selected_port, "/dev/ttyUSB1");

        session.set_selected_port("/dev/gone");
        session.scan_ports().await;
        assert_eq!(session.snapshot().selected_port, "/dev/ttyUSB0");
    }

    #[tokio::test]
    async fn test_scan_no_ports() {
        let session = Session::new(
            SessionConfig::mock(),
            Arc::new(StaticPortLister::new(Vec::<String>::new())),
        );
        session.set_selected_port("COM1");
        session.scan_ports().await;

        let state = session.snapshot();
        assert!(state.available_ports.is_empty());
        assert!(state.selected_port.is_empty());
        assert_eq!(state.session_log.last_message(), Some("No serial ports found."));
    }

    #[tokio::test]
    async fn test_scan_failure_sets_error() {
        let session = Session::new(SessionConfig::mock(), Arc::new(FailingLister));
        session.scan_ports().await;

        let state = session.snapshot();
        assert!(!state.is_scanning_ports);
        assert_eq!(state.connection_error, "Error scanning ports: permission denied");
        assert_eq!(
            state.session_log.last_message(),
            Some("ERROR: Error scanning ports: permission denied")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_port() {
        let session = mock_session();
        session.connect().await;

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::Error);
        assert_eq!(state.connection_error, "No port selected.");
        assert_eq!(state.session_log.last_message(), Some("ERROR: No port selected."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_connect() {
        let session = mock_session();
        session.scan_ports().await;
        session.connect().await;

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::Connected);
        assert_eq!(state.vin, MOCK_VIN);
        assert_eq!(state.live_data.len(), 5);
        assert_eq!(state.live_data["COOLANT_TEMP"].name, "Coolant Temp");
        assert!(state.session_log.contains("Attempting to connect to SIMULATED..."));
        assert_eq!(state.session_log.last_message(), Some("Connected in mock mode."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_is_connecting_while_in_flight() {
        let session = Arc::new(mock_session());
        session.set_selected_port("SIMULATED");

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::Connecting);

        // A second attempt while connecting is ignored
        session.connect().await;
        task.await.unwrap();
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::Connected);
        let attempts = session
            .snapshot()
            .session_log
            .entries()
            .iter()
            .filter(|e| e.message.starts_with("Attempting"))
            .count();
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_when_connected_is_noop() {
        let session = mock_session();
        session.set_selected_port("SIMULATED");
        session.connect().await;
        let before = session.snapshot().session_log.len();

        session.connect().await;
        assert_eq!(session.snapshot().session_log.len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_connect() {
        let (session, connector) = real_session();
        session.scan_ports().await;
        session.connect().await;

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::Connected);
        assert_eq!(state.vin, SCRIPTED_VIN);
        assert!(state.live_data.is_empty());
        assert_eq!(
            state.session_log.last_message(),
            Some(format!("Successfully connected to vehicle. VIN: {}", SCRIPTED_VIN).as_str())
        );
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_connect_ignition_off() {
        let (session, connector) = real_session();
        connector.adapter().set_status(ObdStatus::ObdConnected);
        session.set_selected_port("/dev/ttyUSB0");
        session.connect().await;

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::Error);
        assert_eq!(state.connection_error, "Connection failed. Status: OBD Connected");
        assert!(state.session_log.contains("ERROR: Connection failed. Status: OBD Connected"));
        assert_eq!(connector.adapter().close_count(), 1);
        assert!(session.handles.lock().link.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_connect_serial_error() {
        let (session, connector) = real_session();
        connector.fail_open(ObdError::SerialError("could not open port /dev/ttyUSB0".into()));
        session.set_selected_port("/dev/ttyUSB0");
        session.connect().await;

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::Error);
        assert_eq!(
            state.connection_error,
            "Serial Port Error: could not open port /dev/ttyUSB0. Ensure adapter is connected and port is correct."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_vin_failure_closes_adapter() {
        let (session, connector) = real_session();
        connector
            .adapter()
            .fail_query(obd_protocol::Command::Vin, ObdError::Timeout(2000));
        session.set_selected_port("/dev/ttyUSB0");
        session.connect().await;

        assert_eq!(session.snapshot().connection_status, ConnectionStatus::Error);
        assert_eq!(connector.adapter().close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_error() {
        let session = mock_session();
        session.connect().await;
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::Error);

        session.set_selected_port("SIMULATED");
        session.connect().await;
        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::Connected);
        assert!(state.connection_error.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_resets() {
        let (session, connector) = real_session();
        session.set_selected_port("/dev/ttyUSB0");
        session.connect().await;
        session.disconnect().await;

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::NotConnected);
        assert!(state.vin.is_empty());
        assert!(state.dtc_codes.is_empty());
        assert!(state.live_data.is_empty());
        assert!(!state.is_watching_live);
        assert_eq!(state.selected_port, "/dev/ttyUSB0");
        assert_eq!(state.session_log.last_message(), Some("Disconnected."));
        assert_eq!(connector.adapter().close_count(), 1);

        // Idempotent
        session.disconnect().await;
        assert_eq!(connector.adapter().close_count(), 1);
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::NotConnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_supersedes_connect() {
        let (session, connector) = real_session();
        let session = Arc::new(session);
        session.set_selected_port("/dev/ttyUSB0");

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        // Let the attempt reach the settle wait
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::Connecting);

        session.disconnect().await;
        task.await.unwrap();

        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::NotConnected);
        assert!(state.vin.is_empty());
        assert!(session.handles.lock().link.is_none());
        assert!(connector.adapter().is_closed());
        assert_eq!(connector.adapter().close_count(), 1);
        assert!(state.session_log.contains("superseded; adapter released."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_waits_for_superseded_release() {
        let (session, connector) = real_session();
        let session = Arc::new(session);
        session.set_selected_port("/dev/ttyUSB0");

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.disconnect().await;
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::NotConnected);

        // The first attempt still holds the adapter
        session.connect().await;
        let state = session.snapshot();
        assert_eq!(state.connection_status, ConnectionStatus::NotConnected);
        assert_eq!(connector.open_count(), 1);
        assert_eq!(
            state.session_log.last_message(),
            Some("Previous connection attempt is still releasing the adapter.")
        );

        first.await.unwrap();
        assert_eq!(connector.adapter().close_count(), 1);
        assert!(session.handles.lock().pending.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_cleared_after_each_outcome() {
        let session = mock_session();
        session.connect().await;
        assert!(session.handles.lock().pending.is_none());

        session.set_selected_port("SIMULATED");
        session.connect().await;
        assert!(session.handles.lock().pending.is_none());
        assert_eq!(session.snapshot().connection_status, ConnectionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_adapter() {
        let (session, connector) = real_session();
        session.set_selected_port("/dev/ttyUSB0");
        session.connect().await;
        session.shutdown().await;
        assert!(connector.adapter().is_closed());

        // Nothing left to release
        let before = session.snapshot().session_log.len();
        session.shutdown().await;
        assert_eq!(session.snapshot().session_log.len(), before);
    }
}

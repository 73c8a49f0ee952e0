//! Trouble Code Scan and Clear
//!
//! Clearing erases stored codes and freeze-frame data on the vehicle, so it
//! sits behind a typed confirmation. Local codes are only dropped once the
//! adapter acknowledges the clear.

use crate::backend::BackendMode;
use crate::guard::StateReset;
use crate::notify::{Notification, NotificationLevel};
use crate::session::Session;
use metrics::counter;
use tracing::{debug, info};

/// Text the user must type to unlock clearing
pub const CLEAR_CONFIRMATION_TOKEN: &str = "CLEAR-YES";

/// Exact, case- and whitespace-sensitive match against the token
pub fn confirmation_matches(input: &str) -> bool {
    input == CLEAR_CONFIRMATION_TOKEN
}

impl Session {
    /// Read stored trouble codes from the vehicle
    pub async fn scan_dtcs(&self) -> Option<Notification> {
        let (link, epoch) = {
            let handles = self.handles.lock();
            let mut state = self.state.lock();
            state.is_scanning_dtcs = true;
            state.dtc_codes.clear();
            state
                .session_log
                .info("Scanning for Diagnostic Trouble Codes (DTCs)...");
            let link = handles.link.clone().filter(|_| state.is_connected());
            (link, state.connect_epoch)
        };
        let _busy = StateReset::new(&self.state, |s| s.is_scanning_dtcs = false);

        let Some(link) = link else {
            self.state
                .lock()
                .session_log
                .info("Cannot scan DTCs: Not connected.");
            return Some(self.notify(NotificationLevel::Warning, "Not connected to vehicle."));
        };
        counter!("obd_dtc_scans_total").increment(1);

        let result = link.read_dtcs().await;
        let mut state = self.state.lock();
        if state.connect_epoch != epoch {
            debug!("Discarding trouble codes read from a closed connection");
            return None;
        }
        match result {
            Ok(Some(codes)) => {
                let message = match link.mode() {
                    BackendMode::Simulated => format!("Found {} mock DTCs.", codes.len()),
                    BackendMode::Transport => format!("Found {} DTCs.", codes.len()),
                };
                info!(session = %self.id(), count = codes.len(), "Trouble codes read");
                state.dtc_codes = codes;
                state.session_log.info(message);
                None
            }
            Ok(None) => {
                state.session_log.info("No DTCs found.");
                None
            }
            Err(e) => {
                state.session_log.error(format!("Error reading DTCs: {}", e));
                Some(self.notify(NotificationLevel::Error, format!("Error: {}", e)))
            }
        }
    }

    /// Open or close the clear dialog, resetting the typed confirmation
    pub fn toggle_clear_dialog(&self) {
        let mut state = self.state.lock();
        state.show_clear_dialog = !state.show_clear_dialog;
        state.clear_confirmation_input.clear();
    }

    pub fn set_clear_confirmation_input(&self, text: impl Into<String>) {
        self.state.lock().clear_confirmation_input = text.into();
    }

    /// Clear stored trouble codes once the confirmation matches
    pub async fn clear_dtcs(&self) -> Option<Notification> {
        let (link, epoch) = {
            let handles = self.handles.lock();
            let mut state = self.state.lock();
            if !state.clear_confirmation_valid() {
                return Some(self.notify(NotificationLevel::Warning, "Invalid confirmation text."));
            }
            state.is_clearing_codes = true;
            state.session_log.info("Attempting to clear DTCs...");
            let link = handles.link.clone().filter(|_| state.is_connected());
            (link, state.connect_epoch)
        };
        let _busy = StateReset::new(&self.state, |s| {
            s.is_clearing_codes = false;
            s.show_clear_dialog = false;
        });

        let Some(link) = link else {
            self.state
                .lock()
                .session_log
                .info("Cannot clear DTCs: Not connected.");
            return Some(self.notify(NotificationLevel::Warning, "Not connected to vehicle."));
        };

        let result = link.clear_dtcs().await;
        let mut state = self.state.lock();
        match result {
            Ok(outcome) if outcome.confirmed => {
                counter!("obd_dtc_clears_total", "outcome" => "cleared").increment(1);
                if state.connect_epoch == epoch {
                    state.dtc_codes.clear();
                }
                let (logged, shown) = match link.mode() {
                    BackendMode::Simulated => ("Mock DTCs cleared.", "Codes Cleared (Mock Mode)"),
                    BackendMode::Transport => (
                        "CLEAR_DTC command successful.",
                        "Diagnostic Trouble Codes Cleared",
                    ),
                };
                state.session_log.info(logged);
                Some(self.notify(NotificationLevel::Success, shown))
            }
            Ok(outcome) => {
                counter!("obd_dtc_clears_total", "outcome" => "rejected").increment(1);
                state.session_log.info(format!(
                    "CLEAR_DTC command failed. Response: {}",
                    outcome.detail
                ));
                Some(self.notify(NotificationLevel::Error, "Failed to clear codes."))
            }
            Err(e) => {
                counter!("obd_dtc_clears_total", "outcome" => "error").increment(1);
                state.session_log.error(format!("Error clearing DTCs: {}", e));
                Some(self.notify(NotificationLevel::Error, format!("Error: {}", e)))
            }
        }
    }
}

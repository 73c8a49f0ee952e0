//! Live Data Watch
//!
//! Toggles streaming of the live parameters. A watch is identified by the
//! watch epoch; its worker stops applying samples as soon as the epoch moves
//! on, so nothing lands in `live_data` after a watch is switched off.

use crate::backend::{BackendMode, VehicleLink};
use crate::live::LiveWatcher;
use crate::notify::{Notification, NotificationLevel};
use crate::session::Session;
use obd_protocol::Command;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

impl Session {
    /// Start or stop streaming live parameters
    pub async fn toggle_live_watch(&self) -> Option<Notification> {
        let (link, watching) = {
            let handles = self.handles.lock();
            let state = self.state.lock();
            match handles.link.clone() {
                Some(link) if state.is_connected() => (link, state.is_watching_live),
                _ => {
                    return Some(self.notify(NotificationLevel::Warning, "Not connected to vehicle."))
                }
            }
        };

        if watching {
            self.stop_live_watch(link).await
        } else {
            self.start_live_watch(link).await
        }
    }

    async fn start_live_watch(&self, link: Arc<dyn VehicleLink>) -> Option<Notification> {
        let (sink, samples) = mpsc::channel(self.config.live_channel_capacity.max(1));

        let epoch = {
            let mut handles = self.handles.lock();
            let mut state = self.state.lock();
            state.is_watching_live = true;
            state.watch_epoch += 1;
            state.session_log.info(match link.mode() {
                BackendMode::Simulated => "Started live data watch (Mock).",
                BackendMode::Transport => "Started watching live data.",
            });
            let epoch = state.watch_epoch;
            let worker = LiveWatcher::spawn(self.state.clone(), epoch, samples);
            if let Some(previous) = handles.watcher.replace(worker) {
                previous.stop();
            }
            epoch
        };
        info!(session = %self.id(), epoch, "Live watch started");

        for command in Command::LIVE {
            let result = link.watch(command, sink.clone()).await;

            let superseded = self.state.lock().watch_epoch != epoch;
            if superseded {
                // Switched off or disconnected while subscribing
                debug!("Live watch {} superseded during subscription", epoch);
                if let Err(e) = link.unwatch_all().await {
                    warn!("Failed to unwatch superseded live watch: {}", e);
                }
                return None;
            }

            if let Err(e) = result {
                if let Err(unwatch) = link.unwatch_all().await {
                    warn!("Failed to roll back live watch: {}", unwatch);
                }
                let worker = {
                    let mut handles = self.handles.lock();
                    let mut state = self.state.lock();
                    state
                        .session_log
                        .error(format!("Failed to watch {}: {}", command.name(), e));
                    if state.watch_epoch == epoch {
                        state.is_watching_live = false;
                        state.watch_epoch += 1;
                        handles.watcher.take()
                    } else {
                        None
                    }
                };
                if let Some(worker) = worker {
                    worker.stop();
                }
                return Some(self.notify(
                    NotificationLevel::Error,
                    format!("Failed to watch {}: {}", command.name(), e),
                ));
            }
        }
        None
    }

    async fn stop_live_watch(&self, link: Arc<dyn VehicleLink>) -> Option<Notification> {
        if let Err(e) = link.unwatch_all().await {
            warn!("Failed to unwatch live parameters: {}", e);
            self.state
                .lock()
                .session_log
                .error(format!("Error stopping live data watch: {}", e));
        }

        let worker = {
            let mut handles = self.handles.lock();
            let mut state = self.state.lock();
            state.is_watching_live = false;
            state.watch_epoch += 1;
            state.session_log.info(match link.mode() {
                BackendMode::Simulated => "Stopped live data watch (Mock).",
                BackendMode::Transport => "Stopped watching live data.",
            });
            handles.watcher.take()
        };
        if let Some(worker) = worker {
            worker.stop();
        }
        info!(session = %self.id(), "Live watch stopped");
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::session::testing::{mock_session, real_session};
    use crate::state::LiveValue;
    use crate::{NotificationLevel, Session};
    use obd_protocol::mock::ScriptedConnector;
    use obd_protocol::{Command, ObdError, Response, Value};
    use std::sync::Arc;
    use std::time::Duration;

    async fn connected_real() -> (Session, Arc<ScriptedConnector>) {
        let (session, connector) = real_session();
        session.set_selected_port("/dev/ttyUSB0");
        session.connect().await;
        (session, connector)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_connected_rejected() {
        let session = mock_session();
        let notification = session.toggle_live_watch().await.unwrap();

        assert_eq!(notification.level, NotificationLevel::Warning);
        assert_eq!(notification.message, "Not connected to vehicle.");
        let state = session.snapshot();
        assert!(!state.is_watching_live);
        assert!(state.session_log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_watch_toggles() {
        let session = mock_session();
        session.set_selected_port("SIMULATED");
        session.connect().await;
        let live_before = session.snapshot().live_data;

        assert!(session.toggle_live_watch().await.is_none());
        let state = session.snapshot();
        assert!(state.is_watching_live);
        assert_eq!(state.session_log.last_message(), Some("Started live data watch (Mock)."));
        assert_eq!(state.live_data, live_before);

        session.toggle_live_watch().await;
        let state = session.snapshot();
        assert!(!state.is_watching_live);
        assert_eq!(state.session_log.last_message(), Some("Stopped live data watch (Mock)."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_watch_subscribes_and_applies() {
        let (session, connector) = connected_real().await;
        session.toggle_live_watch().await;

        let adapter = connector.adapter();
        assert_eq!(adapter.watched().len(), 5);
        assert_eq!(
            session.snapshot().session_log.last_message(),
            Some("Started watching live data.")
        );

        assert!(adapter.emit(Response::new(Command::CoolantTemp, Value::quantity(90.0, "degC"))));
        assert!(adapter.emit(Response::new(Command::Rpm, Value::quantity(900.0, "rpm"))));
        assert!(adapter.emit(Response::new(Command::Rpm, Value::quantity(1200.0, "rpm"))));
        settle().await;

        let state = session.snapshot();
        let coolant = &state.live_data["COOLANT_TEMP"];
        assert_eq!(coolant.name, "Coolant Temp");
        assert_eq!(coolant.value, LiveValue::Number(90.0));
        assert_eq!(coolant.unit, "degC");
        assert_eq!(state.live_data["RPM"].value, LiveValue::Number(1200.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_watch_stop_unwatches() {
        let (session, connector) = connected_real().await;
        session.toggle_live_watch().await;
        session.toggle_live_watch().await;

        let adapter = connector.adapter();
        assert!(adapter.watched().is_empty());
        assert!(adapter.calls().contains(&"unwatch_all".to_string()));
        let state = session.snapshot();
        assert!(!state.is_watching_live);
        assert_eq!(state.session_log.last_message(), Some("Stopped watching live data."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_samples_ignored_after_stop() {
        let (session, connector) = connected_real().await;
        let adapter = connector.adapter();
        // Keep callbacks registered so the adapter can still deliver
        adapter.fail_unwatch(ObdError::AdapterNotResponding);
        session.toggle_live_watch().await;
        session.toggle_live_watch().await;
        assert!(!session.snapshot().is_watching_live);

        adapter.emit(Response::new(Command::Speed, Value::quantity(88.0, "kph")));
        settle().await;
        assert!(!session.snapshot().live_data.contains_key("SPEED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_subscription_rolls_back() {
        let (session, connector) = connected_real().await;
        let adapter = connector.adapter();
        adapter.fail_watch(Command::CoolantTemp, ObdError::Unsupported(Command::CoolantTemp));

        let notification = session.toggle_live_watch().await.unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);

        let state = session.snapshot();
        assert!(!state.is_watching_live);
        assert!(adapter.watched().is_empty());
        assert_eq!(
            state.session_log.last_message(),
            Some("ERROR: Failed to watch COOLANT_TEMP: Command COOLANT_TEMP not supported by vehicle")
        );

        adapter.emit(Response::new(Command::Rpm, Value::quantity(700.0, "rpm")));
        settle().await;
        assert!(session.snapshot().live_data.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_watch() {
        let (session, connector) = connected_real().await;
        session.toggle_live_watch().await;
        session.disconnect().await;

        let state = session.snapshot();
        assert!(!state.is_watching_live);
        assert!(state.live_data.is_empty());
        assert!(connector.adapter().is_closed());
        assert!(!connector
            .adapter()
            .emit(Response::new(Command::Rpm, Value::quantity(800.0, "rpm"))));
    }
}

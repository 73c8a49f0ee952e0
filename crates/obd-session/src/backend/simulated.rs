//! Simulated vehicle for running the dashboard without an adapter

use super::{BackendMode, ClearOutcome, Connected, VehicleBackend, VehicleLink};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::state::{Dtc, LiveData, LiveDataEntry, LiveValue};
use async_trait::async_trait;
use obd_protocol::{Command, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// VIN reported by the simulated vehicle
pub const MOCK_VIN: &str = "MOCK_VIN_123456789";

/// Trouble codes stored in the simulated vehicle
fn mock_dtcs() -> Vec<Dtc> {
    vec![
        Dtc::new("P0420", "Catalyst System Efficiency Below Threshold (Bank 1)"),
        Dtc::new("P0301", "Cylinder 1 Misfire Detected"),
        Dtc::new("P0171", "System Too Lean (Bank 1)"),
    ]
}

/// Telemetry shown as soon as the simulated vehicle connects
fn mock_live_data() -> LiveData {
    let mut data = LiveData::new();
    data.insert("RPM".into(), LiveDataEntry::new("RPM", LiveValue::Number(850.0), "RPM"));
    data.insert("SPEED".into(), LiveDataEntry::new("Speed", LiveValue::Number(0.0), "km/h"));
    data.insert(
        "COOLANT_TEMP".into(),
        LiveDataEntry::new("Coolant Temp", LiveValue::Number(90.0), "°C"),
    );
    data.insert(
        "ENGINE_LOAD".into(),
        LiveDataEntry::new("Engine Load", LiveValue::Number(35.5), "%"),
    );
    data.insert(
        "FUEL_STATUS".into(),
        LiveDataEntry::new("Fuel Status", LiveValue::Text("Closed Loop".into()), ""),
    );
    data
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    connect: Duration,
    read_dtcs: Duration,
    clear_dtcs: Duration,
}

/// Backend that fakes adapter latency and returns canned data
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    timing: Timing,
}

impl SimulatedBackend {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            timing: Timing {
                connect: config.mock_connect_latency(),
                read_dtcs: config.mock_dtc_delay(),
                clear_dtcs: config.mock_clear_delay(),
            },
        }
    }
}

#[async_trait]
impl VehicleBackend for SimulatedBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Simulated
    }

    async fn connect(&self, port: &str) -> Result<Connected, SessionError> {
        info!("Simulating adapter handshake on {}", port);
        tokio::time::sleep(self.timing.connect).await;
        Ok(Connected {
            link: Arc::new(SimulatedLink {
                timing: self.timing,
            }),
            vin: MOCK_VIN.to_string(),
            live_data: mock_live_data(),
        })
    }
}

/// Link to the simulated vehicle
///
/// Telemetry is static, so watching accepts subscriptions without
/// producing samples.
struct SimulatedLink {
    timing: Timing,
}

#[async_trait]
impl VehicleLink for SimulatedLink {
    fn mode(&self) -> BackendMode {
        BackendMode::Simulated
    }

    async fn read_dtcs(&self) -> Result<Option<Vec<Dtc>>, SessionError> {
        tokio::time::sleep(self.timing.read_dtcs).await;
        Ok(Some(mock_dtcs()))
    }

    async fn clear_dtcs(&self) -> Result<ClearOutcome, SessionError> {
        tokio::time::sleep(self.timing.clear_dtcs).await;
        Ok(ClearOutcome {
            confirmed: true,
            detail: "simulated".to_string(),
        })
    }

    async fn watch(&self, command: Command, _sink: mpsc::Sender<Response>) -> Result<(), SessionError> {
        debug!("Simulated watch for {}", command);
        Ok(())
    }

    async fn unwatch_all(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_connect_waits_for_latency() {
        let backend = SimulatedBackend::new(&SessionConfig::mock());
        let started = Instant::now();
        let connected = backend.connect("SIMULATED").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(connected.vin, MOCK_VIN);
        assert_eq!(connected.live_data.len(), 5);
        assert_eq!(connected.link.mode(), BackendMode::Simulated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canned_codes() {
        let backend = SimulatedBackend::new(&SessionConfig::mock());
        let link = backend.connect("SIMULATED").await.unwrap().link;
        let codes = link.read_dtcs().await.unwrap().unwrap();
        let names: Vec<_> = codes.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(names, vec!["P0420", "P0301", "P0171"]);
        assert!(link.clear_dtcs().await.unwrap().confirmed);
    }

    #[test]
    fn test_mock_live_keys() {
        let keys: Vec<_> = mock_live_data().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["COOLANT_TEMP", "ENGINE_LOAD", "FUEL_STATUS", "RPM", "SPEED"]
        );
    }
}

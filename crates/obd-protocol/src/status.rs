//! Adapter Connection Status

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far the adapter got in reaching the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObdStatus {
    /// Serial link not established
    #[default]
    NotConnected,
    /// Adapter answers AT commands
    ElmConnected,
    /// Adapter reached the OBD bus but the ignition is off
    ObdConnected,
    /// Vehicle ECUs are responding
    CarConnected,
}

impl ObdStatus {
    /// Whether queries can be expected to reach the vehicle
    pub fn is_car_connected(&self) -> bool {
        matches!(self, ObdStatus::CarConnected)
    }
}

impl fmt::Display for ObdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ObdStatus::NotConnected => "Not Connected",
            ObdStatus::ElmConnected => "ELM Connected",
            ObdStatus::ObdConnected => "OBD Connected",
            ObdStatus::CarConnected => "Car Connected",
        };
        f.write_str(text)
    }
}

//! OBD-II Command Identifiers
//!
//! The subset of adapter commands the dashboard issues. Encoding them on the
//! bus is the adapter library's job; this type only names them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commands understood by the adapter library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Engine RPM (01 0C)
    Rpm,
    /// Vehicle speed (01 0D)
    Speed,
    /// Engine coolant temperature (01 05)
    CoolantTemp,
    /// Calculated engine load (01 04)
    EngineLoad,
    /// Fuel system status (01 03)
    FuelStatus,
    /// Vehicle identification number (09 02)
    Vin,
    /// Stored diagnostic trouble codes (03)
    GetDtc,
    /// Clear trouble codes and stored values (04)
    ClearDtc,
}

impl Command {
    /// Parameters streamed by the live data view
    pub const LIVE: [Command; 5] = [
        Command::Rpm,
        Command::Speed,
        Command::CoolantTemp,
        Command::EngineLoad,
        Command::FuelStatus,
    ];

    /// Stable identifier, e.g. `COOLANT_TEMP`
    pub fn name(&self) -> &'static str {
        match self {
            Command::Rpm => "RPM",
            Command::Speed => "SPEED",
            Command::CoolantTemp => "COOLANT_TEMP",
            Command::EngineLoad => "ENGINE_LOAD",
            Command::FuelStatus => "FUEL_STATUS",
            Command::Vin => "VIN",
            Command::GetDtc => "GET_DTC",
            Command::ClearDtc => "CLEAR_DTC",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Session State
//!
//! Plain data shared by every session operation. Only the session mutates
//! it, always under its lock and never across an await point.

use crate::diagnostics::confirmation_matches;
use crate::log::SessionLog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Connection lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionStatus::NotConnected => "NOT_CONNECTED",
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// A diagnostic trouble code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dtc {
    pub code: String,
    pub description: String,
}

impl Dtc {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// Displayed magnitude of a live parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiveValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for LiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveValue::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{:.0}", n),
            LiveValue::Number(n) => write!(f, "{}", n),
            LiveValue::Text(text) => f.write_str(text),
        }
    }
}

/// One tile of the live data view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDataEntry {
    /// Human-readable label
    pub name: String,
    pub value: LiveValue,
    /// Unit string, empty for unitless values
    pub unit: String,
}

impl LiveDataEntry {
    pub fn new(name: impl Into<String>, value: LiveValue, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// Live data keyed by parameter identifier
pub type LiveData = BTreeMap<String, LiveDataEntry>;

/// Everything the dashboard renders
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub connection_status: ConnectionStatus,
    pub connection_error: String,
    pub vin: String,
    pub available_ports: Vec<String>,
    pub selected_port: String,
    pub is_scanning_ports: bool,
    pub dtc_codes: Vec<Dtc>,
    pub is_scanning_dtcs: bool,
    pub show_clear_dialog: bool,
    pub clear_confirmation_input: String,
    pub is_clearing_codes: bool,
    pub live_data: LiveData,
    pub is_watching_live: bool,
    pub session_log: SessionLog,
    pub use_mock_mode: bool,

    /// Bumped by every connect attempt and every disconnect
    #[serde(skip)]
    pub(crate) connect_epoch: u64,
    /// Bumped whenever live watching starts or stops
    #[serde(skip)]
    pub(crate) watch_epoch: u64,
}

impl SessionState {
    /// Fresh state for a new session
    pub fn new(use_mock_mode: bool) -> Self {
        Self {
            use_mock_mode,
            ..Default::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status == ConnectionStatus::Connected
    }

    /// Whether the typed confirmation unlocks the clear command
    pub fn clear_confirmation_valid(&self) -> bool {
        confirmation_matches(&self.clear_confirmation_input)
    }

    /// Whether a connect attempt may start from the current status
    pub fn can_connect(&self) -> bool {
        matches!(
            self.connection_status,
            ConnectionStatus::NotConnected | ConnectionStatus::Error
        )
    }

    /// Insert or replace a live data tile; last writer wins
    pub fn upsert_live(&mut self, key: impl Into<String>, entry: LiveDataEntry) {
        self.live_data.insert(key.into(), entry);
    }

    /// Drop everything tied to the current connection
    pub(crate) fn reset_connection(&mut self) {
        self.connection_status = ConnectionStatus::NotConnected;
        self.vin.clear();
        self.dtc_codes.clear();
        self.live_data.clear();
        self.is_watching_live = false;
    }
}

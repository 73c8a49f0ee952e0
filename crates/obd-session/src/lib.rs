//! OBD-II Diagnostic Session
//!
//! Owns the state behind the diagnostics dashboard: adapter discovery, the
//! connection lifecycle, trouble-code scan/clear and the live telemetry feed.
//! Every command runs as an independent async operation against one shared
//! [`SessionState`]; hardware calls never run while the state is locked.

mod backend;
mod config;
mod diagnostics;
mod error;
mod guard;
mod lifecycle;
mod live;
mod log;
mod notify;
mod session;
mod state;
mod telemetry;

pub use backend::{
    BackendMode, ClearOutcome, Connected, SimulatedBackend, TransportBackend, VehicleBackend,
    VehicleLink, MOCK_VIN,
};
pub use config::SessionConfig;
pub use diagnostics::{confirmation_matches, CLEAR_CONFIRMATION_TOKEN};
pub use error::SessionError;
pub use live::{live_entry, title_case};
pub use log::{LogEntry, SessionLog};
pub use notify::{Notification, NotificationLevel};
pub use session::Session;
pub use state::{ConnectionStatus, Dtc, LiveData, LiveDataEntry, LiveValue, SessionState};

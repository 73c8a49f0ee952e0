//! Transient user notifications (toasts)

use serde::{Deserialize, Serialize};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Message shown briefly to the user after a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Display time in milliseconds
    pub duration_ms: u64,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            level,
            message: message.into(),
            duration_ms,
        }
    }
}

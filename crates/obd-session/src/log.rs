//! Session Log
//!
//! Append-only, human-readable trail of everything a session did. Entries are
//! mirrored to `tracing` so the operator log and the dashboard agree.

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{error, info};

/// Prefix marking failure entries
const ERROR_PREFIX: &str = "ERROR: ";

/// A single timestamped entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Ordered session event trail
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a normal entry
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "session_log", "{}", message);
        self.push(message);
    }

    /// Append a failure entry, prefixed with `ERROR: `
    pub fn error(&mut self, message: impl fmt::Display) {
        error!(target: "session_log", "{}", message);
        self.push(format!("{}{}", ERROR_PREFIX, message));
    }

    fn push(&mut self, message: String) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry's message
    pub fn last_message(&self) -> Option<&str> {
        self.entries.last().map(|e| e.message.as_str())
    }

    /// Whether any entry's message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}

impl Serialize for SessionLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(ToString::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_timestamped() {
        let mut log = SessionLog::new();
        log.info("Scanning for available serial ports...");
        let line = log.entries()[0].to_string();
        // [HH:MM:SS] message
        assert_eq!(&line[0..1], "[");
        assert_eq!(&line[9..11], "] ");
        assert!(line.ends_with("Scanning for available serial ports..."));
    }

    #[test]
    fn test_error_prefix() {
        let mut log = SessionLog::new();
        log.error("No port selected.");
        assert_eq!(log.last_message(), Some("ERROR: No port selected."));
    }

    #[test]
    fn test_append_only_order() {
        let mut log = SessionLog::new();
        log.info("first");
        log.info("second");
        log.error("third");
        let messages: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "ERROR: third"]);
    }

    #[test]
    fn test_serializes_as_lines() {
        let mut log = SessionLog::new();
        log.info("Disconnected.");
        let json = serde_json::to_value(&log).unwrap();
        assert!(json[0].as_str().unwrap().ends_with("Disconnected."));
    }
}

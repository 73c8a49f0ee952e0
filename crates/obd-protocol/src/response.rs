//! Decoded Adapter Responses

use crate::command::Command;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value decoded by the adapter library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    /// Physical quantity with its unit, e.g. `90 degC`
    Quantity { magnitude: f64, unit: String },
    /// Free text (VIN, fuel system status)
    Text { text: String },
    /// Trouble codes as `(code, description)` pairs
    Codes { codes: Vec<(String, String)> },
    /// Plain success flag (clear command)
    Flag { flag: bool },
}

impl Value {
    /// Quantity with the given unit
    pub fn quantity(magnitude: f64, unit: impl Into<String>) -> Self {
        Value::Quantity {
            magnitude,
            unit: unit.into(),
        }
    }

    /// Text value
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text { text: text.into() }
    }

    /// Trouble code list
    pub fn codes<I, C, D>(codes: I) -> Self
    where
        I: IntoIterator<Item = (C, D)>,
        C: Into<String>,
        D: Into<String>,
    {
        Value::Codes {
            codes: codes
                .into_iter()
                .map(|(code, description)| (code.into(), description.into()))
                .collect(),
        }
    }

    /// Truthiness used to judge command acknowledgements
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Quantity { magnitude, .. } => *magnitude != 0.0,
            Value::Text { text } => !text.is_empty(),
            Value::Codes { codes } => !codes.is_empty(),
            Value::Flag { flag } => *flag,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Quantity { magnitude, unit } if unit.is_empty() => write!(f, "{}", magnitude),
            Value::Quantity { magnitude, unit } => write!(f, "{} {}", magnitude, unit),
            Value::Text { text } => f.write_str(text),
            Value::Codes { codes } => {
                let joined: Vec<&str> = codes.iter().map(|(code, _)| code.as_str()).collect();
                write!(f, "[{}]", joined.join(", "))
            }
            Value::Flag { flag } => write!(f, "{}", flag),
        }
    }
}

/// Response to a query or a watched sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The command that produced the response
    pub command: Command,
    /// Decoded value, `None` when the adapter returned nothing usable
    pub value: Option<Value>,
    /// Timestamp when the response was received (Unix ms)
    pub timestamp_ms: u64,
}

impl Response {
    /// Create a response carrying a value
    pub fn new(command: Command, value: Value) -> Self {
        Self {
            command,
            value: Some(value),
            timestamp_ms: now_ms(),
        }
    }

    /// Create a null response
    pub fn null(command: Command) -> Self {
        Self {
            command,
            value: None,
            timestamp_ms: now_ms(),
        }
    }

    /// Whether the adapter returned nothing usable
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

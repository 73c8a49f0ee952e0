//! Scriptable in-memory adapter
//!
//! Stands in for a real adapter library in tests and demos. Responses,
//! status and failures are configured up front; watched samples are pushed
//! with [`ScriptedAdapter::emit`], which plays the role of the library's
//! reader thread.

use crate::command::Command;
use crate::connection::{Connector, ObdConnection, SampleCallback};
use crate::error::ObdError;
use crate::response::{Response, Value};
use crate::status::ObdStatus;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// VIN reported by the default script
pub const SCRIPTED_VIN: &str = "1HGCM82633A123456";

#[derive(Default)]
struct Script {
    status: ObdStatus,
    responses: HashMap<Command, Response>,
    query_failures: HashMap<Command, ObdError>,
    watch_failures: HashMap<Command, ObdError>,
    start_failure: Option<ObdError>,
    unwatch_failure: Option<ObdError>,
    watchers: HashMap<Command, Option<SampleCallback>>,
    calls: Vec<String>,
    running: bool,
    closed: bool,
}

/// In-memory adapter driven by a script
pub struct ScriptedAdapter {
    script: RwLock<Script>,
    closes: AtomicUsize,
}

impl ScriptedAdapter {
    /// Adapter attached to a responsive vehicle with default answers
    pub fn new() -> Self {
        let mut script = Script {
            status: ObdStatus::CarConnected,
            ..Default::default()
        };
        for response in Self::default_responses() {
            script.responses.insert(response.command, response);
        }
        Self {
            script: RwLock::new(script),
            closes: AtomicUsize::new(0),
        }
    }

    fn default_responses() -> Vec<Response> {
        vec![
            Response::new(Command::Vin, Value::text(SCRIPTED_VIN)),
            Response::new(
                Command::GetDtc,
                Value::codes([
                    ("P0420", "Catalyst System Efficiency Below Threshold (Bank 1)"),
                    ("P0301", "Cylinder 1 Misfire Detected"),
                ]),
            ),
            Response::new(Command::ClearDtc, Value::Flag { flag: true }),
            Response::new(Command::Rpm, Value::quantity(812.0, "revolutions_per_minute")),
            Response::new(Command::Speed, Value::quantity(0.0, "kph")),
            Response::new(Command::CoolantTemp, Value::quantity(88.0, "degC")),
            Response::new(Command::EngineLoad, Value::quantity(31.4, "percent")),
            Response::new(Command::FuelStatus, Value::text("Closed loop, using oxygen sensor feedback")),
        ]
    }

    /// Set the status reported after the reader starts
    pub fn set_status(&self, status: ObdStatus) {
        self.script.write().status = status;
    }

    /// Answer `response.command` with `response`
    pub fn set_response(&self, response: Response) {
        self.script.write().responses.insert(response.command, response);
    }

    /// Make queries for `command` fail
    pub fn fail_query(&self, command: Command, error: ObdError) {
        self.script.write().query_failures.insert(command, error);
    }

    /// Make watching `command` fail
    pub fn fail_watch(&self, command: Command, error: ObdError) {
        self.script.write().watch_failures.insert(command, error);
    }

    /// Make `start` fail
    pub fn fail_start(&self, error: ObdError) {
        self.script.write().start_failure = Some(error);
    }

    /// Make `unwatch_all` fail
    pub fn fail_unwatch(&self, error: ObdError) {
        self.script.write().unwatch_failure = Some(error);
    }

    /// Deliver a sample to the watcher of its command
    ///
    /// Returns whether a callback received it.
    pub fn emit(&self, response: Response) -> bool {
        let callback = {
            let script = self.script.read();
            if script.closed {
                return false;
            }
            script.watchers.get(&response.command).cloned().flatten()
        };
        match callback {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }

    /// Commands currently watched
    pub fn watched(&self) -> Vec<Command> {
        let mut watched: Vec<_> = self.script.read().watchers.keys().copied().collect();
        watched.sort();
        watched
    }

    /// Number of times `close` was called
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.script.read().closed
    }

    /// Whether the background reader is running
    pub fn is_running(&self) -> bool {
        self.script.read().running
    }

    /// Every call received, in order (e.g. `query:VIN`)
    pub fn calls(&self) -> Vec<String> {
        self.script.read().calls.clone()
    }

    fn record(&self, call: String) -> Result<(), ObdError> {
        let mut script = self.script.write();
        script.calls.push(call);
        if script.closed {
            return Err(ObdError::Closed);
        }
        Ok(())
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ObdConnection for ScriptedAdapter {
    fn status(&self) -> ObdStatus {
        let script = self.script.read();
        if script.closed || !script.running {
            ObdStatus::NotConnected
        } else {
            script.status
        }
    }

    fn query(&self, command: Command) -> Result<Response, ObdError> {
        self.record(format!("query:{}", command))?;
        let script = self.script.read();
        if let Some(error) = script.query_failures.get(&command) {
            return Err(error.clone());
        }
        Ok(script
            .responses
            .get(&command)
            .cloned()
            .unwrap_or_else(|| Response::null(command)))
    }

    fn watch(&self, command: Command, callback: Option<SampleCallback>) -> Result<(), ObdError> {
        self.record(format!("watch:{}", command))?;
        let mut script = self.script.write();
        if let Some(error) = script.watch_failures.get(&command) {
            return Err(error.clone());
        }
        script.watchers.insert(command, callback);
        Ok(())
    }

    fn unwatch_all(&self) -> Result<(), ObdError> {
        self.record("unwatch_all".to_string())?;
        let mut script = self.script.write();
        if let Some(error) = script.unwatch_failure.clone() {
            return Err(error);
        }
        script.watchers.clear();
        Ok(())
    }

    fn start(&self) -> Result<(), ObdError> {
        self.record("start".to_string())?;
        let mut script = self.script.write();
        if let Some(error) = script.start_failure.clone() {
            return Err(error);
        }
        script.running = true;
        Ok(())
    }

    fn stop(&self) -> Result<(), ObdError> {
        self.record("stop".to_string())?;
        self.script.write().running = false;
        Ok(())
    }

    fn close(&self) -> Result<(), ObdError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.write();
        script.calls.push("close".to_string());
        script.running = false;
        script.closed = true;
        script.watchers.clear();
        debug!("Scripted adapter closed");
        Ok(())
    }
}

/// Connector handing out a single [`ScriptedAdapter`]
pub struct ScriptedConnector {
    adapter: Arc<ScriptedAdapter>,
    open_failure: RwLock<Option<ObdError>>,
    opens: AtomicUsize,
}

impl ScriptedConnector {
    /// Connector that opens `adapter`
    pub fn new(adapter: Arc<ScriptedAdapter>) -> Self {
        Self {
            adapter,
            open_failure: RwLock::new(None),
            opens: AtomicUsize::new(0),
        }
    }

    /// Make `open` fail with `error`
    pub fn fail_open(&self, error: ObdError) {
        *self.open_failure.write() = Some(error);
    }

    /// The adapter handed out by `open`
    pub fn adapter(&self) -> &Arc<ScriptedAdapter> {
        &self.adapter
    }

    /// Number of successful opens
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, port: &str) -> Result<Arc<dyn ObdConnection>, ObdError> {
        if let Some(error) = self.open_failure.read().clone() {
            return Err(error);
        }
        debug!("Scripted connector opening {}", port);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.adapter.clone())
    }
}

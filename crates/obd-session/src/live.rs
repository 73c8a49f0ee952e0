//! Live Telemetry
//!
//! Adapter callbacks only forward samples into a bounded channel. A single
//! worker task per watch applies them to the session state, re-checking
//! under the lock that its watch is still the current one.

use crate::state::{LiveDataEntry, LiveValue, SessionState};
use metrics::counter;
use obd_protocol::{Response, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// `COOLANT_TEMP` -> `Coolant Temp`
pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Translate a sample into its live data key and tile
///
/// Null samples carry nothing to show and yield `None`.
pub fn live_entry(sample: &Response) -> Option<(String, LiveDataEntry)> {
    let (value, unit) = match sample.value.as_ref()? {
        Value::Quantity { magnitude, unit } => (LiveValue::Number(*magnitude), unit.clone()),
        other => (LiveValue::Text(other.to_string()), String::new()),
    };
    let key = sample.command.name();
    Some((key.to_string(), LiveDataEntry::new(title_case(key), value, unit)))
}

/// Worker applying live samples for one watch
pub(crate) struct LiveWatcher {
    task: JoinHandle<()>,
}

impl LiveWatcher {
    /// Spawn a worker bound to watch `epoch`
    pub(crate) fn spawn(
        state: Arc<Mutex<SessionState>>,
        epoch: u64,
        mut samples: mpsc::Receiver<Response>,
    ) -> Self {
        let task = tokio::spawn(async move {
            while let Some(sample) = samples.recv().await {
                let Some((key, entry)) = live_entry(&sample) else {
                    continue;
                };
                let mut state = state.lock();
                if !state.is_watching_live || state.watch_epoch != epoch {
                    break;
                }
                state.upsert_live(key, entry);
                counter!("obd_live_samples_total").increment(1);
            }
            debug!("Live watcher {} finished", epoch);
        });
        Self { task }
    }

    pub(crate) fn stop(self) {
        self.task.abort();
    }
}

impl Drop for LiveWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

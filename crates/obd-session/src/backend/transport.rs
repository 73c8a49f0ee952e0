//! Backend over a real adapter library
//!
//! The library is blocking, so every call is shipped to the blocking pool
//! and bounded by a timeout. A connect that fails after the adapter was
//! opened stops and closes it before returning.

use super::{BackendMode, ClearOutcome, Connected, VehicleBackend, VehicleLink};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::state::{Dtc, LiveData};
use async_trait::async_trait;
use obd_protocol::{Command, Connector, ObdConnection, ObdError, Response, SampleCallback, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// VIN shown when the vehicle does not report one
const VIN_UNAVAILABLE: &str = "N/A";

/// Run a blocking adapter call on the blocking pool, bounded by `limit`
async fn blocking<T, F>(limit: Duration, call: F) -> Result<T, SessionError>
where
    F: FnOnce() -> Result<T, ObdError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result.map_err(SessionError::from),
        Ok(Err(join)) => Err(SessionError::Transport(format!("Adapter call failed: {}", join))),
        Err(_) => Err(ObdError::Timeout(limit.as_millis() as u64).into()),
    }
}

/// Stop the reader and close the serial link, logging failures
async fn release(conn: Arc<dyn ObdConnection>, limit: Duration) {
    let result = blocking(limit, move || {
        if let Err(e) = conn.stop() {
            warn!("Failed to stop adapter reader: {}", e);
        }
        conn.close()
    })
    .await;
    match result {
        Ok(()) => debug!("Adapter released"),
        Err(e) => warn!("Failed to close adapter: {}", e),
    }
}

/// Connects through an injected [`Connector`]
pub struct TransportBackend {
    connector: Arc<dyn Connector>,
    open_timeout: Duration,
    call_timeout: Duration,
    settle: Duration,
}

impl TransportBackend {
    pub fn new(connector: Arc<dyn Connector>, config: &SessionConfig) -> Self {
        Self {
            connector,
            open_timeout: config.open_timeout(),
            call_timeout: config.adapter_timeout(),
            settle: config.adapter_settle(),
        }
    }

    async fn open(&self, port: &str) -> Result<Arc<dyn ObdConnection>, SessionError> {
        let connector = self.connector.clone();
        let device = port.to_string();
        let mut task = tokio::task::spawn_blocking(move || connector.open(&device));

        match tokio::time::timeout(self.open_timeout, &mut task).await {
            Ok(Ok(result)) => result.map_err(SessionError::from),
            Ok(Err(join)) => Err(SessionError::Transport(format!("Adapter open failed: {}", join))),
            Err(_) => {
                // The open is still running on the blocking pool; close
                // whatever it eventually hands back.
                let limit = self.call_timeout;
                let device = port.to_string();
                tokio::spawn(async move {
                    if let Ok(Ok(conn)) = task.await {
                        warn!("Late adapter open on {} completed; closing it", device);
                        release(conn, limit).await;
                    }
                });
                Err(ObdError::Timeout(self.open_timeout.as_millis() as u64).into())
            }
        }
    }

    /// Start the reader, wait for the vehicle and read its VIN
    async fn handshake(&self, conn: &Arc<dyn ObdConnection>) -> Result<String, SessionError> {
        let c = conn.clone();
        blocking(self.call_timeout, move || {
            c.watch(Command::Rpm, None)?;
            c.start()
        })
        .await?;

        tokio::time::sleep(self.settle).await;

        let c = conn.clone();
        let status = blocking(self.call_timeout, move || Ok(c.status())).await?;
        if !status.is_car_connected() {
            return Err(SessionError::Protocol(format!(
                "Connection failed. Status: {}",
                status
            )));
        }

        let c = conn.clone();
        let response = blocking(self.call_timeout, move || c.query(Command::Vin)).await?;
        Ok(response
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| VIN_UNAVAILABLE.to_string()))
    }
}

#[async_trait]
impl VehicleBackend for TransportBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Transport
    }

    async fn connect(&self, port: &str) -> Result<Connected, SessionError> {
        let conn = self.open(port).await?;
        info!("Adapter opened on {}", port);

        match self.handshake(&conn).await {
            Ok(vin) => Ok(Connected {
                link: Arc::new(TransportLink {
                    conn,
                    call_timeout: self.call_timeout,
                    closed: AtomicBool::new(false),
                }),
                vin,
                live_data: LiveData::new(),
            }),
            Err(e) => {
                warn!("Handshake on {} failed: {}", port, e);
                release(conn, self.call_timeout).await;
                Err(e)
            }
        }
    }
}

/// Open adapter connection
struct TransportLink {
    conn: Arc<dyn ObdConnection>,
    call_timeout: Duration,
    closed: AtomicBool,
}

impl TransportLink {
    async fn query(&self, command: Command) -> Result<Response, SessionError> {
        let conn = self.conn.clone();
        blocking(self.call_timeout, move || conn.query(command)).await
    }
}

#[async_trait]
impl VehicleLink for TransportLink {
    fn mode(&self) -> BackendMode {
        BackendMode::Transport
    }

    async fn read_dtcs(&self) -> Result<Option<Vec<Dtc>>, SessionError> {
        match self.query(Command::GetDtc).await?.value {
            None => Ok(None),
            Some(Value::Codes { codes }) => Ok(Some(
                codes
                    .into_iter()
                    .map(|(code, description)| Dtc::new(code, description))
                    .collect(),
            )),
            Some(other) => Err(SessionError::Protocol(format!(
                "Unexpected trouble code response: {}",
                other
            ))),
        }
    }

    async fn clear_dtcs(&self) -> Result<ClearOutcome, SessionError> {
        let value = self.query(Command::ClearDtc).await?.value;
        Ok(ClearOutcome {
            confirmed: value.as_ref().map_or(false, Value::is_truthy),
            detail: value.map_or_else(|| "none".to_string(), |v| v.to_string()),
        })
    }

    async fn watch(&self, command: Command, sink: mpsc::Sender<Response>) -> Result<(), SessionError> {
        let callback: SampleCallback = Arc::new(move |sample: Response| {
            if let Err(e) = sink.try_send(sample) {
                debug!("Dropped live sample: {}", e);
            }
        });
        let conn = self.conn.clone();
        blocking(self.call_timeout, move || conn.watch(command, Some(callback))).await
    }

    async fn unwatch_all(&self) -> Result<(), SessionError> {
        let conn = self.conn.clone();
        blocking(self.call_timeout, move || conn.unwatch_all()).await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        release(self.conn.clone(), self.call_timeout).await;
    }
}

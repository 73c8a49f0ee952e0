//! OBD-II Diagnostics Dashboard API Server
//!
//! REST API over a single diagnostic session. Handlers read state
//! projections and dispatch session commands; all behaviour lives in
//! `obd-session`.

use anyhow::{bail, Context};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use obd_protocol::{Connector, PortLister, SerialPortLister, StaticPortLister};
use obd_session::{ConnectionStatus, Session};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
pub mod error;
mod routes;

pub use crate::config::{AppConfig, LogFormat};
pub use routes::CommandResponse;

/// Application state shared across handlers
pub struct AppState {
    /// The dashboard session
    pub session: Arc<Session>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus renderer, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `GET /metrics` from `handle`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub session_id: String,
    pub connection_status: ConnectionStatus,
    pub mock_mode: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/session", get(routes::session::get_session))
        .route(
            "/api/v1/session/selected-port",
            put(routes::session::put_selected_port),
        )
        .route(
            "/api/v1/session/clear-confirmation",
            put(routes::session::put_clear_confirmation),
        )
        .route("/api/v1/session/mock-mode", put(routes::session::put_mock_mode))
        .route("/api/v1/ports/scan", post(routes::connection::scan_ports))
        .route("/api/v1/connection/connect", post(routes::connection::connect))
        .route(
            "/api/v1/connection/disconnect",
            post(routes::connection::disconnect),
        )
        .route("/api/v1/dtcs/scan", post(routes::diagnostics::scan_dtcs))
        .route(
            "/api/v1/dtcs/clear-dialog",
            post(routes::diagnostics::toggle_clear_dialog),
        )
        .route("/api/v1/dtcs/clear", post(routes::diagnostics::clear_dtcs))
        .route("/api/v1/live/toggle", post(routes::live::toggle_live))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.session.snapshot();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session_id: state.session.id().to_string(),
        connection_status: snapshot.connection_status,
        mock_mode: snapshot.use_mock_mode,
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &AppConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    }
}

/// Build the session described by `config`
///
/// With a connector, ports come from the OS and real mode is available;
/// without one only the simulated vehicle on `mock_ports` is.
pub fn build_session(
    config: &AppConfig,
    connector: Option<Arc<dyn Connector>>,
) -> anyhow::Result<Arc<Session>> {
    let session = match connector {
        Some(connector) => {
            let ports: Arc<dyn PortLister> = Arc::new(SerialPortLister);
            Session::new(config.session.clone(), ports).with_transport(connector)
        }
        None if !config.session.use_mock_mode => bail!(
            "Real mode needs an OBD adapter library; set session.use_mock_mode = true \
             (OBD_DASHBOARD_SESSION__USE_MOCK_MODE=true) or embed the server with a connector"
        ),
        None => {
            let ports: Arc<dyn PortLister> =
                Arc::new(StaticPortLister::new(config.mock_ports.iter().cloned()));
            Session::new(config.session.clone(), ports)
        }
    };
    Ok(Arc::new(session))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the server until interrupted, then release the adapter
pub async fn run_server(
    config: AppConfig,
    connector: Option<Arc<dyn Connector>>,
) -> anyhow::Result<()> {
    let session = build_session(&config, connector)?;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let state = Arc::new(AppState::new(session.clone()).with_metrics(handle));
    let app = create_router(state);

    info!("Starting API server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await;
    info!("Server stopped");
    Ok(())
}

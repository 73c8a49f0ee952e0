//! Connection Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{dispatch, CommandResponse};
use crate::error::ApiError;
use crate::AppState;

/// Refresh available serial ports
pub async fn scan_ports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, |session| async move {
        session.scan_ports().await;
        None
    })
    .await
}

/// Connect on the selected port
pub async fn connect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, |session| async move {
        session.connect().await;
        None
    })
    .await
}

/// Disconnect from the vehicle
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, |session| async move {
        session.disconnect().await;
        None
    })
    .await
}

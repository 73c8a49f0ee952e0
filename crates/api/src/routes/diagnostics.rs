//! Trouble Code Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{dispatch, CommandResponse};
use crate::error::ApiError;
use crate::AppState;

/// Read stored trouble codes
pub async fn scan_dtcs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, |session| async move { session.scan_dtcs().await }).await
}

/// Open or close the clear confirmation dialog
pub async fn toggle_clear_dialog(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    state.session.toggle_clear_dialog();
    Json(CommandResponse::snapshot(&state.session, None))
}

/// Clear trouble codes; requires the typed confirmation
pub async fn clear_dtcs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, |session| async move { session.clear_dtcs().await }).await
}

//! Session Routes

use axum::{extract::State, Json};
use obd_session::SessionState;
use serde::Deserialize;
use std::sync::Arc;

use super::CommandResponse;
use crate::error::ApiError;
use crate::AppState;

/// Body for selecting a port
#[derive(Debug, Deserialize)]
pub struct SelectPortRequest {
    pub port: String,
}

/// Body carrying the typed clear confirmation
#[derive(Debug, Deserialize)]
pub struct ConfirmationRequest {
    pub text: String,
}

/// Body for switching mock mode
#[derive(Debug, Deserialize)]
pub struct MockModeRequest {
    pub enabled: bool,
}

/// Get the full session state
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    Json(state.session.snapshot())
}

/// Select the port used by the next connect
pub async fn put_selected_port(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectPortRequest>,
) -> Json<CommandResponse> {
    state.session.set_selected_port(body.port);
    Json(CommandResponse::snapshot(&state.session, None))
}

/// Update the typed clear confirmation
pub async fn put_clear_confirmation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConfirmationRequest>,
) -> Json<CommandResponse> {
    state.session.set_clear_confirmation_input(body.text);
    Json(CommandResponse::snapshot(&state.session, None))
}

/// Switch between the simulated vehicle and the adapter
pub async fn put_mock_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MockModeRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    state.session.set_mock_mode(body.enabled)?;
    Ok(Json(CommandResponse::snapshot(&state.session, None)))
}

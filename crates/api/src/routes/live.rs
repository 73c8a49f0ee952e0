//! Live Data Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{dispatch, CommandResponse};
use crate::error::ApiError;
use crate::AppState;

/// Start or stop streaming live parameters
pub async fn toggle_live(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, |session| async move { session.toggle_live_watch().await }).await
}

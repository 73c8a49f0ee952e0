//! Route Handlers
//!
//! Commands run in their own task so a client hanging up never cancels an
//! operation halfway through.

pub mod connection;
pub mod diagnostics;
pub mod live;
pub mod session;

use crate::error::ApiError;
use crate::AppState;
use axum::Json;
use obd_session::{Notification, Session, SessionState};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Result of a dashboard command
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Toast to show, if the command produced one
    pub notification: Option<Notification>,
    /// State after the command finished
    pub state: SessionState,
}

impl CommandResponse {
    pub fn snapshot(session: &Session, notification: Option<Notification>) -> Self {
        Self {
            notification,
            state: session.snapshot(),
        }
    }
}

/// Run `command` to completion on its own task and report the outcome
pub(crate) async fn dispatch<F, Fut>(
    state: &AppState,
    command: F,
) -> Result<Json<CommandResponse>, ApiError>
where
    F: FnOnce(Arc<Session>) -> Fut,
    Fut: Future<Output = Option<Notification>> + Send + 'static,
{
    let session = state.session.clone();
    let notification = tokio::spawn(command(session.clone()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(CommandResponse::snapshot(&session, notification)))
}

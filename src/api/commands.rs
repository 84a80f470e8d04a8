//! Command API endpoint.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::commands;
use crate::errors::ClanError;
use crate::models::{CommandReply, CommandRequest};
use crate::AppState;

/// POST /api/commands - Run a clan command as the given actor.
pub async fn run_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> ApiResult<CommandReply> {
    if request.actor.trim().is_empty() {
        return Err(ClanError::InvalidInput("Actor is required".to_string()));
    }

    let actor = state.privileges.actor(&request.actor);
    let reply = commands::execute(&state.registry, &actor, &request.command, &request.target)
        .await
        .inspect_err(|e| {
            if e.is_fault() {
                tracing::warn!(actor = %actor.id, command = %request.command, "Command failed: {}", e);
            } else {
                tracing::debug!(actor = %actor.id, command = %request.command, "Command rejected: {}", e);
            }
        })?;
    success(reply)
}

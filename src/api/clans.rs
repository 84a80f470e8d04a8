//! Read-only clan and modlog endpoints.

use axum::extract::{Path, Query, State};

use super::{success, ApiResult};
use crate::errors::ClanError;
use crate::models::{AuditEntry, ClanData, ModlogQuery};
use crate::AppState;

const MAX_MODLOG_LIMIT: u32 = 500;

/// GET /api/clans - List all clans.
pub async fn list_clans(State(state): State<AppState>) -> ApiResult<Vec<ClanData>> {
    success(state.registry.list_clans().await?)
}

/// GET /api/clans/:id - Get a single clan by name or id.
pub async fn get_clan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ClanData> {
    match state.registry.get_clan(&id).await? {
        Some(clan) => success(clan),
        None => Err(ClanError::UnknownClan(id)),
    }
}

/// GET /api/modlog - Most recent modlog entries.
pub async fn list_modlog(
    State(state): State<AppState>,
    Query(query): Query<ModlogQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let limit = query.limit.clamp(1, MAX_MODLOG_LIMIT);
    success(state.repo.list_audit(limit).await?)
}

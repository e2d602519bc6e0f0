use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::error::PortalError;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub content_deleted: u64,
    pub users_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Wipe every record. Stored objects are left in place. Test mode only.
pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let stats = state.db.purge_all().map_err(PortalError::from)?;

    tracing::warn!(users = stats.users, content = stats.content, "Purged all data");

    Ok(Json(PurgeResponse {
        content_deleted: stats.content,
        users_deleted: stats.users,
    }))
}

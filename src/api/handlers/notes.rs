use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::auth::Identity;
use crate::error::PortalError;
use crate::storage::models::NoteRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub content: String,
    pub username: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveNoteRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteNoteResponse {
    pub deleted: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// The caller's note, or an empty one if nothing was saved yet.
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<NoteResponse>, ApiError> {
    let note = state.db.get_note(&identity.id).map_err(PortalError::from)?;

    Ok(Json(match note {
        Some(note) => note_to_response(&note),
        None => NoteResponse {
            content: String::new(),
            username: None,
            updated_at: None,
        },
    }))
}

pub async fn save_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    AppJson(req): AppJson<SaveNoteRequest>,
) -> Result<Json<NoteResponse>, ApiError> {
    let note = state
        .db
        .upsert_note(&identity.id, &identity.name, &req.content)
        .map_err(PortalError::from)?;

    tracing::debug!(user_id = %identity.id, "Saved note");
    Ok(Json(note_to_response(&note)))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DeleteNoteResponse>, ApiError> {
    let deleted = state
        .db
        .delete_note(&identity.id)
        .map_err(PortalError::from)?;

    Ok(Json(DeleteNoteResponse { deleted }))
}

fn note_to_response(note: &NoteRecord) -> NoteResponse {
    NoteResponse {
        content: note.content.clone(),
        username: Some(note.username.clone()),
        updated_at: Some(note.updated_at.to_rfc3339()),
    }
}

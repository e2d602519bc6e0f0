use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use bytes::BytesMut;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppQuery};
use crate::auth::Identity;
use crate::error::PortalError;
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::DatabaseError;
use crate::storage::models::{ContentRecord, ContentType};
use crate::AppState;

/// Public path prefix under which stored objects are served
pub const UPLOADS_PREFIX: &str = "/uploads/";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub tags: Vec<String>,
    pub file_url: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub uploaded_by: String,
    pub views: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListContentParams {
    #[serde(default, rename = "type")]
    pub content_type: Option<ContentType>,
}

/// The `file` part of an upload, buffered in memory.
struct UploadedFile {
    data: BytesMut,
    file_name: Option<String>,
    content_type: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_content(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ContentResponse>), ApiError> {
    let limits = &state.config.limits;

    let mut file: Option<UploadedFile> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut tags: Option<String> = None;
    let mut type_field: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());

                // The type part may arrive after the file; until then allow the larger limit
                let limit = match type_field.as_deref().map(str::parse::<ContentType>) {
                    Some(Ok(t)) => size_limit(&state, t),
                    _ => limits.max_upload_size(),
                };

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if (data.len() + chunk.len()) as u64 > limit {
                        return Err(PortalError::PayloadTooLarge(limit).into());
                    }
                    data.extend_from_slice(&chunk);
                }

                file = Some(UploadedFile {
                    data,
                    file_name,
                    content_type,
                });
            }
            "title" => title = Some(read_text(field, "title").await?),
            "description" => description = Some(read_text(field, "description").await?),
            "tags" => tags = Some(read_text(field, "tags").await?),
            "type" => type_field = Some(read_text(field, "type").await?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    // A browser sends an empty part when no file was picked
    let file = file
        .filter(|f| !f.data.is_empty())
        .ok_or(PortalError::MissingFile)?;

    let content_type: ContentType = type_field
        .ok_or_else(|| PortalError::Validation("type field is required".to_string()))?
        .parse()
        .map_err(PortalError::Validation)?;

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PortalError::Validation("title field is required".to_string()))?;

    let limit = size_limit(&state, content_type);
    if file.data.len() as u64 > limit {
        return Err(PortalError::PayloadTooLarge(limit).into());
    }

    let mime_type = resolve_mime(file.content_type.as_deref(), file.file_name.as_deref());
    if !content_type.accepts_mime(&mime_type) {
        return Err(PortalError::UnsupportedMedia(format!(
            "{mime_type} is not an accepted {content_type} format"
        ))
        .into());
    }

    let byte_size = file.data.len() as u64;
    let key = storage_key(file.file_name.as_deref());

    // Phase 1: write the bytes under a name nobody else can hold
    store_object(&state, &key, file.data).await?;

    // Phase 2: record the metadata, pointing at the stored object
    let now = Utc::now();
    let record = ContentRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        description: description.map(|d| d.trim().to_string()).unwrap_or_default(),
        content_type,
        tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
        file_url: format!("{UPLOADS_PREFIX}{key}"),
        storage_key: key.clone(),
        mime_type,
        byte_size,
        uploaded_by: identity.id.clone(),
        views: 0,
        created_at: now,
        updated_at: now,
    };

    let inserted = state.db.insert_content(&record);
    discard_on_failure(state.object_store.as_ref(), &key, inserted).await?;

    tracing::info!(
        content_id = %record.id,
        user_id = %identity.id,
        content_type = %content_type,
        byte_size,
        "Uploaded content"
    );

    Ok((StatusCode::CREATED, Json(content_to_response(&record))))
}

pub async fn my_uploads(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<ContentResponse>>, ApiError> {
    let items = state
        .db
        .list_content_by_owner(&identity.id)
        .map_err(PortalError::from)?;

    Ok(Json(items.iter().map(content_to_response).collect()))
}

pub async fn all_content(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListContentParams>,
) -> Result<Json<Vec<ContentResponse>>, ApiError> {
    let items = state
        .db
        .list_all_content(params.content_type)
        .map_err(PortalError::from)?;

    Ok(Json(items.iter().map(content_to_response).collect()))
}

// ============================================================================
// Helpers
// ============================================================================

async fn store_object(state: &AppState, key: &str, data: BytesMut) -> Result<(), PortalError> {
    let timeout = Duration::from_secs(state.config.storage.timeout_secs);

    match tokio::time::timeout(timeout, state.object_store.put(key, data.freeze())).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(ObjectStoreError::Timeout)) => {
            Err(PortalError::Timeout(format!("storing object {key}")))
        }
        Ok(Err(e)) => Err(PortalError::UploadFailed(format!("storing object {key}: {e}"))),
        Err(_) => {
            // The write was abandoned part way; remove whatever landed
            let store = Arc::clone(&state.object_store);
            let key_owned = key.to_string();
            tokio::spawn(async move {
                if let Err(e) = store.delete(&key_owned).await {
                    tracing::warn!(key = %key_owned, error = %e, "Failed to remove partial object");
                }
            });
            Err(PortalError::Timeout(format!("storing object {key}")))
        }
    }
}

/// Remove the stored object when its metadata record could not be written.
async fn discard_on_failure(
    store: &dyn ObjectStore,
    key: &str,
    inserted: Result<(), DatabaseError>,
) -> Result<(), PortalError> {
    let Err(e) = inserted else {
        return Ok(());
    };

    // Best-effort cleanup of the orphaned blob
    if let Err(cleanup) = store.delete(key).await {
        tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned object");
    }
    Err(PortalError::UploadFailed(format!("metadata write failed: {e}")))
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid {name}: {}", e.body_text())))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(e.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    }
}

fn size_limit(state: &AppState, content_type: ContentType) -> u64 {
    match content_type {
        ContentType::Paper => state.config.limits.max_paper_size,
        ContentType::Video => state.config.limits.max_video_size,
    }
}

/// Split a comma separated tag list, dropping blanks. Order is preserved.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Name for a new object: `file-<unix millis>-<uuid><.ext>`.
///
/// The UUID makes names unique even for uploads in the same millisecond.
pub fn storage_key(original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    format!(
        "file-{}-{}{}",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        ext
    )
}

/// MIME type from the part's Content-Type, or guessed from the filename.
fn resolve_mime(content_type: Option<&str>, file_name: Option<&str>) -> String {
    content_type
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(|ct| ct.to_string())
        .or_else(|| {
            file_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn content_to_response(content: &ContentRecord) -> ContentResponse {
    ContentResponse {
        id: content.id.clone(),
        title: content.title.clone(),
        description: content.description.clone(),
        content_type: content.content_type,
        tags: content.tags.clone(),
        file_url: content.file_url.clone(),
        mime_type: content.mime_type.clone(),
        byte_size: content.byte_size,
        uploaded_by: content.uploaded_by.clone(),
        views: content.views,
        created_at: content.created_at.to_rfc3339(),
        updated_at: content.updated_at.to_rfc3339(),
    }
}

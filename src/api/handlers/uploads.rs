use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::api::response::ApiError;
use crate::error::PortalError;
use crate::object_store::ObjectStoreError;
use crate::AppState;

/// Stream a stored object back to the client.
/// Route: GET /uploads/:key
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let timeout = Duration::from_secs(state.config.storage.timeout_secs);

    let stream = tokio::time::timeout(timeout, state.object_store.get_stream(&key))
        .await
        .map_err(|_| PortalError::Timeout(format!("opening object {key}")))?
        .map_err(|e| match e {
            ObjectStoreError::NotFound(_) | ObjectStoreError::InvalidKey(_) => {
                PortalError::NotFound("File not found")
            }
            ObjectStoreError::Timeout => PortalError::Timeout(format!("opening object {key}")),
            other => PortalError::ObjectStore(other),
        })?;

    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();

    let mime_type = mime_guess::from_path(&key).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .as_ref()
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    if let Ok(value) = format!("inline; filename=\"{key}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Stored objects are never rewritten, so they can be cached aggressively
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600, immutable"),
    );

    Ok(response)
}

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use super::token::verify_token;
use crate::api::response::ApiError;
use crate::error::PortalError;
use crate::AppState;

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Middleware that requires a valid bearer token.
///
/// On success the caller's `Identity` is inserted into the request extensions.
/// Otherwise the request is answered with 401 and never reaches the handler.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(PortalError::Unauthenticated)?;
    let identity = verify_token(token, &state.config.auth.jwt_secret)?;

    tracing::debug!(user_id = %identity.id, "Authenticated request");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

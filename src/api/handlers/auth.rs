use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, MessageResponse};
use crate::auth::service::{
    self, AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};
use crate::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = service::register(&state, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(service::login(&state, req).await?))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::forgot_password(&state, req).await?;
    Ok(MessageResponse::new("Password reset link sent!"))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::reset_password(&state, req).await?;
    Ok(MessageResponse::new("Password has been reset"))
}

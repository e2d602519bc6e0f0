//! Registration, login and password recovery.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::password::{dummy_hash, hash_password, verify_password};
use super::token::{generate_reset_token, issue_token, reset_token_digest};
use crate::config::MAX_RESET_TOKEN_TTL_SECS;
use crate::error::PortalError;
use crate::external::MailMessage;
use crate::storage::models::{ResetTokenRecord, Role, UserRecord};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Public user fields plus a freshly issued bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

/// Canonical form used for uniqueness and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), PortalError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

async fn hash_blocking(password: String) -> Result<String, PortalError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

fn auth_response(state: &AppState, user: &UserRecord) -> Result<AuthResponse, PortalError> {
    let token = issue_token(
        user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_secs,
    )?;

    Ok(AuthResponse {
        id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        token,
    })
}

/// Expiry of a reset link issued at `now`, clamped to the longest allowed lifetime.
fn reset_expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let ttl = ttl_secs.min(MAX_RESET_TOKEN_TTL_SECS) as i64;
    now + Duration::seconds(ttl)
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthResponse, PortalError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(PortalError::Validation("name must not be empty".to_string()));
    }

    let email = normalize_email(&req.email);
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(PortalError::Validation("email is not valid".to_string()));
    }
    validate_password(&req.password)?;

    // Cheap pre-check so duplicates skip the hashing cost; insert_user re-checks atomically
    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(PortalError::DuplicateUser);
    }

    let password_hash = hash_blocking(req.password).await?;
    let now = Utc::now();
    let user = UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        role: req.role,
        created_at: now,
        updated_at: now,
    };

    if !state.db.insert_user(&user)? {
        return Err(PortalError::DuplicateUser);
    }

    tracing::info!(user_id = %user.id, role = %user.role, "Registered user");
    auth_response(state, &user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, PortalError> {
    let email = normalize_email(&req.email);
    let user = state.db.get_user_by_email(&email)?;

    // Unknown emails still pay for one verification so timing does not reveal them
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_password(&password, dummy_hash()?).map(|_| false),
    })
    .await??;

    let user = match user {
        Some(user) if matches => user,
        Some(user) => {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(PortalError::InvalidCredentials);
        }
        None => return Err(PortalError::InvalidCredentials),
    };

    tracing::debug!(user_id = %user.id, "User logged in");
    auth_response(state, &user)
}

/// Mail a single-use reset link to a registered address.
pub async fn forgot_password(
    state: &AppState,
    req: ForgotPasswordRequest,
) -> Result<(), PortalError> {
    let email = normalize_email(&req.email);
    let user = state
        .db
        .get_user_by_email(&email)?
        .ok_or(PortalError::UserNotFound)?;

    let token = generate_reset_token()?;
    let now = Utc::now();
    let record = ResetTokenRecord {
        user_id: user.id.clone(),
        created_at: now,
        expires_at: reset_expiry(now, state.config.auth.reset_token_ttl_secs),
    };
    state.db.put_reset_token(&reset_token_digest(&token), &record)?;

    let reset_url = format!(
        "{}/reset-password/{}",
        state.config.auth.reset_link_base.trim_end_matches('/'),
        token
    );
    let message = MailMessage {
        to: user.email.clone(),
        subject: "Password Reset".to_string(),
        text: format!("Click the link to reset your password: {reset_url}"),
    };
    state.mailer.send(&message).await?;

    tracing::info!(user_id = %user.id, "Password reset link sent");
    Ok(())
}

/// Consume a reset token and set a new password.
pub async fn reset_password(
    state: &AppState,
    req: ResetPasswordRequest,
) -> Result<(), PortalError> {
    validate_password(&req.password)?;

    let record = state
        .db
        .take_reset_token(&reset_token_digest(req.token.trim()))?
        .ok_or(PortalError::InvalidResetToken)?;

    if record.expires_at <= Utc::now() {
        return Err(PortalError::InvalidResetToken);
    }

    let password_hash = hash_blocking(req.password).await?;
    if !state
        .db
        .update_user_password(&record.user_id, &password_hash)?
    {
        return Err(PortalError::InvalidResetToken);
    }

    tracing::info!(user_id = %record.user_id, "Password reset");
    Ok(())
}

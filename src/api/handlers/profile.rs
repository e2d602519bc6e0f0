use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::auth::Identity;
use crate::error::PortalError;
use crate::storage::models::{ProfileRecord, ProfileUpdate};
use crate::AppState;

const MAX_ABOUT_LEN: usize = 200;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub study: String,
    pub about: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub study: Option<String>,
    pub about: Option<String>,
}

/// The caller's profile, created from their account on first access.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if let Some(profile) = state.db.get_profile(&identity.id).map_err(PortalError::from)? {
        return Ok(Json(profile_to_response(&profile)));
    }

    let user = state
        .db
        .get_user(&identity.id)
        .map_err(PortalError::from)?
        .ok_or(PortalError::UserNotFound)?;

    let now = Utc::now();
    let default_profile = ProfileRecord {
        user_id: user.id,
        name: user.name,
        email: user.email,
        phone: String::new(),
        study: String::new(),
        about: String::new(),
        created_at: now,
        updated_at: now,
    };

    let profile = state
        .db
        .get_or_insert_profile(&default_profile)
        .map_err(PortalError::from)?;

    tracing::debug!(user_id = %identity.id, "Created default profile");
    Ok(Json(profile_to_response(&profile)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if let Some(ref about) = req.about {
        if about.chars().count() > MAX_ABOUT_LEN {
            return Err(PortalError::Validation(format!(
                "about must be at most {MAX_ABOUT_LEN} characters"
            ))
            .into());
        }
    }
    if matches!(req.name.as_deref(), Some(n) if n.trim().is_empty()) {
        return Err(PortalError::Validation("name must not be empty".to_string()).into());
    }

    let update = ProfileUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        email: req.email.map(|e| e.trim().to_string()),
        phone: req.phone,
        study: req.study,
        about: req.about,
    };

    let profile = state
        .db
        .update_profile(&identity.id, &update)
        .map_err(PortalError::from)?
        .ok_or(PortalError::NotFound("Profile not found"))?;

    tracing::debug!(user_id = %identity.id, "Updated profile");
    Ok(Json(profile_to_response(&profile)))
}

fn profile_to_response(profile: &ProfileRecord) -> ProfileResponse {
    ProfileResponse {
        user: profile.user_id.clone(),
        name: profile.name.clone(),
        email: profile.email.clone(),
        phone: profile.phone.clone(),
        study: profile.study.clone(),
        about: profile.about.clone(),
        created_at: profile.created_at.to_rfc3339(),
        updated_at: profile.updated_at.to_rfc3339(),
    }
}

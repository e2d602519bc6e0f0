use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use crate::storage::models::{Role, UserRecord};

/// JWT claims carried by a bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    pub name: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// The authenticated caller, attached to protected requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// Create a signed bearer token for a user.
pub fn issue_token(user: &UserRecord, secret: &[u8], ttl_secs: u64) -> Result<String, PortalError> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;

    let claims = Claims {
        sub: user.id.clone(),
        name: user.name.clone(),
        role: user.role,
        iat: now,
        exp: now.saturating_add(ttl_secs),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| PortalError::Internal(format!("failed to sign token: {e}")))
}

/// Check signature and expiry. No store lookup: the token is self-contained.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<Identity, PortalError> {
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            PortalError::Unauthenticated
        },
    )?;

    if data.claims.sub.is_empty() {
        return Err(PortalError::Unauthenticated);
    }

    Ok(Identity {
        id: data.claims.sub,
        name: data.claims.name,
        role: data.claims.role,
    })
}

/// A fresh URL-safe password reset token (256 random bits).
pub fn generate_reset_token() -> Result<String, PortalError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| PortalError::Internal("failed to generate reset token".to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Storage key for a reset token. Only the digest is persisted.
pub fn reset_token_digest(token: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_ref())
}

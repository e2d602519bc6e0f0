use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::OnceLock;

use crate::error::PortalError;

/// Hash a password with Argon2id and a fresh random salt.
///
/// CPU-heavy: call from `spawn_blocking` on request paths.
pub fn hash_password(password: &str) -> Result<String, PortalError> {
    let mut salt_bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| PortalError::Internal("failed to generate password salt".to_string()))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| PortalError::Internal(format!("salt encoding error: {e}")))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PortalError::Internal(format!("argon2 hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PortalError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PortalError::Internal(format!("stored hash is unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// A valid Argon2id hash of a throwaway password.
///
/// Login verifies against this when the email is unknown, so both outcomes
/// cost one Argon2 run.
pub fn dummy_hash() -> Result<&'static str, PortalError> {
    static DUMMY: OnceLock<String> = OnceLock::new();

    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = hash_password("no-such-account")?;
    Ok(DUMMY.get_or_init(|| hash))
}

use thiserror::Error;

use crate::external::ExternalError;
use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

/// Domain failures of the portal's operations.
///
/// Handlers turn these into HTTP responses through `ApiError`; variants that
/// carry internal detail are logged there and never shown to the client.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("User already exists")]
    DuplicateUser,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authorized, token missing or invalid")]
    Unauthenticated,
    #[error("User not found")]
    UserNotFound,
    #[error("file field is required")]
    MissingFile,
    #[error("{0}")]
    UnsupportedMedia(String),
    #[error("File exceeds maximum upload size of {0} bytes")]
    PayloadTooLarge(u64),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Reset link is invalid or has expired")]
    InvalidResetToken,
    #[error("{0}")]
    Validation(String),
    #[error("Upstream request timed out: {0}")]
    Timeout(String),
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ExternalError> for PortalError {
    fn from(e: ExternalError) -> Self {
        match e {
            ExternalError::Timeout(_) => PortalError::Timeout(e.to_string()),
            _ => PortalError::Upstream(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for PortalError {
    fn from(e: tokio::task::JoinError) -> Self {
        PortalError::Internal(format!("blocking task failed: {e}"))
    }
}

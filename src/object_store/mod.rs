mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Object already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Object store request timed out")]
    Timeout,
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Byte stream of a stored object.
pub type ObjectStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Abstraction over object storage backends.
///
/// Keys are flat generated names; the metadata record is what ties a key to a
/// user. Writes never replace an existing object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a new object. Fails with `AlreadyExists` if the key is taken.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get_stream(&self, key: &str) -> Result<ObjectStream, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

/// Reject keys that could escape a flat namespace.
pub fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    let valid = !key.is_empty()
        && key.len() <= 255
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidKey(key.to_string()))
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{validate_key, ObjectStore, ObjectStoreError, ObjectStream};

/// Access tokens are valid for an hour; refresh well before that.
const TOKEN_REFRESH_AFTER: Duration = Duration::from_secs(45 * 60);

/// Google Cloud Storage object store backend.
pub struct GcsStore {
    bucket: String,
    client: Client,
    access_token: tokio::sync::RwLock<CachedToken>,
    credentials_file: Option<String>,
    timeout: Duration,
}

struct CachedToken {
    value: String,
    fetched_at: Instant,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

/// Assertion exchanged for an access token at the service account's token URI
#[derive(Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl GcsStore {
    pub async fn new(
        bucket: &str,
        credentials_file: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let client = Client::builder().connect_timeout(timeout).build()?;

        let store = Self {
            bucket: bucket.to_string(),
            client,
            access_token: tokio::sync::RwLock::new(CachedToken {
                value: String::new(),
                fetched_at: Instant::now(),
            }),
            credentials_file: credentials_file.map(|s| s.to_string()),
            timeout,
        };

        store.refresh_token().await?;
        Ok(store)
    }

    async fn refresh_token(&self) -> Result<(), anyhow::Error> {
        let token = if let Some(ref creds_path) = self.credentials_file {
            self.token_from_service_account(creds_path).await?
        } else {
            self.token_from_metadata_server().await?
        };

        let mut lock = self.access_token.write().await;
        *lock = CachedToken {
            value: token,
            fetched_at: Instant::now(),
        };
        Ok(())
    }

    /// Current access token, refreshed first if it is close to expiry.
    async fn bearer(&self) -> Result<String, ObjectStoreError> {
        {
            let cached = self.access_token.read().await;
            if cached.fetched_at.elapsed() < TOKEN_REFRESH_AFTER {
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!(bucket = %self.bucket, "Refreshing GCS access token");
        self.refresh_token()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("GCS token refresh failed: {e}")))?;
        Ok(self.access_token.read().await.value.clone())
    }

    async fn token_from_service_account(&self, path: &str) -> Result<String, anyhow::Error> {
        let key_json = tokio::fs::read_to_string(path).await?;
        let key: ServiceAccountKey = serde_json::from_str(&key_json)?;

        let jwt = service_account_assertion(&key, chrono::Utc::now().timestamp())?;

        let resp: TokenResponse = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    async fn token_from_metadata_server(&self) -> Result<String, anyhow::Error> {
        let resp: TokenResponse = self
            .client
            .get("http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token")
            .header("Metadata-Flavor", "Google")
            .timeout(self.timeout)
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&ifGenerationMatch=0&name={}",
            self.bucket, key
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}?alt=media",
            self.bucket, key
        )
    }

    fn object_meta_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}",
            self.bucket, key
        )
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let token = self.bearer().await?;

        let resp = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(&token)
            .header("Content-Type", "application/octet-stream")
            .timeout(self.timeout)
            .body(data)
            .send()
            .await
            .map_err(request_error)?;

        // ifGenerationMatch=0 makes GCS refuse to replace a live object
        if resp.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(ObjectStoreError::AlreadyExists(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS upload failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get_stream(&self, key: &str) -> Result<ObjectStream, ObjectStoreError> {
        validate_key(key)?;
        let token = self.bearer().await?;

        // Only the response head is bounded; large bodies stream for as long as they need
        let resp = tokio::time::timeout(
            self.timeout,
            self.client.get(self.object_url(key)).bearer_auth(&token).send(),
        )
        .await
        .map_err(|_| ObjectStoreError::Timeout)?
        .map_err(request_error)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS download failed ({status}): {body}"
            )));
        }

        Ok(resp.bytes_stream().map(|r| r.map_err(std::io::Error::other)).boxed())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let token = self.bearer().await?;

        let resp = self
            .client
            .delete(self.object_meta_url(key))
            .bearer_auth(&token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(request_error)?;

        // 404 is fine -- object already gone
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS delete failed ({status}): {body}"
            )));
        }

        Ok(())
    }
}

fn request_error(e: reqwest::Error) -> ObjectStoreError {
    if e.is_timeout() {
        ObjectStoreError::Timeout
    } else {
        ObjectStoreError::Backend(e.to_string())
    }
}

/// RS256 JWT assertion for the service account's OAuth token exchange.
fn service_account_assertion(
    key: &ServiceAccountKey,
    now: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = ServiceAccountClaims {
        iss: &key.client_email,
        scope: "https://www.googleapis.com/auth/devstorage.read_write",
        aud: &key.token_uri,
        iat: now,
        exp: now + 3600,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
    )
}

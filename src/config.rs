use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Largest per-type upload limit accepted from the environment (4 GiB)
pub const MAX_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024 * 1024;
/// Longest bearer token lifetime accepted from the environment (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;
/// Longest reset link lifetime accepted from the environment (one week)
pub const MAX_RESET_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub limits: UploadLimits,
    pub llm: LlmConfig,
    pub mail: MailConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Browser origin allowed by CORS (the frontend dev server by default)
    pub cors_origin: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign bearer tokens
    pub jwt_secret: Vec<u8>,
    pub token_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    /// Prefix of the link mailed by the forgot-password flow
    pub reset_link_base: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("reset_token_ttl_secs", &self.reset_token_ttl_secs)
            .field("reset_link_base", &self.reset_link_base)
            .finish()
    }
}

/// Per content type upload ceilings, in bytes
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_paper_size: u64,
    pub max_video_size: u64,
}

impl UploadLimits {
    /// Largest payload any upload may carry, used as the route body limit.
    pub fn max_upload_size(&self) -> u64 {
        self.max_paper_size.max(self.max_video_size)
    }
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
    /// Upper bound on a single object store call
    pub timeout_secs: u64,
}

#[derive(Clone)]
pub struct MailConfig {
    /// HTTP mail relay endpoint. Mail is only logged when unset.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Sent as HTTP-Referer, OpenRouter uses it for attribution
    pub referer: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("referer", &self.referer)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_paper_size: 10 * 1024 * 1024,  // 10MB
            max_video_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./uploads".to_string(),
            gcs_bucket: None,
            gcs_credentials_file: None,
            timeout_secs: 30,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            from: "no-reply@eduportal.local".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            api_key: None,
            model: "openai/gpt-3.5-turbo".to_string(),
            referer: "http://localhost:3000".to_string(),
            timeout_secs: 15,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(server_defaults.bind_address),
            data_dir: std::env::var("DATA_DIR").unwrap_or(server_defaults.data_dir),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or(server_defaults.cors_origin),
        };

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret.into_bytes(),
            // Ephemeral secret: tokens do not survive a restart
            Err(_) if test_mode => uuid::Uuid::new_v4().as_bytes().to_vec(),
            Err(_) => Vec::new(),
        };

        let auth = AuthConfig {
            jwt_secret,
            token_ttl_secs: env_u64("TOKEN_TTL_SECS", 30 * 24 * 60 * 60),
            reset_token_ttl_secs: env_u64("RESET_TOKEN_TTL_SECS", 60 * 60),
            reset_link_base: std::env::var("RESET_LINK_BASE")
                .unwrap_or_else(|_| server.cors_origin.clone()),
        };

        let limit_defaults = UploadLimits::default();
        let limits = UploadLimits {
            max_paper_size: env_u64("MAX_PAPER_SIZE", limit_defaults.max_paper_size),
            max_video_size: env_u64("MAX_VIDEO_SIZE", limit_defaults.max_video_size),
        };

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let storage = StorageConfig {
            backend: storage_backend,
            local_storage_path: std::env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./uploads".to_string()),
            gcs_bucket: std::env::var("GCS_BUCKET").ok(),
            gcs_credentials_file: std::env::var("GCS_CREDENTIALS_FILE").ok(),
            timeout_secs: env_u64("STORAGE_TIMEOUT_SECS", 30),
        };

        let mail_defaults = MailConfig::default();
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL").ok(),
            api_key: std::env::var("MAIL_API_KEY").ok(),
            from: std::env::var("MAIL_FROM").unwrap_or(mail_defaults.from),
            timeout_secs: env_u64("MAIL_TIMEOUT_SECS", mail_defaults.timeout_secs),
        };

        let llm_defaults = LlmConfig::default();
        let llm = LlmConfig {
            api_url: std::env::var("OPENROUTER_API_URL").unwrap_or(llm_defaults.api_url),
            api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            model: std::env::var("OPENROUTER_MODEL").unwrap_or(llm_defaults.model),
            referer: std::env::var("FRONTEND_URL").unwrap_or(llm_defaults.referer),
            timeout_secs: env_u64("LLM_TIMEOUT_SECS", llm_defaults.timeout_secs),
        };

        let config = Config {
            auth,
            limits,
            llm,
            mail,
            server,
            storage,
            test_mode,
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults with test mode on and a fixed signing secret. Used by integration tests.
    pub fn test_default() -> Self {
        let server = ServerConfig::default();
        Config {
            auth: AuthConfig {
                jwt_secret: b"test-secret-test-secret-test-secret".to_vec(),
                token_ttl_secs: 60 * 60,
                reset_token_ttl_secs: 60 * 60,
                reset_link_base: server.cors_origin.clone(),
            },
            limits: UploadLimits::default(),
            llm: LlmConfig::default(),
            mail: MailConfig::default(),
            server,
            storage: StorageConfig::default(),
            test_mode: true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "JWT_SECRET must be set".to_string(),
            ));
        }

        if self.auth.jwt_secret.len() < 32 && !self.test_mode {
            tracing::warn!(
                "JWT_SECRET is shorter than 32 bytes. Use a longer random secret in production."
            );
        }

        for (name, value) in [
            ("MAX_PAPER_SIZE", self.limits.max_paper_size),
            ("MAX_VIDEO_SIZE", self.limits.max_video_size),
        ] {
            check_range(name, value, MAX_UPLOAD_LIMIT)?;
        }
        check_range("TOKEN_TTL_SECS", self.auth.token_ttl_secs, MAX_TOKEN_TTL_SECS)?;
        check_range(
            "RESET_TOKEN_TTL_SECS",
            self.auth.reset_token_ttl_secs,
            MAX_RESET_TOKEN_TTL_SECS,
        )?;

        if matches!(self.storage.backend, StorageBackend::Gcs) && self.storage.gcs_bucket.is_none()
        {
            return Err(ConfigError::ValidationError(
                "GCS_BUCKET is required when STORAGE_BACKEND=gcs".to_string(),
            ));
        }

        if self.storage.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "STORAGE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if axum::http::HeaderValue::from_str(&self.server.cors_origin).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "CORS_ORIGIN is not a valid origin: {}",
                self.server.cors_origin
            )));
        }

        if self.mail.api_url.is_none() {
            tracing::warn!("MAIL_API_URL is not set. Outgoing mail will only be logged.");
        }

        Ok(())
    }
}

fn check_range(name: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be between 1 and {max} (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::test_default().validate().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut config = Config::test_default();
        config.auth.jwt_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn gcs_requires_a_bucket() {
        let mut config = Config::test_default();
        config.storage.backend = StorageBackend::Gcs;
        assert!(config.validate().is_err());

        config.storage.gcs_bucket = Some("portal-uploads".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_storage_timeout_is_rejected() {
        let mut config = Config::test_default();
        config.storage.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cors_origin_must_be_a_header_value() {
        let mut config = Config::test_default();
        config.server.cors_origin = "http://bad\norigin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_limits_and_lifetimes_are_rejected() {
        let mut config = Config::test_default();
        config.limits.max_video_size = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::test_default();
        config.limits.max_paper_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::test_default();
        config.auth.token_ttl_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::test_default();
        config.auth.reset_token_ttl_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::test_default();
        config.auth.reset_token_ttl_secs = MAX_RESET_TOKEN_TTL_SECS;
        config.auth.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        config.limits.max_video_size = MAX_UPLOAD_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn upload_ceiling_is_the_larger_limit() {
        let limits = UploadLimits {
            max_paper_size: 10,
            max_video_size: 100,
        };
        assert_eq!(limits.max_upload_size(), 100);
    }
}

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use crate::object_store::ObjectStoreError;

// ============================================================================
// Error status enum
// ============================================================================

/// `fail` for problems with the request (4xx), `error` for server faults (5xx).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStatus {
    Error,
    Fail,
}

// ============================================================================
// Error body
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: ErrorStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<MessageResponse> {
        Json(MessageResponse {
            message: message.into(),
        })
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// An HTTP error that is either a fail (4xx) or an error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (code, body) = match self {
            ApiError::Fail(code, message) => (
                code,
                ErrorBody {
                    message,
                    status: ErrorStatus::Fail,
                },
            ),
            ApiError::Error(code, message) => (
                code,
                ErrorBody {
                    message,
                    status: ErrorStatus::Error,
                },
            ),
        };
        (code, Json(body)).into_response()
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNAUTHORIZED, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::BAD_GATEWAY, message.into())
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::GATEWAY_TIMEOUT, message.into())
    }
}

impl From<PortalError> for ApiError {
    fn from(e: PortalError) -> Self {
        match e {
            PortalError::DuplicateUser
            | PortalError::MissingFile
            | PortalError::UnsupportedMedia(_)
            | PortalError::InvalidResetToken
            | PortalError::Validation(_) => ApiError::bad_request(e.to_string()),
            PortalError::InvalidCredentials | PortalError::Unauthenticated => {
                ApiError::unauthorized(e.to_string())
            }
            PortalError::UserNotFound | PortalError::NotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            PortalError::PayloadTooLarge(_) => ApiError::payload_too_large(e.to_string()),
            PortalError::ObjectStore(ObjectStoreError::NotFound(_))
            | PortalError::ObjectStore(ObjectStoreError::InvalidKey(_)) => {
                ApiError::not_found("File not found")
            }
            PortalError::UploadFailed(ref detail) => {
                tracing::error!(error = %detail, "Upload failed");
                ApiError::internal("Upload failed")
            }
            PortalError::Timeout(ref detail) => {
                tracing::error!(error = %detail, "Upstream timeout");
                ApiError::gateway_timeout("The request timed out, please try again")
            }
            PortalError::Upstream(ref detail) => {
                tracing::error!(error = %detail, "Upstream service failure");
                ApiError::bad_gateway("An upstream service is unavailable")
            }
            PortalError::Database(ref err) => {
                tracing::error!(error = %err, "Database failure");
                ApiError::internal("Internal server error")
            }
            PortalError::ObjectStore(ref err) => {
                tracing::error!(error = %err, "Object store failure");
                ApiError::internal("Internal server error")
            }
            PortalError::Internal(ref detail) => {
                tracing::error!(error = %detail, "Internal failure");
                ApiError::internal("Internal server error")
            }
        }
    }
}

// ============================================================================
// Custom extractors (reject with JSON ApiError bodies)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with an `ApiError`.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with an `ApiError`.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(format!("Invalid query parameter: {e}")))
    }
}

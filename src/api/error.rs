use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::error::{AuthError, LookupError, MusicError, OrchestratorError, PlaylistError};

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400
    #[error("{0}")]
    BadRequest(String),

    /// 401
    #[error("{0}")]
    Unauthorized(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 502
    #[error("{0}")]
    Upstream(String),

    /// 503
    #[error("{0}")]
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound(_) => ApiError::NotFound(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::ConfigMissing(_) => ApiError::Unavailable(e.to_string()),
            AuthError::Expired(_) | AuthError::Exchange(_) => ApiError::Unauthorized(e.to_string()),
            AuthError::Rejected(_) | AuthError::Http(_) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<MusicError> for ApiError {
    fn from(e: MusicError) -> Self {
        match e {
            MusicError::Auth(e) => e.into(),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<PlaylistError> for ApiError {
    fn from(e: PlaylistError) -> Self {
        match e {
            PlaylistError::Auth(e) => e.into(),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::Lookup(e) => e.into(),
            OrchestratorError::EmptyQuery => ApiError::BadRequest(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

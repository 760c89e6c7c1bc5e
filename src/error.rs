use axum::{
    Json,
    extract::{multipart::MultipartRejection, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{database::DatabaseError, login::LoginError, watermark::WatermarkError};

/// Error returned by every JSON endpoint.
///
/// Renders as `{"error": "<message>"}`. Internal failures are logged and
/// replaced by a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnprocessableImage(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Server-side setup problem whose message is safe to show
    #[error("{0}")]
    Misconfigured(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Processing(_)
            | ApiError::Database(_)
            | ApiError::Internal(_)
            | ApiError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WatermarkError> for ApiError {
    fn from(e: WatermarkError) -> Self {
        match e {
            WatermarkError::UnprocessableImage(msg) => ApiError::UnprocessableImage(msg),
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::InvalidCredentials => ApiError::Unauthenticated,
            LoginError::EmailTaken | LoginError::Invalid(_) => ApiError::Validation(e.to_string()),
            LoginError::Database(db) => ApiError::Database(db),
            LoginError::PasswordHash(msg) => ApiError::Internal(msg),
        }
    }
}

// Malformed bodies and query strings get the same JSON error shape as handler failures
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::UnprocessableImage(msg) => {
                tracing::warn!("Rejected unprocessable image: {}", msg);
                "Unprocessable image".to_string()
            }
            ApiError::Processing(msg) => {
                error!("Image processing failed: {}", msg);
                "Image processing failed".to_string()
            }
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            ApiError::Misconfigured(msg) => {
                error!("Misconfiguration: {}", msg);
                msg.clone()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

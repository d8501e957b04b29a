use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::normalizer::NormalizeError;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The text-generation service could not be reached or refused the request
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Request exceeded the {0}s deadline")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message safe to show to end users. Never includes upstream detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Unauthorized(_) => "Authentication required".to_string(),
            AppError::Upstream(_) => "AI service temporarily unavailable".to_string(),
            AppError::Normalize(NormalizeError::EmptyResult) => {
                "No valid movie recommendations could be generated".to_string()
            }
            AppError::Normalize(_) => "AI returned invalid response format".to_string(),
            AppError::Database(_) | AppError::Persistence(_) => {
                "Failed to fetch history".to_string()
            }
            AppError::Timeout(_) => "Request timed out".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) | AppError::Normalize(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = Json(json!({
            "error": self.public_message()
        }));

        (status, body).into_response()
    }
}

/// Unreadable request bodies answer in the same `{"error": ...}` shape as
/// every other failure
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(
            status = %rejection.status(),
            reason = %rejection.body_text(),
            "Rejected request body"
        );
        AppError::InvalidInput("Invalid request body".to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sign-in cancelled by user")]
    ProviderCancelled,

    #[error("Sign-in error: {0}")]
    ProviderError(String),

    #[error("Failed to fetch user info: {message} (HTTP {status})")]
    ProfileFetchHttp { status: u16, message: String },

    #[error("Network error or failed to fetch user info: {0}")]
    ProfileFetchNetwork(String),

    #[error("Invalid user info: {0}")]
    InvalidProfile(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Sign-in is not configured")]
    RequestNotReady,

    #[error("A sign-in is already in progress")]
    SignInInFlight,

    #[error("Already signed in")]
    AlreadySignedIn,

    #[error("Invalid OAuth state")]
    InvalidState,

    #[error("{0}")]
    Validation(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ProviderCancelled | AppError::InvalidState => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::SignInInFlight | AppError::AlreadySignedIn => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::RequestNotReady => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::ProviderError(_)
            | AppError::ProfileFetchHttp { .. }
            | AppError::ProfileFetchNetwork(_)
            | AppError::InvalidProfile(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::StorageError(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

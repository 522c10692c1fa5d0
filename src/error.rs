use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{
    auth::{jwt::TokenError, password::PasswordError},
    users::{repo::StoreError, services::ServiceError},
};

/// Handler-level error; the only place errors become status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Service(e) => match e {
                ServiceError::InvalidCredentials => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
                ServiceError::Store(StoreError::UniquenessViolation) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ServiceError::Token(
                    TokenError::Malformed(_)
                    | TokenError::UnexpectedSigningMethod(_)
                    | TokenError::ExpiredOrInvalid(_)
                    | TokenError::ClaimDecode,
                ) => StatusCode::UNAUTHORIZED,
                ServiceError::Store(StoreError::Storage(_))
                | ServiceError::Password(PasswordError::Hashing(_))
                | ServiceError::Password(PasswordError::Mismatch)
                | ServiceError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use murmur_types::api::ApiResponse;

/// Every way a request can fail. Each variant maps to one HTTP status and a
/// human-readable message; none of them are retried.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("User is already verified")]
    AlreadyVerified,

    #[error("Incorrect verification code")]
    CodeMismatch,

    #[error("Verification code has expired, please request a new code")]
    ExpiredCode,

    #[error("User is not accepting messages")]
    NotAccepting,

    #[error("{0}")]
    Validation(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Please verify your account before signing in")]
    NotVerified,

    /// Database or other internal failure. Details go to the log only.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Failed to send verification email")]
    EmailDelivery(#[source] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyVerified
            | AppError::CodeMismatch
            | AppError::ExpiredCode
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotAccepting | AppError::NotVerified => StatusCode::FORBIDDEN,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EmailDelivery(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(e) => error!("Internal error: {:#}", e),
            AppError::EmailDelivery(e) => error!("Email delivery failed: {:#}", e),
            _ => {}
        }

        (self.status(), Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(AppError::NotFound("User not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ExpiredCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotAccepting.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = AppError::Internal(anyhow::anyhow!("constraint failed: users.email"));
        assert_eq!(err.to_string(), "Internal server error");
    }
}

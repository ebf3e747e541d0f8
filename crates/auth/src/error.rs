use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shoplist_core::storage::{repository_error_to_status_code, RepositoryError};
use thiserror::Error;

/// Errors from registration, login and token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordsDoNotMatch,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("email is already registered")]
    EmailTaken,

    /// Wrong password or unknown email. The two are not distinguished.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("password hashing error")]
    PasswordHash,

    #[error("token error: {0}")]
    Token(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Maps an auth error to its HTTP status code.
pub fn auth_error_to_status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::PasswordsDoNotMatch
        | AuthError::WeakPassword(_)
        | AuthError::InvalidEmail(_)
        | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
        AuthError::Repository(err) => StatusCode::from_u16(repository_error_to_status_code(err))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = auth_error_to_status_code(&self);
        let message = if status.is_server_error() {
            tracing::error!("Auth error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

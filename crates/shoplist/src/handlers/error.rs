use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shoplist_auth::{auth_error_to_status_code, AuthError};
use shoplist_core::integrations::{BlobError, QueueError, SearchError};
use shoplist_core::storage::{repository_error_to_status_code, RepositoryError};

/// Request-level failures raised by the handlers themselves.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
}

pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(RequestError::BadRequest(message.into()).into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(RequestError::Forbidden(message.into()).into())
    }

    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self(
            RepositoryError::NotFound {
                entity_type,
                id: id.to_string(),
            }
            .into(),
        )
    }
}

fn blob_error_to_status_code(error: &BlobError) -> StatusCode {
    match error {
        BlobError::InvalidName(_) => StatusCode::BAD_REQUEST,
        BlobError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn search_error_to_status_code(error: &SearchError) -> StatusCode {
    match error {
        SearchError::InvalidIndexName(_) => StatusCode::BAD_REQUEST,
        SearchError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Maps the error to a status code by downcasting to the known error types.
pub fn status_code_for(error: &anyhow::Error) -> StatusCode {
    if let Some(err) = error.downcast_ref::<RepositoryError>() {
        StatusCode::from_u16(repository_error_to_status_code(err))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    } else if let Some(err) = error.downcast_ref::<AuthError>() {
        auth_error_to_status_code(err)
    } else if let Some(err) = error.downcast_ref::<RequestError>() {
        match err {
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    } else if let Some(err) = error.downcast_ref::<BlobError>() {
        blob_error_to_status_code(err)
    } else if let Some(err) = error.downcast_ref::<SearchError>() {
        search_error_to_status_code(err)
    } else if error.downcast_ref::<QueueError>().is_some() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = status_code_for(&self.0);

        // Server-side details stay in the log
        let message = if status_code.is_server_error() {
            tracing::error!(status = %status_code, error = %self.0, "Request failed");
            status_code
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            tracing::warn!(status = %status_code, message = %self.0, "API error");
            self.0.to_string()
        };

        (status_code, message).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

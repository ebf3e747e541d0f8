use thiserror::Error;

use crate::entity::ValidationError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} {id} was modified or removed concurrently")]
    ConcurrencyConflict {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// True for failures raised while committing staged changes.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            RepositoryError::AlreadyExists { .. }
                | RepositoryError::ConcurrencyConflict { .. }
                | RepositoryError::ConnectionFailed(_)
                | RepositoryError::QueryFailed(_)
        )
    }
}

impl From<ValidationError> for RepositoryError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::UnknownField(_) | ValidationError::ReadOnly(_) => {
                RepositoryError::InvalidArgument(error.to_string())
            }
            other => RepositoryError::InvalidData(other.to_string()),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

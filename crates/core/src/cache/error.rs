use thiserror::Error;

/// A cache backend failure. Callers treat every variant as a miss.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend could not be reached, or the connection dropped mid-command.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    #[error("Cache command failed: {0}")]
    Command(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_failure() {
        assert_eq!(
            CacheError::Unavailable("connection refused".to_string()).to_string(),
            "Cache unavailable: connection refused"
        );
        assert_eq!(
            CacheError::Command("WRONGTYPE".to_string()).to_string(),
            "Cache command failed: WRONGTYPE"
        );
    }
}

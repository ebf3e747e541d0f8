use thiserror::Error;

/// Errors raised when an entity or a query does not satisfy the domain rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be at least {min}")]
    BelowMinimum { field: &'static str, min: String },
    #[error("{field} is not a valid {expected}")]
    Malformed {
        field: &'static str,
        expected: &'static str,
    },
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Field is read-only: {0}")]
    ReadOnly(String),
    #[error("Field {field} expects a {expected} value")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

pub(crate) fn max_chars(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(
            require("name", "   "),
            Err(ValidationError::Required { field: "name" })
        );
        assert!(require("name", "Milk").is_ok());
    }

    #[test]
    fn test_max_chars_counts_characters_not_bytes() {
        // 50 two-byte characters
        let value = "é".repeat(50);
        assert!(max_chars("name", &value, 50).is_ok());
        assert_eq!(
            max_chars("name", &format!("{value}x"), 50),
            Err(ValidationError::TooLong {
                field: "name",
                max: 50
            })
        );
    }

    #[test]
    fn test_display() {
        let error = ValidationError::BelowMinimum {
            field: "price",
            min: "0.99".to_string(),
        };
        assert_eq!(error.to_string(), "price must be at least 0.99");
    }
}

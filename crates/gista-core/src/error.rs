//! Validation errors for gist and link records.

use thiserror::Error;

/// Result type alias using `ModelError`.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while validating or normalizing domain records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A required field was absent or blank.
    #[error("missing required field: {field}")]
    MissingField {
        /// Wire name of the missing field
        field: &'static str,
    },

    /// A gist must carry at least one segment.
    #[error("segments must be a non-empty array")]
    EmptySegments,

    /// Value is not one of the known production statuses.
    #[error("unknown production status: {value}")]
    UnknownStatus {
        /// The rejected value
        value: String,
    },
}

impl ModelError {
    /// Creates a missing field error.
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        assert_eq!(ModelError::missing("title").to_string(), "missing required field: title");
        assert_eq!(ModelError::EmptySegments.to_string(), "segments must be a non-empty array");
    }
}

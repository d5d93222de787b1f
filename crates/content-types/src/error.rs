//! Error types for content-ops.

use thiserror::Error;

/// Unified error type for content store and handler operations.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Item lookup failed
    #[error("Item does not exist at {0}")]
    NotFound(String),

    /// Template lookup failed
    #[error("Template does not exist at {0}")]
    TemplateNotFound(String),

    /// Mutation attempted outside an elevated scope
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Handle string could not be parsed or is unknown
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContentError {
    /// Whether this error is a recoverable lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::NotFound(_) | ContentError::TemplateNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContentError::NotFound("/sitecore/content/home".to_string());
        assert_eq!(
            err.to_string(),
            "Item does not exist at /sitecore/content/home"
        );

        let err = ContentError::AccessDenied("add_item".to_string());
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ContentError::NotFound("a".into()).is_not_found());
        assert!(ContentError::TemplateNotFound("t".into()).is_not_found());
        assert!(!ContentError::Store("boom".into()).is_not_found());
    }
}

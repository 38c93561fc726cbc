//! Content error types.

use thiserror::Error;

use crate::auth::AuthError;

/// Content errors
#[derive(Debug, Error)]
pub enum ContentError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Ownership or rank check failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Referenced resource does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique name or title already taken
    #[error("{0} already exists")]
    DuplicateEntry(&'static str),

    /// Input failed validation
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl ContentError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            ContentError::Database(_) => "Internal server error".to_string(),
            ContentError::Auth(err) => err.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for content operations
pub type ContentResult<T> = Result<T, ContentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ContentError::NotFound("Post").to_string(), "Post not found");
        assert_eq!(
            ContentError::DuplicateEntry("Tag").to_string(),
            "Tag already exists"
        );
        assert_eq!(
            ContentError::Auth(AuthError::PermissionDenied).to_string(),
            "Permission denied"
        );
        assert_eq!(
            ContentError::Database(sqlx::Error::RowNotFound).client_message(),
            "Internal server error"
        );
    }
}

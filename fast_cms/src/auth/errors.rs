//! Authentication error types.

use thiserror::Error;

/// Authentication and user-management errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// JWT encoding error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Unknown identifier, wrong password, or a missing/invalid/expired token.
    /// The cases are deliberately indistinguishable.
    #[error("Invalid authentication credentials")]
    InvalidCredentials,

    /// Actor lacks the rank for the requested mutation
    #[error("Permission denied")]
    PermissionDenied,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Username already exists
    #[error("Username already exists")]
    UserNameAlreadyExists,

    /// Email already exists
    #[error("Email already exists")]
    UserEmailAlreadyExists,

    /// Input failed validation
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database, hashing and JWT errors are collapsed into generic messages.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::HashingFailed | AuthError::JwtError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_database_details() {
        let err = AuthError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_message_hides_jwt_failures() {
        let err = AuthError::from(jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidKeyFormat,
        ));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_message_passes_through_domain_errors() {
        assert_eq!(
            AuthError::UserEmailAlreadyExists.client_message(),
            "Email already exists"
        );
        let err = AuthError::validation("username", "too short");
        assert_eq!(err.client_message(), "Invalid username: too short");
    }
}

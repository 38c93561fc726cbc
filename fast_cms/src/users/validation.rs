//! Input validation for account fields.

use crate::auth::{AuthError, AuthResult};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const EMAIL_MAX_LEN: usize = 64;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Validate username format
pub fn validate_username(username: &str) -> AuthResult<()> {
    let len = username.len();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::validation(
            "username",
            format!("must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::validation(
            "username",
            "can only contain letters, numbers, underscores and hyphens",
        ));
    }

    Ok(())
}

/// Shape check only: one `@` with a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.len() > EMAIL_MAX_LEN {
        return Err(AuthError::validation(
            "email",
            format!("must be at most {EMAIL_MAX_LEN} characters"),
        ));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split('.')
                    .filter(|label| !label.is_empty())
                    .count()
                    >= 2
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !well_formed {
        return Err(AuthError::validation("email", "not a valid email address"));
    }
    Ok(())
}

/// Validate password length
pub fn validate_password(password: &str) -> AuthResult<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(AuthError::validation(
            "password",
            format!("must be {PASSWORD_MIN_LEN}-{PASSWORD_MAX_LEN} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("test_user_0").is_ok());
        assert!(validate_username("a-b").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("superadmin@seek2.team").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@seek2.team").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("user@seek2.").is_err());
        assert!(validate_email("a@b@seek2.team").is_err());
        assert!(validate_email("us er@seek2.team").is_err());
        assert!(validate_email(&format!("{}@seek2.team", "x".repeat(60))).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_validation_error_message() {
        let err = validate_username("ab").unwrap_err();
        assert_eq!(err.to_string(), "Invalid username: must be 3-32 characters");
    }
}

//! Authentication data models.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User ID type
pub type UserId = i64;

/// Authorization rank of a user.
///
/// Ranks are totally ordered by their numeric value; a higher rank strictly
/// dominates a lower one and equal ranks never dominate each other.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum Power {
    Banned = 0,
    #[default]
    Normal = 1,
    Admin = 2,
    SuperAdmin = 3,
}

impl Power {
    /// Whether this rank may act on accounts other than its own.
    pub fn is_admin(self) -> bool {
        self >= Power::Admin
    }

    /// Whether this rank strictly outranks `other`.
    pub fn outranks(self, other: Power) -> bool {
        self > other
    }
}

impl From<Power> for i16 {
    fn from(power: Power) -> Self {
        power as i16
    }
}

/// Raised when an integer does not name a known power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid power level: {0}")]
pub struct InvalidPower(pub i16);

impl TryFrom<i16> for Power {
    type Error = InvalidPower;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Power::Banned),
            1 => Ok(Power::Normal),
            2 => Ok(Power::Admin),
            3 => Ok(Power::SuperAdmin),
            other => Err(InvalidPower(other)),
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Power::Banned => "banned",
            Power::Normal => "normal",
            Power::Admin => "admin",
            Power::SuperAdmin => "super-admin",
        };
        f.write_str(name)
    }
}

/// User model
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub avatar: Option<String>,
    pub power: Power,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Which of the two token flavours a JWT carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // User ID, stringified
    pub power: Power,
    pub exp: i64, // Expiration timestamp
    pub typ: TokenKind,
}

impl TokenClaims {
    /// Numeric user id carried in `sub`, if it parses.
    pub fn subject_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}

/// Tokens issued by a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing secret and token lifetimes, fixed at startup.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    /// Config with the default lifetimes: 15 minutes access, 7 days refresh.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_ttl: Duration::seconds(900),
            refresh_token_ttl: Duration::days(7),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_ordering() {
        assert!(Power::SuperAdmin > Power::Admin);
        assert!(Power::Admin > Power::Normal);
        assert!(Power::Normal > Power::Banned);
        assert!(!Power::Admin.outranks(Power::Admin));
        assert!(Power::Admin.is_admin());
        assert!(!Power::Normal.is_admin());
    }

    #[test]
    fn test_power_rejects_unknown_levels() {
        assert_eq!(Power::try_from(2), Ok(Power::Admin));
        assert_eq!(Power::try_from(4), Err(InvalidPower(4)));
        assert_eq!(Power::try_from(-1), Err(InvalidPower(-1)));
        assert!(serde_json::from_str::<Power>("7").is_err());
    }

    #[test]
    fn test_power_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Power::SuperAdmin).unwrap(), "3");
        assert_eq!(serde_json::from_str::<Power>("0").unwrap(), Power::Banned);
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: 1,
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            hashed_password: "$argon2id$secret".to_string(),
            avatar: None,
            power: Power::Normal,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["power"], 1);
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let config = AuthConfig::new("super-secret-value");
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}

//! Authentication manager implementation.

use std::sync::Arc;

use super::{
    errors::{AuthError, AuthResult},
    models::{AuthConfig, Power, SessionTokens, TokenClaims, TokenKind, User},
    password::verify_password,
    token::TokenCodec,
};
use crate::db::UserRepository;

/// Well-formed Argon2id hash that matches no password. Checked against when
/// the identifier is unknown so both failure paths cost one verification.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    codec: TokenCodec,
    config: AuthConfig,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - User repository
    /// * `config` - Signing secret and token lifetimes
    pub fn new(users: Arc<dyn UserRepository>, config: AuthConfig) -> Self {
        Self {
            users,
            codec: TokenCodec::new(&config.secret),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Resolve `identifier` as a username or email and check the password.
    ///
    /// Returns `None` both when no account matches and when the password is
    /// wrong; callers cannot tell the two apart.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> AuthResult<Option<User>> {
        match self.users.find_by_username_or_email(identifier).await? {
            Some(user) if verify_password(password, &user.hashed_password) => Ok(Some(user)),
            Some(_) => Ok(None),
            None => {
                let _ = verify_password(password, DUMMY_HASH);
                Ok(None)
            }
        }
    }

    /// Login a user
    ///
    /// Issues an access token and a refresh token, both embedding the id and
    /// power of the verified row.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown identifier or wrong password
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> AuthResult<(User, SessionTokens)> {
        let user = self
            .authenticate(identifier, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let tokens = SessionTokens {
            access_token: self.issue_access_token(user.id, user.power)?,
            refresh_token: self.codec.issue(
                user.id,
                user.power,
                TokenKind::Refresh,
                self.config.refresh_token_ttl,
            )?,
        };

        log::debug!("issued session tokens for user {}", user.id);
        Ok((user, tokens))
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The power level is copied from the refresh token, i.e. it is the
    /// snapshot taken at login; the database is not consulted.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Token missing, malformed, forged or expired
    pub async fn refresh(&self, refresh_token: Option<&str>) -> AuthResult<String> {
        let token = refresh_token.ok_or(AuthError::InvalidCredentials)?;
        let claims = self
            .codec
            .verify(token, TokenKind::Refresh)
            .ok_or(AuthError::InvalidCredentials)?;
        let user_id = claims.subject_id().ok_or(AuthError::InvalidCredentials)?;

        self.issue_access_token(user_id, claims.power)
    }

    /// Verify an access token without touching the database
    pub fn verify_access_token(&self, token: &str) -> Option<TokenClaims> {
        self.codec.verify(token, TokenKind::Access)
    }

    /// Load the live user row behind a bearer access token.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Token invalid or the user no longer exists
    pub async fn current_user(&self, token: &str) -> AuthResult<User> {
        let user_id = self
            .verify_access_token(token)
            .and_then(|claims| claims.subject_id())
            .ok_or(AuthError::InvalidCredentials)?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Like [`current_user`](Self::current_user), rejecting banned accounts.
    ///
    /// # Errors
    ///
    /// * `AuthError::PermissionDenied` - The account is banned
    pub async fn current_active_user(&self, token: &str) -> AuthResult<User> {
        let user = self.current_user(token).await?;
        if user.power == Power::Banned {
            return Err(AuthError::PermissionDenied);
        }
        Ok(user)
    }

    fn issue_access_token(&self, user_id: i64, power: Power) -> AuthResult<String> {
        self.codec.issue(
            user_id,
            power,
            TokenKind::Access,
            self.config.access_token_ttl,
        )
    }
}

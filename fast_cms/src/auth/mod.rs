//! Authentication module providing login, token refresh, and the permission gate.
//!
//! This module implements:
//! - Argon2id password hashing
//! - HS256 JWT access tokens (15-minute expiry) and refresh tokens (7-day expiry)
//! - Login by username or email
//! - Rank-based authorization for cross-user mutations
//!
//! ## Example
//!
//! ```no_run
//! use fast_cms::auth::{AuthConfig, AuthManager};
//! use fast_cms::db::{Database, SqlUserRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let users = Arc::new(SqlUserRepository::new(db.pool().clone()));
//!     let auth = AuthManager::new(users, AuthConfig::new("jwt_secret"));
//!
//!     let (user, tokens) = auth.login("superadmin", "seek2geek").await?;
//!     println!("{} logged in: {}", user.username, tokens.access_token);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod permission;
pub mod token;

pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    AuthConfig, InvalidPower, Power, SessionTokens, TokenClaims, TokenKind, User, UserId,
};
pub use password::{hash_password, verify_password};
pub use permission::authorize_mutation;
pub use token::TokenCodec;

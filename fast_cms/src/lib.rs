//! # FastCMS
//!
//! Core library of a small content-management backend: user accounts with
//! ranked power levels, JWT-based sessions, and posts filed under categories
//! and tags.
//!
//! ## Core Modules
//!
//! - [`auth`]: password hashing, token codec, login/refresh, permission gate
//! - [`users`]: registration, profile updates, avatars
//! - [`content`]: categories, tags and posts
//! - [`db`]: SQLite pool, migrations, user repository
//! - [`seed`]: super-admin bootstrap and development fixtures
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
//!     let db = Database::in_memory().await?;
//!     let users = Arc::new(SqlUserRepository::new(db.pool().clone()));
//!     let auth = AuthManager::new(users, AuthConfig::new("a-secret-of-at-least-32-characters"));
//!     assert!(auth.login("nobody", "password").await.is_err());
//!     Ok(())
//! }
//! ```

/// Authentication and authorization.
pub mod auth;

/// Categories, tags and posts.
pub mod content;

/// Database connection, migrations and repositories.
pub mod db;

pub mod pagination;
pub mod seed;

/// User account management.
pub mod users;

pub use auth::{AuthConfig, AuthError, AuthManager, Power, User};
pub use content::{ContentError, ContentManager};
pub use db::Database;
pub use pagination::{Page, PageQuery};
pub use users::UserManager;

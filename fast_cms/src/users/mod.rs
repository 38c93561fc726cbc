//! User account management: registration, lookup, profile edits and avatars.
//!
//! Every mutation of an existing account goes through the rank check in
//! [`crate::auth::permission`].

pub mod manager;
pub mod models;
pub mod validation;

pub use manager::UserManager;
pub use models::{UserCreate, UserUpdate};

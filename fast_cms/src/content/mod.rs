//! Content module: categories, tags and posts.
//!
//! Categories and tags share one shape ([`Term`]) and are told apart by
//! [`TermKind`]. Creating, renaming and deleting terms requires an admin;
//! editing or deleting a post goes through the same rank check as user
//! profiles, with the post's author as the owner.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ContentError, ContentResult};
pub use manager::ContentManager;
pub use models::{Post, PostCreate, PostFilter, PostUpdate, Term, TermDetail, TermKind, TermName};

//! HTTP server for the FastCMS content backend.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as
//! a library so integration tests can build the router directly.

pub mod api;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod metrics;

//! # melon-review
//!
//! Backend for design-review collaboration between a designer and their
//! clients. A designer (the project owner) creates a project, invites
//! guests, and submits numbered revisions carrying files on one or more
//! tracks. Guests, identified only by their invitation code, pin feedback
//! to a point on a track; the owner replies once the guest marks the
//! review done. Payment checkpoints and an activity log round it out.
//!
//! Services are synchronous functions over a [`rusqlite::Connection`];
//! the [`server`] module exposes them over HTTP with axum.

pub mod activity;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feedback;
pub mod files;
pub mod invitations;
pub mod models;
pub mod projects;
pub mod revisions;
pub mod server;
pub mod users;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use db::Database;
pub use error::{AppError, AppResult};
pub use revisions::RevisionStatus;
pub use server::{app_router, AppState};

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

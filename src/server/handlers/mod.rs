//! Route handlers, grouped by resource.
//!
//! Handlers stay thin: extract, hand the blocking work to the database
//! pool, wrap the result.

pub mod auth;
pub mod feedback;
pub mod files;
pub mod projects;
pub mod revisions;
pub mod users;

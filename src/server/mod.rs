//! HTTP surface of the review backend.
//!
//! Handlers are thin: they pull the session and request body out with the
//! extractors in [`extract`], run the matching service on the database
//! thread, and serialize the result. All failures render through
//! [`crate::error::AppError`].

pub mod extract;
pub mod handlers;
pub mod routes;

pub use routes::{app_router, AppState};

//! Router assembly and shared state.
//!
//! # Routes
//!
//! - `GET  /health`: liveness probe
//! - `/api/v1/{signup,login,logout,me}`: accounts and sessions
//! - `/users`, `/users/:id`: user CRUD
//! - `/api/v1/project/*`, `/api/v1/track/add`, `/api/v1/user/logs`: owner side
//! - `/api/v1/revision/*`: submit, info, guest review-done
//! - `/api/v1/invitation`, `/api/v1/feedback`, `/api/v1/feedback/reply`: guest side
//! - `GET  /api/files/:filename`: download

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::SessionStore;
use crate::config::ServerConfig;
use crate::db::Database;
use crate::files::FileStore;

use super::handlers::{auth, feedback, files, projects, revisions, users};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionStore,
    pub files: FileStore,
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db,
            sessions: SessionStore::new(config.session_ttl_hours),
            files: FileStore::new(config.files_dir.clone()),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    let api = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/project/new", post(projects::create_project))
        .route("/project/revision/new", post(projects::create_revision))
        .route("/project/list", get(projects::list))
        .route("/project/info", get(projects::info))
        .route("/project/history", get(projects::history))
        .route("/project/logs", get(projects::logs))
        .route("/project/paycheckpoint/paid", post(projects::update_paid))
        .route("/user/logs", get(projects::user_logs))
        .route("/track/add", post(projects::add_track))
        .route("/revision/submit", post(revisions::submit))
        .route("/revision/info", get(revisions::info))
        .route("/revision/review-done", post(revisions::review_done))
        .route("/invitation", get(projects::resolve_invitation))
        .route(
            "/feedback",
            post(feedback::create)
                .put(feedback::edit)
                .get(feedback::list)
                .delete(feedback::delete),
        )
        .route(
            "/feedback/reply",
            post(feedback::add_reply).delete(feedback::delete_reply),
        );

    Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(users::create).get(users::list))
        .route(
            "/users/:id",
            get(users::get).patch(users::update).delete(users::remove),
        )
        .route("/api/files/:filename", get(files::download))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "version": crate::VERSION,
        "service": "melon-review",
    }))
}

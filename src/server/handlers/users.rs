//! `/users` CRUD. Everything except create needs a session; writes are
//! limited to the caller's own account.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::auth::SessionStore;
use crate::error::{AppError, AppResult};
use crate::models::UserInfo;
use crate::server::extract::{CurrentUser, JsonBody};
use crate::server::routes::AppState;
use crate::users::{self, CreateUserRequest, UpdateUserRequest};

fn require_self(caller: i64, target: i64) -> AppResult<()> {
    if caller != target {
        return Err(AppError::forbidden("You can only modify your own account"));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state.db.call(move |conn| users::create_user(conn, &req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> AppResult<Json<Vec<UserInfo>>> {
    Ok(Json(state.db.call(|conn| users::list_users(conn)).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserInfo>> {
    Ok(Json(state.db.call(move |conn| users::get_user(conn, id)).await?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<UserInfo>> {
    require_self(caller, id)?;
    Ok(Json(
        state
            .db
            .call(move |conn| users::update_user(conn, id, &req))
            .await?,
    ))
}

/// Deleting an account also ends its sessions and removes the uploads of
/// the projects it owned.
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    require_self(caller, id)?;
    let orphaned = state.db.call(move |conn| users::remove_user(conn, id)).await?;
    let ended = state.sessions.destroy_user(id);
    tracing::debug!(user_id = id, sessions = ended, "sessions ended for removed user");

    let files = state.files.clone();
    if !orphaned.is_empty() {
        tokio::task::spawn_blocking(move || files.discard(&orphaned))
            .await
            .map_err(|e| AppError::Internal(format!("file cleanup task failed: {}", e)))?;
    }

    Ok((
        [(header::SET_COOKIE, SessionStore::clear_cookie())],
        Json(json!({
            "success": true,
            "message": format!("User {} deleted", id),
        })),
    ))
}

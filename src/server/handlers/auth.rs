//! Signup, login and session endpoints.

use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::auth::{self, LoginRequest, LoginResponse, SessionStore, SignupRequest};
use crate::error::{AppError, AppResult};
use crate::server::extract::{CurrentUser, JsonBody, SessionToken};
use crate::server::routes::AppState;
use crate::users;

/// POST /api/v1/signup
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let created = state.db.call(move |conn| auth::signup(conn, &req)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/v1/login: sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .db
        .call(move |conn| auth::authenticate(conn, &req.email, &req.password))
        .await?;
    let token = state.sessions.create(user.id);
    tracing::info!(user_id = user.id, "user logged in");

    Ok((
        [(header::SET_COOKIE, state.sessions.cookie(&token))],
        Json(LoginResponse::for_user(user, "Login successful")),
    ))
}

/// POST /api/v1/logout: always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> impl IntoResponse {
    if let Some(token) = token {
        state.sessions.destroy(&token);
    }
    (
        [(header::SET_COOKIE, SessionStore::clear_cookie())],
        Json(json!({ "success": true, "message": "Logout successful" })),
    )
}

/// GET /api/v1/me
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .db
        .call(move |conn| users::find_user(conn, user_id))
        .await?
        .ok_or_else(|| AppError::unauthorized("Login required"))?;
    Ok(Json(LoginResponse::for_user(user, "Session is valid")))
}

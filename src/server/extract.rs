//! Request extractors: session user and envelope-aware JSON/query parsing.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::request::Parts,
};

use crate::auth::session::token_from_headers;
use crate::error::AppError;

use super::routes::AppState;

/// The signed-in user's id. Rejects with 401 when there is no live session.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

/// The signed-in user's id, if any.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<i64>);

/// The raw session token from the cookie, if any.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

fn session_user(parts: &Parts, state: &AppState) -> Option<i64> {
    token_from_headers(&parts.headers).and_then(|token| state.sessions.user_id(&token))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Login required"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state)))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(token_from_headers(&parts.headers)))
    }
}

/// `Json` whose rejections use the error envelope (400).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `Query` whose rejections use the error envelope (400).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

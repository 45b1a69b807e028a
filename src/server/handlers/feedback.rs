//! Feedback endpoints. Guests authenticate with their invitation code in
//! the body; replies need the owner's session.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::error::AppResult;
use crate::feedback::{
    self, AddReplyRequest, CreateFeedbackRequest, DeleteFeedbackRequest, DeleteFeedbackResponse,
    DeleteReplyRequest, EditFeedbackRequest, FeedbackListResponse, FeedbackResponse,
    ListFeedbackQuery, ReplyResponse,
};
use crate::server::extract::{CurrentUser, JsonBody, MaybeUser, QueryParams};
use crate::server::routes::AppState;

pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateFeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    let created = state.db.call(move |conn| feedback::create(conn, &req)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn edit(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EditFeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    Ok(Json(state.db.call(move |conn| feedback::edit(conn, &req)).await?))
}

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    QueryParams(q): QueryParams<ListFeedbackQuery>,
) -> AppResult<Json<FeedbackListResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| feedback::list(conn, user, &q))
            .await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DeleteFeedbackRequest>,
) -> AppResult<Json<DeleteFeedbackResponse>> {
    Ok(Json(state.db.call(move |conn| feedback::delete(conn, &req)).await?))
}

pub async fn add_reply(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<AddReplyRequest>,
) -> AppResult<Json<ReplyResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| feedback::add_reply(conn, owner, &req))
            .await?,
    ))
}

pub async fn delete_reply(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<DeleteReplyRequest>,
) -> AppResult<Json<ReplyResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| feedback::delete_reply(conn, owner, &req))
            .await?,
    ))
}

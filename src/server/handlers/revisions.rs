//! Revision submit, info and guest review-done.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::revisions::{
    self, ReviewDoneRequest, ReviewDoneResponse, RevisionInfoResponse, SubmitRevisionRequest,
    SubmitRevisionResponse,
};
use crate::server::extract::{CurrentUser, JsonBody, QueryParams};
use crate::server::routes::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionQuery {
    pub revision_id: i64,
}

/// POST /api/v1/revision/submit
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<SubmitRevisionRequest>,
) -> AppResult<Json<SubmitRevisionResponse>> {
    let store = state.files.clone();
    Ok(Json(
        state
            .db
            .call(move |conn| revisions::submit_revision(conn, &store, owner, &req))
            .await?,
    ))
}

/// GET /api/v1/revision/info?revisionId=
pub async fn info(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    QueryParams(q): QueryParams<RevisionQuery>,
) -> AppResult<Json<RevisionInfoResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| revisions::revision_info(conn, owner, q.revision_id))
            .await?,
    ))
}

/// POST /api/v1/revision/review-done: guest, by invitation code.
pub async fn review_done(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReviewDoneRequest>,
) -> AppResult<Json<ReviewDoneResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| revisions::review_done(conn, &req))
            .await?,
    ))
}

//! Owner-side project endpoints: projects, revisions, tracks, checkpoints, logs.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::invitations::{self, InvitationOverview};
use crate::projects::{
    self, checkpoints, AddTrackRequest, CreateProjectRequest, CreateRevisionRequest,
    ProjectHistoryResponse, ProjectInfoResponse, ProjectListResponse, ProjectLogsResponse,
    UpdatePaidRequest, UpdatePaidResponse, UserLogsResponse,
};
use crate::server::extract::{CurrentUser, JsonBody, QueryParams};
use crate::server::routes::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub project_id: i64,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub code: String,
}

/// POST /api/v1/project/new
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> AppResult<impl IntoResponse> {
    let created = state
        .db
        .call(move |conn| projects::create_project(conn, owner, &req))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/v1/project/revision/new
pub async fn create_revision(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<CreateRevisionRequest>,
) -> AppResult<impl IntoResponse> {
    let created = state
        .db
        .call(move |conn| projects::create_revision(conn, owner, &req))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/project/list
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
) -> AppResult<Json<ProjectListResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| projects::list_my_projects(conn, owner))
            .await?,
    ))
}

/// GET /api/v1/project/info?projectId=
pub async fn info(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    QueryParams(q): QueryParams<ProjectQuery>,
) -> AppResult<Json<ProjectInfoResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| projects::project_info(conn, owner, q.project_id))
            .await?,
    ))
}

/// GET /api/v1/project/history?projectId=
pub async fn history(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    QueryParams(q): QueryParams<ProjectQuery>,
) -> AppResult<Json<ProjectHistoryResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| projects::project_history(conn, owner, q.project_id))
            .await?,
    ))
}

/// GET /api/v1/project/logs?projectId=&limit=
pub async fn logs(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    QueryParams(q): QueryParams<ProjectQuery>,
) -> AppResult<Json<ProjectLogsResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| projects::project_logs(conn, owner, q.project_id, q.limit))
            .await?,
    ))
}

/// GET /api/v1/user/logs?limit=
pub async fn user_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    QueryParams(q): QueryParams<LimitQuery>,
) -> AppResult<Json<UserLogsResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| projects::user_logs(conn, user, q.limit))
            .await?,
    ))
}

/// POST /api/v1/project/paycheckpoint/paid
pub async fn update_paid(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<UpdatePaidRequest>,
) -> AppResult<Json<UpdatePaidResponse>> {
    Ok(Json(
        state
            .db
            .call(move |conn| checkpoints::update_paid(conn, owner, &req))
            .await?,
    ))
}

/// POST /api/v1/track/add
pub async fn add_track(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    JsonBody(req): JsonBody<AddTrackRequest>,
) -> AppResult<impl IntoResponse> {
    let created = state
        .db
        .call(move |conn| projects::add_track(conn, owner, &req))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/invitation?code=
pub async fn resolve_invitation(
    State(state): State<AppState>,
    QueryParams(q): QueryParams<CodeQuery>,
) -> AppResult<Json<InvitationOverview>> {
    Ok(Json(
        state
            .db
            .call(move |conn| invitations::resolve(conn, &q.code))
            .await?,
    ))
}

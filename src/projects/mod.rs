//! Projects, their revisions and tracks, as seen by the owning user.

pub mod checkpoints;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::{self, msg, ActivityLogEntry};
use crate::error::{AppError, AppResult};
use crate::invitations;
use crate::models::{
    FileInfo, GuestInfo, PayCheckPointInfo, RevisionInfo, TrackInfo, FILE_COLUMNS, GUEST_COLUMNS,
    REVISION_COLUMNS, TRACK_COLUMNS,
};
use crate::validate;

pub use checkpoints::{PayCheckPointRequest, UpdatePaidRequest, UpdatePaidResponse};

/// Name of the track every new project starts with.
pub const DEFAULT_TRACK_NAME: &str = "메인 이미지";

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// Minimal project identity used for authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
    pub author_id: i64,
}

pub fn find_project(conn: &Connection, project_id: i64) -> AppResult<Option<ProjectRef>> {
    Ok(conn
        .query_row(
            "SELECT id, name, author_id FROM projects WHERE id = ?1",
            [project_id],
            |row| {
                Ok(ProjectRef {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    author_id: row.get(2)?,
                })
            },
        )
        .optional()?)
}

/// 404 when the project is missing, 403 when `user_id` does not own it.
pub fn require_owner(conn: &Connection, project_id: i64, user_id: i64) -> AppResult<ProjectRef> {
    let project = find_project(conn, project_id)?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    if project.author_id != user_id {
        return Err(AppError::forbidden("You do not have access to this project"));
    }
    Ok(project)
}

// ---------------------------------------------------------------------------
// Create project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub guests: Vec<GuestRequest>,
    #[serde(default)]
    pub pay_check_points: Vec<PayCheckPointRequest>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub draft_deadline: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub total_price: Option<i64>,
    #[serde(default)]
    pub original_file_provided: Option<bool>,
    #[serde(default)]
    pub mod_limit: Option<i64>,
    #[serde(default)]
    pub additional_mod_fee: Option<i64>,
    #[serde(default)]
    pub mod_criteria: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub first_revision_id: i64,
    pub first_revision_no: i64,
    pub first_track_id: i64,
    pub first_track_name: String,
    pub guests: Vec<GuestInfo>,
    pub pay_check_points: Vec<PayCheckPointInfo>,
}

/// Guest fields after validation, phone reduced to digits.
struct CleanGuest<'a> {
    name: &'a str,
    email: &'a str,
    phone: String,
}

/// Create a project with its first revision, default track, guests and
/// payment checkpoints, all in one transaction.
pub fn create_project(
    conn: &mut Connection,
    owner_id: i64,
    req: &CreateProjectRequest,
) -> AppResult<ProjectResponse> {
    validate::length("Project name", &req.name, 1, 100)?;
    for (field, value) in [
        ("totalPrice", req.total_price),
        ("modLimit", req.mod_limit),
        ("additionalModFee", req.additional_mod_fee),
    ] {
        if let Some(value) = value {
            validate::non_negative(field, value)?;
        }
    }
    let start_date = validate::optional_date("startDate", req.start_date.as_deref())?;
    let draft_deadline = validate::optional_date("draftDeadline", req.draft_deadline.as_deref())?;
    let deadline = validate::optional_date("deadline", req.deadline.as_deref())?;

    let guests = req
        .guests
        .iter()
        .map(|g| {
            validate::length("Guest name", &g.name, 1, 50)?;
            validate::email(&g.email)?;
            Ok(CleanGuest {
                name: &g.name,
                email: &g.email,
                phone: validate::guest_phone(&g.name, &g.phone)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    let checkpoints = req
        .pay_check_points
        .iter()
        .map(PayCheckPointRequest::validate)
        .collect::<AppResult<Vec<_>>>()?;

    let tx = conn.transaction()?;
    let now = Utc::now();

    tx.execute(
        "INSERT INTO projects (name, description, author_id, start_date, draft_deadline, deadline,
                               total_price, original_file_provided, mod_limit, additional_mod_fee,
                               mod_criteria, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            req.name,
            req.description,
            owner_id,
            start_date,
            draft_deadline,
            deadline,
            req.total_price.unwrap_or(0),
            req.original_file_provided.unwrap_or(false),
            req.mod_limit.unwrap_or(0),
            req.additional_mod_fee.unwrap_or(0),
            req.mod_criteria,
            now,
        ],
    )?;
    let project_id = tx.last_insert_rowid();

    let revision_id = insert_revision(&tx, project_id, 1, now)?;
    let track_id = insert_track(&tx, project_id, DEFAULT_TRACK_NAME, 1, revision_id, now)?;

    for guest in &guests {
        tx.execute(
            "INSERT INTO guests (name, email, phone, host, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![guest.name, guest.email, guest.phone, owner_id, now],
        )?;
        let guest_id = tx.last_insert_rowid();
        invitations::issue(&tx, project_id, guest_id)?;
    }

    for checkpoint in &checkpoints {
        checkpoints::insert(&tx, project_id, checkpoint, now)?;
    }

    activity::record(
        &tx,
        Some(owner_id),
        Some(project_id),
        msg::PROJECT_CREATED,
        Some(json!({ "name": req.name, "guests": guests.len() })),
    );

    let guests = guests_of(&tx, project_id)?;
    let pay_check_points = checkpoints::list(&tx, project_id)?;
    tx.commit()?;

    tracing::info!(project_id, owner_id, "project created");

    Ok(ProjectResponse {
        success: true,
        message: "Project created successfully".to_string(),
        id: project_id,
        name: req.name.clone(),
        description: req.description.clone(),
        author_id: owner_id,
        created_at: now,
        first_revision_id: revision_id,
        first_revision_no: 1,
        first_track_id: track_id,
        first_track_name: DEFAULT_TRACK_NAME.to_string(),
        guests,
        pay_check_points,
    })
}

fn insert_revision(
    conn: &Connection,
    project_id: i64,
    rev_no: i64,
    now: DateTime<Utc>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO revisions (project_id, rev_no, status, created_at, updated_at)
         VALUES (?1, ?2, 'pending', ?3, ?3)",
        params![project_id, rev_no, now],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_track(
    conn: &Connection,
    project_id: i64,
    name: &str,
    rev_no: i64,
    rev_id: i64,
    now: DateTime<Utc>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO tracks (project_id, name, created_rev_no, created_rev_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![project_id, name, rev_no, rev_id, now],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRevisionRequest {
    pub project_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub project_id: i64,
    pub rev_no: i64,
    pub created_at: DateTime<Utc>,
}

/// Open the next numbered revision of a project.
pub fn create_revision(
    conn: &mut Connection,
    owner_id: i64,
    req: &CreateRevisionRequest,
) -> AppResult<RevisionResponse> {
    let project = require_owner(conn, req.project_id, owner_id)?;

    let tx = conn.transaction()?;
    let max_rev_no: Option<i64> = tx.query_row(
        "SELECT MAX(rev_no) FROM revisions WHERE project_id = ?1",
        [project.id],
        |row| row.get(0),
    )?;
    let rev_no = max_rev_no.map_or(1, |n| n + 1);
    let now = Utc::now();
    let id = insert_revision(&tx, project.id, rev_no, now)?;
    activity::record(
        &tx,
        Some(owner_id),
        Some(project.id),
        msg::REVISION_CREATED,
        Some(json!({ "revisionId": id, "revNo": rev_no })),
    );
    tx.commit()?;

    Ok(RevisionResponse {
        success: true,
        message: "Revision created successfully".to_string(),
        id,
        project_id: project.id,
        rev_no,
        created_at: now,
    })
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackRequest {
    pub project_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackResponse {
    pub success: bool,
    pub message: String,
    pub track_id: i64,
    pub name: String,
    pub project_id: i64,
    pub created_rev_no: i64,
    pub created_rev_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Add a track that starts at the project's latest revision.
pub fn add_track(
    conn: &Connection,
    owner_id: i64,
    req: &AddTrackRequest,
) -> AppResult<AddTrackResponse> {
    validate::length("Track name", &req.name, 1, 100)?;
    let project = require_owner(conn, req.project_id, owner_id)?;

    let (rev_id, rev_no): (i64, i64) = conn
        .query_row(
            "SELECT id, rev_no FROM revisions WHERE project_id = ?1 ORDER BY rev_no DESC LIMIT 1",
            [project.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| AppError::bad_request("Project has no revision to attach the track to"))?;

    let now = Utc::now();
    let track_id = insert_track(conn, project.id, &req.name, rev_no, rev_id, now)?;
    activity::record(
        conn,
        Some(owner_id),
        Some(project.id),
        msg::TRACK_ADDED,
        Some(json!({ "trackId": track_id, "name": req.name, "revNo": rev_no })),
    );

    Ok(AddTrackResponse {
        success: true,
        message: "Track added successfully".to_string(),
        track_id,
        name: req.name.clone(),
        project_id: project.id,
        created_rev_no: rev_no,
        created_rev_id: rev_id,
        created_at: now,
    })
}

// ---------------------------------------------------------------------------
// Listing and details
// ---------------------------------------------------------------------------

pub fn tracks_of(conn: &Connection, project_id: i64) -> AppResult<Vec<TrackInfo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tracks WHERE project_id = ?1 ORDER BY id",
        TRACK_COLUMNS
    ))?;
    let tracks = stmt
        .query_map([project_id], TrackInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tracks)
}

/// Guests invited to a project, in invitation order.
pub fn guests_of(conn: &Connection, project_id: i64) -> AppResult<Vec<GuestInfo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM invitations i JOIN guests g ON g.id = i.guest_id
         WHERE i.project_id = ?1 ORDER BY i.id",
        GUEST_COLUMNS
    ))?;
    let guests = stmt
        .query_map([project_id], GuestInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(guests)
}

pub fn revisions_of(conn: &Connection, project_id: i64) -> AppResult<Vec<RevisionInfo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM revisions WHERE project_id = ?1 ORDER BY rev_no",
        REVISION_COLUMNS
    ))?;
    let revisions = stmt
        .query_map([project_id], RevisionInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(revisions)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRevision {
    pub id: i64,
    pub rev_no: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_revision: Option<LastRevision>,
    pub tracks: Vec<TrackInfo>,
    pub guests: Vec<GuestInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListResponse {
    pub success: bool,
    pub message: String,
    pub projects: Vec<ProjectListItem>,
    pub total_count: usize,
}

/// Every project owned by `owner_id`, newest first.
pub fn list_my_projects(conn: &Connection, owner_id: i64) -> AppResult<ProjectListResponse> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, author_id, created_at, updated_at,
                (SELECT COUNT(*) FROM revisions r WHERE r.project_id = projects.id)
         FROM projects WHERE author_id = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([owner_id], |row| {
            Ok(ProjectListItem {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                author_id: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
                revision_count: row.get(6)?,
                last_revision: None,
                tracks: Vec::new(),
                guests: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut projects = Vec::with_capacity(rows.len());
    for mut item in rows {
        item.last_revision = conn
            .query_row(
                "SELECT id, rev_no, description, created_at FROM revisions
                 WHERE project_id = ?1 ORDER BY rev_no DESC LIMIT 1",
                [item.id],
                |row| {
                    Ok(LastRevision {
                        id: row.get(0)?,
                        rev_no: row.get(1)?,
                        description: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        item.tracks = tracks_of(conn, item.id)?;
        item.guests = guests_of(conn, item.id)?;
        projects.push(item);
    }

    Ok(ProjectListResponse {
        success: true,
        message: "Project list retrieved successfully".to_string(),
        total_count: projects.len(),
        projects,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfoResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub author: AuthorInfo,
    pub start_date: Option<DateTime<Utc>>,
    pub draft_deadline: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub total_price: i64,
    pub original_file_provided: bool,
    pub mod_limit: i64,
    pub additional_mod_fee: i64,
    pub mod_criteria: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revisions: Vec<RevisionInfo>,
    pub tracks: Vec<TrackInfo>,
    pub guests: Vec<GuestInfo>,
    pub pay_check_points: Vec<PayCheckPointInfo>,
}

/// Full details of one project for its owner.
pub fn project_info(
    conn: &Connection,
    owner_id: i64,
    project_id: i64,
) -> AppResult<ProjectInfoResponse> {
    let project = require_owner(conn, project_id, owner_id)?;

    let mut info = conn.query_row(
        "SELECT p.description, p.start_date, p.draft_deadline, p.deadline, p.total_price,
                p.original_file_provided, p.mod_limit, p.additional_mod_fee, p.mod_criteria,
                p.created_at, p.updated_at, u.id, u.email, u.name, u.phone
         FROM projects p JOIN users u ON u.id = p.author_id
         WHERE p.id = ?1",
        [project.id],
        |row| {
            Ok(ProjectInfoResponse {
                success: true,
                message: "Project info retrieved successfully".to_string(),
                id: project.id,
                name: project.name.clone(),
                description: row.get(0)?,
                start_date: row.get(1)?,
                draft_deadline: row.get(2)?,
                deadline: row.get(3)?,
                total_price: row.get(4)?,
                original_file_provided: row.get(5)?,
                mod_limit: row.get(6)?,
                additional_mod_fee: row.get(7)?,
                mod_criteria: row.get(8)?,
                created_at: row.get(9)?,
                updated_at: row.get(10)?,
                author: AuthorInfo {
                    id: row.get(11)?,
                    email: row.get(12)?,
                    name: row.get(13)?,
                    phone: row.get(14)?,
                },
                revisions: Vec::new(),
                tracks: Vec::new(),
                guests: Vec::new(),
                pay_check_points: Vec::new(),
            })
        },
    )?;
    info.revisions = revisions_of(conn, project.id)?;
    info.tracks = tracks_of(conn, project.id)?;
    info.guests = guests_of(conn, project.id)?;
    info.pay_check_points = checkpoints::list(conn, project.id)?;
    Ok(info)
}

// ---------------------------------------------------------------------------
// History and logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTrack {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRevision {
    #[serde(flatten)]
    pub revision: RevisionInfo,
    pub files: Vec<FileInfo>,
    pub created_tracks: Vec<HistoryTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHistoryResponse {
    pub success: bool,
    pub message: String,
    pub project_id: i64,
    pub project_name: String,
    pub revisions: Vec<HistoryRevision>,
}

/// Every revision with the files uploaded in it and the tracks it introduced.
pub fn project_history(
    conn: &Connection,
    owner_id: i64,
    project_id: i64,
) -> AppResult<ProjectHistoryResponse> {
    let project = require_owner(conn, project_id, owner_id)?;

    let mut files_stmt = conn.prepare(&format!(
        "SELECT {} FROM files WHERE revision_id = ?1 ORDER BY id",
        FILE_COLUMNS
    ))?;
    let mut tracks_stmt =
        conn.prepare("SELECT id, name FROM tracks WHERE created_rev_id = ?1 ORDER BY id")?;

    let mut revisions = Vec::new();
    for revision in revisions_of(conn, project.id)? {
        let files = files_stmt
            .query_map([revision.id], FileInfo::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let created_tracks = tracks_stmt
            .query_map([revision.id], |row| {
                Ok(HistoryTrack {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        revisions.push(HistoryRevision {
            revision,
            files,
            created_tracks,
        });
    }

    Ok(ProjectHistoryResponse {
        success: true,
        message: "Project history retrieved successfully".to_string(),
        project_id: project.id,
        project_name: project.name,
        revisions,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLogsResponse {
    pub success: bool,
    pub message: String,
    pub project_id: i64,
    pub project_name: String,
    pub total_count: usize,
    pub logs: Vec<ActivityLogEntry>,
}

pub fn project_logs(
    conn: &Connection,
    owner_id: i64,
    project_id: i64,
    limit: Option<i64>,
) -> AppResult<ProjectLogsResponse> {
    let project = require_owner(conn, project_id, owner_id)?;
    let logs = activity::project_logs(conn, project.id, limit)?;
    Ok(ProjectLogsResponse {
        success: true,
        message: "Project logs retrieved successfully".to_string(),
        project_id: project.id,
        project_name: project.name,
        total_count: logs.len(),
        logs,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLogsResponse {
    pub success: bool,
    pub message: String,
    pub total_count: usize,
    pub logs: Vec<ActivityLogEntry>,
}

pub fn user_logs(conn: &Connection, user_id: i64, limit: Option<i64>) -> AppResult<UserLogsResponse> {
    let logs = activity::user_logs(conn, user_id, limit)?;
    Ok(UserLogsResponse {
        success: true,
        message: "User logs retrieved successfully".to_string(),
        total_count: logs.len(),
        logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::test_support::{sample_project, seed_user};

    #[test]
    fn test_create_project_builds_first_revision_track_and_guests() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let created = create_project(conn, owner, &sample_project()).unwrap();

            assert_eq!(created.first_revision_no, 1);
            assert_eq!(created.first_track_name, DEFAULT_TRACK_NAME);
            assert_eq!(created.guests.len(), 1);
            assert_eq!(created.guests[0].phone, "01098765432");
            assert_eq!(created.guests[0].code.len(), invitations::CODE_LEN);
            assert_eq!(created.pay_check_points.len(), 2);

            let invitation = invitations::require(conn, &created.guests[0].code).unwrap();
            assert_eq!(invitation.project_id, created.id);

            let revisions = revisions_of(conn, created.id).unwrap();
            assert_eq!(revisions.len(), 1);
            assert_eq!(revisions[0].status.as_str(), "pending");
        });
    }

    #[test]
    fn test_create_project_bad_guest_phone_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let mut req = sample_project();
            req.guests.push(GuestRequest {
                name: "Short".to_string(),
                email: "short@example.com".to_string(),
                phone: "12-34".to_string(),
            });
            let err = create_project(conn, owner, &req).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("Short")));

            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))
                .unwrap();
            assert_eq!(count, 0);
        });
    }

    #[test]
    fn test_create_project_name_length() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let mut req = sample_project();
            req.name = String::new();
            assert!(create_project(conn, owner, &req).is_err());
            req.name = "x".repeat(101);
            assert!(create_project(conn, owner, &req).is_err());
        });
    }

    #[test]
    fn test_create_revision_numbers_sequentially() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let req = CreateRevisionRequest {
                project_id: project.id,
            };
            assert_eq!(create_revision(conn, owner, &req).unwrap().rev_no, 2);
            assert_eq!(create_revision(conn, owner, &req).unwrap().rev_no, 3);
        });
    }

    #[test]
    fn test_create_revision_authorization() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let other = seed_user(conn, "other@example.com", "010-3333-4444");
            let project = create_project(conn, owner, &sample_project()).unwrap();

            let err = create_revision(conn, other, &CreateRevisionRequest { project_id: project.id })
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));

            let err = create_revision(conn, owner, &CreateRevisionRequest { project_id: 999 })
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        });
    }

    #[test]
    fn test_add_track_attaches_to_latest_revision() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let rev2 = create_revision(conn, owner, &CreateRevisionRequest { project_id: project.id })
                .unwrap();

            let track = add_track(
                conn,
                owner,
                &AddTrackRequest {
                    project_id: project.id,
                    name: "Detail shot".to_string(),
                },
            )
            .unwrap();
            assert_eq!(track.created_rev_no, 2);
            assert_eq!(track.created_rev_id, rev2.id);
            assert_eq!(tracks_of(conn, project.id).unwrap().len(), 2);
        });
    }

    #[test]
    fn test_list_my_projects_newest_first_with_last_revision() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let other = seed_user(conn, "other@example.com", "010-3333-4444");
            let first = create_project(conn, owner, &sample_project()).unwrap();
            let mut second_req = sample_project();
            second_req.name = "Second".to_string();
            let second = create_project(conn, owner, &second_req).unwrap();
            create_project(conn, other, &sample_project()).unwrap();
            create_revision(conn, owner, &CreateRevisionRequest { project_id: first.id }).unwrap();

            let list = list_my_projects(conn, owner).unwrap();
            assert_eq!(list.total_count, 2);
            assert_eq!(list.projects[0].id, second.id);
            assert_eq!(list.projects[1].id, first.id);
            assert_eq!(list.projects[1].revision_count, 2);
            assert_eq!(list.projects[1].last_revision.as_ref().unwrap().rev_no, 2);
            assert_eq!(list.projects[1].guests.len(), 1);
        });
    }

    #[test]
    fn test_project_info_includes_author_and_checkpoints() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();

            let info = project_info(conn, owner, project.id).unwrap();
            assert_eq!(info.author.email, "owner@example.com");
            assert_eq!(info.total_price, 500_000);
            assert!(info.original_file_provided);
            assert_eq!(info.pay_check_points[0].label, "Deposit");
            assert!(info.pay_check_points[0].pay_date <= info.pay_check_points[1].pay_date);
            assert_eq!(info.revisions.len(), 1);
            assert!(info.deadline.is_some());
        });
    }

    #[test]
    fn test_history_and_logs() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            create_revision(conn, owner, &CreateRevisionRequest { project_id: project.id }).unwrap();

            let history = project_history(conn, owner, project.id).unwrap();
            assert_eq!(history.revisions.len(), 2);
            assert_eq!(history.revisions[0].created_tracks.len(), 1);
            assert!(history.revisions[1].created_tracks.is_empty());

            let logs = project_logs(conn, owner, project.id, None).unwrap();
            assert_eq!(logs.total_count, 2);
            assert_eq!(logs.logs[0].msg, msg::REVISION_CREATED);
            assert_eq!(logs.logs[1].msg, msg::PROJECT_CREATED);
            assert_eq!(logs.logs[0].user.as_ref().unwrap().id, owner);

            assert_eq!(project_logs(conn, owner, project.id, Some(1)).unwrap().total_count, 1);
            assert_eq!(user_logs(conn, owner, None).unwrap().total_count, 2);
        });
    }
}

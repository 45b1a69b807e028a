//! Positional feedback left by guests on a revision, and owner replies.
//!
//! Guests act through their invitation code and may only touch feedback
//! while the revision is `submitted`. The project owner replies once the
//! guest has marked the review done.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::{self, msg};
use crate::error::{AppError, AppResult};
use crate::invitations::{self, Invitation};
use crate::projects;
use crate::revisions::{self, RevisionStatus};
use crate::validate;

/// Feedback row joined with everything the responses and checks need.
#[derive(Debug, Clone)]
struct FeedbackRow {
    id: i64,
    guest_id: i64,
    author_name: String,
    project_id: i64,
    project_name: String,
    owner_id: i64,
    revision_no: i64,
    status: RevisionStatus,
    track_name: String,
    normal_x: f64,
    normal_y: f64,
    content: String,
    reply: Option<String>,
    solved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const FEEDBACK_SELECT: &str = "
    SELECT f.id, f.author, g.name, f.project_id, p.name, p.author_id, r.rev_no, r.status,
           t.name, f.normal_x, f.normal_y, f.content, f.reply, f.solved, f.created_at, f.updated_at
    FROM feedback f
    JOIN guests g ON g.id = f.author
    JOIN projects p ON p.id = f.project_id
    JOIN revisions r ON r.id = f.revision_id
    JOIN tracks t ON t.id = f.track_id";

impl FeedbackRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            guest_id: row.get(1)?,
            author_name: row.get(2)?,
            project_id: row.get(3)?,
            project_name: row.get(4)?,
            owner_id: row.get(5)?,
            revision_no: row.get(6)?,
            status: row.get(7)?,
            track_name: row.get(8)?,
            normal_x: row.get(9)?,
            normal_y: row.get(10)?,
            content: row.get(11)?,
            reply: row.get(12)?,
            solved: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }
}

fn load(conn: &Connection, feedback_id: i64) -> AppResult<Option<FeedbackRow>> {
    Ok(conn
        .query_row(
            &format!("{} WHERE f.id = ?1", FEEDBACK_SELECT),
            [feedback_id],
            FeedbackRow::from_row,
        )
        .optional()?)
}

/// Feedback written by the invitation's guest in the invitation's project.
fn load_own(
    conn: &Connection,
    invitation: &Invitation,
    feedback_id: i64,
    action: &str,
) -> AppResult<FeedbackRow> {
    load(conn, feedback_id)?
        .filter(|f| f.guest_id == invitation.guest_id && f.project_id == invitation.project_id)
        .ok_or_else(|| {
            AppError::not_found(format!(
                "Feedback not found or you do not have permission to {} it",
                action
            ))
        })
}

/// Feedback on a project owned by `owner_id`.
fn load_for_owner(conn: &Connection, owner_id: i64, feedback_id: i64) -> AppResult<FeedbackRow> {
    let feedback =
        load(conn, feedback_id)?.ok_or_else(|| AppError::not_found("Feedback not found"))?;
    if feedback.owner_id != owner_id {
        return Err(AppError::forbidden(
            "You do not have permission to reply to this feedback",
        ));
    }
    Ok(feedback)
}

fn validate_content(content: &str) -> AppResult<()> {
    validate::not_blank("Content", content)?;
    validate::length("Content", content, 1, 1000)
}

// ---------------------------------------------------------------------------
// Guest operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub code: String,
    pub project_id: i64,
    pub revision_id: i64,
    pub track_id: i64,
    pub normal_x: f64,
    pub normal_y: f64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub author_name: String,
    pub project_name: String,
    pub revision_no: i64,
    pub track_name: String,
    pub normal_x: f64,
    pub normal_y: f64,
    pub content: String,
    pub solved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn create(conn: &Connection, req: &CreateFeedbackRequest) -> AppResult<FeedbackResponse> {
    validate::unit_interval("normalX", req.normal_x)?;
    validate::unit_interval("normalY", req.normal_y)?;
    validate_content(&req.content)?;

    let invitation = invitations::require(conn, &req.code)?;
    if invitation.project_id != req.project_id {
        return Err(AppError::forbidden("You do not have access to this project"));
    }

    let (revision_no, status): (i64, RevisionStatus) = conn
        .query_row(
            "SELECT rev_no, status FROM revisions WHERE id = ?1 AND project_id = ?2",
            params![req.revision_id, req.project_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| AppError::not_found("Revision not found in this project"))?;
    status.require_guest_feedback("create")?;

    let track_name: String = conn
        .query_row(
            "SELECT name FROM tracks WHERE id = ?1 AND project_id = ?2",
            params![req.track_id, req.project_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| AppError::not_found("Track not found in this project"))?;

    let now = Utc::now();
    conn.execute(
        "INSERT INTO feedback (author, project_id, revision_id, track_id, normal_x, normal_y,
                               content, solved, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
        params![
            invitation.guest_id,
            req.project_id,
            req.revision_id,
            req.track_id,
            req.normal_x,
            req.normal_y,
            req.content,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();

    activity::record(
        conn,
        None,
        Some(req.project_id),
        msg::FEEDBACK_CREATED,
        Some(json!({
            "feedbackId": id,
            "guestName": invitation.guest_name,
            "revisionNo": revision_no,
            "trackName": track_name,
        })),
    );

    Ok(FeedbackResponse {
        success: true,
        message: "Feedback created successfully".to_string(),
        id,
        author_name: invitation.guest_name,
        project_name: invitation.project_name,
        revision_no,
        track_name,
        normal_x: req.normal_x,
        normal_y: req.normal_y,
        content: req.content.clone(),
        solved: false,
        created_at: Some(now),
        updated_at: None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFeedbackRequest {
    pub code: String,
    pub feedback_id: i64,
    pub content: String,
}

pub fn edit(conn: &Connection, req: &EditFeedbackRequest) -> AppResult<FeedbackResponse> {
    validate_content(&req.content)?;
    let invitation = invitations::require(conn, &req.code)?;
    let feedback = load_own(conn, &invitation, req.feedback_id, "edit")?;
    feedback.status.require_guest_feedback("edit")?;

    let now = Utc::now();
    conn.execute(
        "UPDATE feedback SET content = ?1, updated_at = ?2 WHERE id = ?3",
        params![req.content, now, feedback.id],
    )?;
    activity::record(
        conn,
        None,
        Some(feedback.project_id),
        msg::FEEDBACK_EDITED,
        Some(json!({ "feedbackId": feedback.id, "guestName": feedback.author_name })),
    );

    Ok(FeedbackResponse {
        success: true,
        message: "Feedback updated successfully".to_string(),
        id: feedback.id,
        author_name: feedback.author_name,
        project_name: feedback.project_name,
        revision_no: feedback.revision_no,
        track_name: feedback.track_name,
        normal_x: feedback.normal_x,
        normal_y: feedback.normal_y,
        content: req.content.clone(),
        solved: feedback.solved,
        created_at: None,
        updated_at: Some(now),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFeedbackRequest {
    pub code: String,
    pub feedback_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFeedbackResponse {
    pub success: bool,
    pub message: String,
    pub deleted_id: i64,
    pub author_name: String,
    pub project_name: String,
    pub revision_no: i64,
    pub track_name: String,
    pub content: String,
}

pub fn delete(
    conn: &Connection,
    req: &DeleteFeedbackRequest,
) -> AppResult<DeleteFeedbackResponse> {
    let invitation = invitations::require(conn, &req.code)?;
    let feedback = load_own(conn, &invitation, req.feedback_id, "delete")?;
    feedback.status.require_guest_feedback("delete")?;

    conn.execute("DELETE FROM feedback WHERE id = ?1", [feedback.id])?;
    activity::record(
        conn,
        None,
        Some(feedback.project_id),
        msg::FEEDBACK_DELETED,
        Some(json!({ "feedbackId": feedback.id, "guestName": feedback.author_name })),
    );

    Ok(DeleteFeedbackResponse {
        success: true,
        message: "Feedback deleted successfully".to_string(),
        deleted_id: feedback.id,
        author_name: feedback.author_name,
        project_name: feedback.project_name,
        revision_no: feedback.revision_no,
        track_name: feedback.track_name,
        content: feedback.content,
    })
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFeedbackQuery {
    pub revision_id: i64,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListItem {
    pub id: i64,
    pub author_name: String,
    pub revision_no: i64,
    pub track_name: String,
    pub normal_x: f64,
    pub normal_y: f64,
    pub content: String,
    pub reply: Option<String>,
    pub solved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListResponse {
    pub success: bool,
    pub message: String,
    pub project_name: String,
    pub total_count: usize,
    pub solved_count: usize,
    pub unsolved_count: usize,
    pub feedbacks: Vec<FeedbackListItem>,
}

/// Feedback on a submitted revision, newest first.
///
/// The project owner (by session) or any guest invited to the project (by
/// code) may list it.
pub fn list(
    conn: &Connection,
    session_user: Option<i64>,
    query: &ListFeedbackQuery,
) -> AppResult<FeedbackListResponse> {
    let (project_id, status) = revisions::status_of(conn, query.revision_id)?
        .ok_or_else(|| AppError::not_found("Revision not found"))?;
    status.require_guest_feedback("list")?;

    let project = projects::find_project(conn, project_id)?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    let is_owner = session_user == Some(project.author_id);
    if !is_owner {
        match query.code.as_deref() {
            Some(code) => {
                let valid = invitations::find(conn, code)?
                    .is_some_and(|inv| inv.project_id == project.id);
                if !valid {
                    return Err(AppError::bad_request(
                        "Invalid invitation code or no access to this project",
                    ));
                }
            }
            None => {
                return Err(AppError::bad_request(
                    "Sign in or provide a valid invitation code",
                ));
            }
        }
    }

    let mut stmt = conn.prepare(&format!(
        "{} WHERE f.revision_id = ?1 AND f.project_id = ?2 ORDER BY f.id DESC",
        FEEDBACK_SELECT
    ))?;
    let feedbacks = stmt
        .query_map(params![query.revision_id, project.id], FeedbackRow::from_row)?
        .map(|row| {
            row.map(|f| FeedbackListItem {
                id: f.id,
                author_name: f.author_name,
                revision_no: f.revision_no,
                track_name: f.track_name,
                normal_x: f.normal_x,
                normal_y: f.normal_y,
                content: f.content,
                reply: f.reply,
                solved: f.solved,
                created_at: f.created_at,
                updated_at: f.updated_at,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let solved_count = feedbacks.iter().filter(|f| f.solved).count();
    Ok(FeedbackListResponse {
        success: true,
        message: "Feedback list retrieved successfully".to_string(),
        project_name: project.name,
        total_count: feedbacks.len(),
        solved_count,
        unsolved_count: feedbacks.len() - solved_count,
        feedbacks,
    })
}

// ---------------------------------------------------------------------------
// Owner replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReplyRequest {
    pub feedback_id: i64,
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub success: bool,
    pub message: String,
    pub feedback_id: i64,
    pub author_name: String,
    pub project_name: String,
    pub revision_no: i64,
    pub track_name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_reply: Option<String>,
    pub solved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ReplyResponse {
    fn new(message: &str, feedback: FeedbackRow) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            feedback_id: feedback.id,
            author_name: feedback.author_name,
            project_name: feedback.project_name,
            revision_no: feedback.revision_no,
            track_name: feedback.track_name,
            content: feedback.content,
            reply: None,
            deleted_reply: None,
            solved: feedback.solved,
            replied_at: None,
            deleted_at: None,
        }
    }
}

pub fn add_reply(
    conn: &Connection,
    owner_id: i64,
    req: &AddReplyRequest,
) -> AppResult<ReplyResponse> {
    validate::not_blank("Reply", &req.reply)?;
    let feedback = load_for_owner(conn, owner_id, req.feedback_id)?;
    feedback.status.require_owner_reply("add")?;

    let now = Utc::now();
    conn.execute(
        "UPDATE feedback SET reply = ?1, updated_at = ?2 WHERE id = ?3",
        params![req.reply, now, feedback.id],
    )?;
    activity::record(
        conn,
        Some(owner_id),
        Some(feedback.project_id),
        msg::FEEDBACK_REPLIED,
        Some(json!({ "feedbackId": feedback.id })),
    );

    let mut res = ReplyResponse::new("Reply saved successfully", feedback);
    res.reply = Some(req.reply.clone());
    res.replied_at = Some(now);
    Ok(res)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReplyRequest {
    pub feedback_id: i64,
}

pub fn delete_reply(
    conn: &Connection,
    owner_id: i64,
    req: &DeleteReplyRequest,
) -> AppResult<ReplyResponse> {
    let mut feedback = load_for_owner(conn, owner_id, req.feedback_id)?;
    feedback.status.require_owner_reply("delete")?;

    let now = Utc::now();
    conn.execute(
        "UPDATE feedback SET reply = NULL, updated_at = ?1 WHERE id = ?2",
        params![now, feedback.id],
    )?;
    activity::record(
        conn,
        Some(owner_id),
        Some(feedback.project_id),
        msg::FEEDBACK_REPLY_DELETED,
        Some(json!({ "feedbackId": feedback.id })),
    );

    let previous = feedback.reply.take();
    let mut res = ReplyResponse::new("Reply deleted successfully", feedback);
    res.deleted_reply = previous;
    res.deleted_at = Some(now);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::files::FileStore;
    use crate::projects::{create_project, ProjectResponse};
    use crate::revisions::{review_done, submit_revision, ReviewDoneRequest, SubmitRevisionRequest};
    use crate::test_support::{first_guest_code, sample_project, seed_user};

    struct Fixture {
        owner: i64,
        other: i64,
        project: ProjectResponse,
        code: String,
    }

    fn fixture(conn: &mut Connection, submit: bool) -> Fixture {
        let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
        let other = seed_user(conn, "other@example.com", "010-3333-4444");
        let project = create_project(conn, owner, &sample_project()).unwrap();
        let code = first_guest_code(conn, project.id);
        if submit {
            let dir = tempfile::tempdir().unwrap();
            submit_revision(
                conn,
                &FileStore::new(dir.path()),
                owner,
                &SubmitRevisionRequest {
                    revision_id: project.first_revision_id,
                    description: None,
                    uploads: vec![],
                },
            )
            .unwrap();
        }
        Fixture {
            owner,
            other,
            project,
            code,
        }
    }

    fn create_req(f: &Fixture, content: &str) -> CreateFeedbackRequest {
        CreateFeedbackRequest {
            code: f.code.clone(),
            project_id: f.project.id,
            revision_id: f.project.first_revision_id,
            track_id: f.project.first_track_id,
            normal_x: 0.25,
            normal_y: 0.75,
            content: content.to_string(),
        }
    }

    fn list_as_guest(conn: &Connection, f: &Fixture) -> AppResult<FeedbackListResponse> {
        list(
            conn,
            None,
            &ListFeedbackQuery {
                revision_id: f.project.first_revision_id,
                code: Some(f.code.clone()),
            },
        )
    }

    fn mark_reviewed(conn: &Connection, f: &Fixture) {
        review_done(
            conn,
            &ReviewDoneRequest {
                code: f.code.clone(),
                revision_id: f.project.first_revision_id,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_create_requires_submitted_revision() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, false);
            let err = create(conn, &create_req(&f, "Make the logo bigger")).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("pending")));
        });
    }

    #[test]
    fn test_create_and_list() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, true);
            let first = create(conn, &create_req(&f, "Make the logo bigger")).unwrap();
            assert_eq!(first.author_name, "Client");
            assert_eq!(first.revision_no, 1);
            assert!(!first.solved);
            let second = create(conn, &create_req(&f, "Warmer colors")).unwrap();

            let listed = list_as_guest(conn, &f).unwrap();
            assert_eq!(listed.total_count, 2);
            assert_eq!(listed.unsolved_count, 2);
            assert_eq!(listed.feedbacks[0].id, second.id);
            assert_eq!(listed.feedbacks[1].id, first.id);

            let as_owner = list(
                conn,
                Some(f.owner),
                &ListFeedbackQuery {
                    revision_id: f.project.first_revision_id,
                    code: None,
                },
            )
            .unwrap();
            assert_eq!(as_owner.total_count, 2);
        });
    }

    #[test]
    fn test_create_validation_and_scope() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, true);

            let mut req = create_req(&f, "ok");
            req.normal_x = 1.5;
            assert!(matches!(create(conn, &req), Err(AppError::BadRequest(_))));

            let mut req = create_req(&f, &"x".repeat(1001));
            assert!(matches!(create(conn, &req), Err(AppError::BadRequest(_))));

            req = create_req(&f, "ok");
            req.code = "invalid".to_string();
            assert!(matches!(create(conn, &req), Err(AppError::BadRequest(_))));

            req = create_req(&f, "ok");
            req.project_id += 100;
            assert!(matches!(create(conn, &req), Err(AppError::Forbidden(_))));

            req = create_req(&f, "ok");
            req.revision_id = 999;
            assert!(matches!(create(conn, &req), Err(AppError::NotFound(_))));

            req = create_req(&f, "ok");
            req.track_id = 999;
            assert!(matches!(create(conn, &req), Err(AppError::NotFound(_))));
        });
    }

    #[test]
    fn test_list_authorization() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, true);
            let query = |code: Option<&str>| ListFeedbackQuery {
                revision_id: f.project.first_revision_id,
                code: code.map(str::to_string),
            };

            assert!(matches!(
                list(conn, None, &query(None)),
                Err(AppError::BadRequest(_))
            ));
            assert!(matches!(
                list(conn, Some(f.other), &query(None)),
                Err(AppError::BadRequest(_))
            ));
            assert!(matches!(
                list(conn, None, &query(Some("wrongwrongwrong1"))),
                Err(AppError::BadRequest(_))
            ));
            assert!(list(conn, Some(f.other), &query(Some(f.code.as_str()))).is_ok());
            assert!(matches!(
                list(
                    conn,
                    None,
                    &ListFeedbackQuery {
                        revision_id: 999,
                        code: Some(f.code.clone())
                    }
                ),
                Err(AppError::NotFound(_))
            ));
        });
    }

    #[test]
    fn test_edit_and_delete_own_feedback() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, true);
            let created = create(conn, &create_req(&f, "Before")).unwrap();

            let edited = edit(
                conn,
                &EditFeedbackRequest {
                    code: f.code.clone(),
                    feedback_id: created.id,
                    content: "After".to_string(),
                },
            )
            .unwrap();
            assert_eq!(edited.content, "After");
            assert!(edited.updated_at.is_some());

            let missing = edit(
                conn,
                &EditFeedbackRequest {
                    code: f.code.clone(),
                    feedback_id: 999,
                    content: "x".to_string(),
                },
            );
            assert!(matches!(missing, Err(AppError::NotFound(_))));

            let deleted = delete(
                conn,
                &DeleteFeedbackRequest {
                    code: f.code.clone(),
                    feedback_id: created.id,
                },
            )
            .unwrap();
            assert_eq!(deleted.deleted_id, created.id);
            assert_eq!(deleted.content, "After");
            assert_eq!(list_as_guest(conn, &f).unwrap().total_count, 0);
        });
    }

    #[test]
    fn test_other_guest_cannot_touch_feedback() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, true);
            let created = create(conn, &create_req(&f, "Mine")).unwrap();

            let now = Utc::now();
            conn.execute(
                "INSERT INTO guests (name, email, phone, host, created_at, updated_at)
                 VALUES ('Second', 's@example.com', '01000000000', ?1, ?2, ?2)",
                params![f.owner, now],
            )
            .unwrap();
            let guest_id = conn.last_insert_rowid();
            let other_code = invitations::issue(conn, f.project.id, guest_id).unwrap();

            let err = delete(
                conn,
                &DeleteFeedbackRequest {
                    code: other_code,
                    feedback_id: created.id,
                },
            )
            .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        });
    }

    #[test]
    fn test_reply_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let f = fixture(conn, true);
            let created = create(conn, &create_req(&f, "Bigger logo")).unwrap();
            let reply = AddReplyRequest {
                feedback_id: created.id,
                reply: "Done in the next revision".to_string(),
            };

            // Still under review: no replies yet.
            let err = add_reply(conn, f.owner, &reply).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("reviewed")));

            mark_reviewed(conn, &f);

            // Guests are locked out once the review is done.
            let err = edit(
                conn,
                &EditFeedbackRequest {
                    code: f.code.clone(),
                    feedback_id: created.id,
                    content: "late".to_string(),
                },
            )
            .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));

            assert!(matches!(
                add_reply(conn, f.other, &reply),
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(
                add_reply(
                    conn,
                    f.owner,
                    &AddReplyRequest {
                        feedback_id: 999,
                        reply: "x".to_string()
                    }
                ),
                Err(AppError::NotFound(_))
            ));

            let added = add_reply(conn, f.owner, &reply).unwrap();
            assert_eq!(added.reply.as_deref(), Some("Done in the next revision"));
            assert!(added.replied_at.is_some());

            let removed = delete_reply(
                conn,
                f.owner,
                &DeleteReplyRequest {
                    feedback_id: created.id,
                },
            )
            .unwrap();
            assert_eq!(
                removed.deleted_reply.as_deref(),
                Some("Done in the next revision")
            );

            let stored: Option<String> = conn
                .query_row("SELECT reply FROM feedback WHERE id = ?1", [created.id], |r| {
                    r.get(0)
                })
                .unwrap();
            assert!(stored.is_none());

            let logs = activity::project_logs(conn, f.project.id, None).unwrap();
            assert_eq!(logs[0].msg, msg::FEEDBACK_REPLY_DELETED);
            assert_eq!(logs[1].msg, msg::FEEDBACK_REPLIED);
        });
    }
}

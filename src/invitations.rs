//! Guest invitation codes.
//!
//! A guest never logs in; the 16-character code handed out at project
//! creation is their only credential, and it is scoped to one project.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::is_unique_violation;
use crate::error::{AppError, AppResult};
use crate::models::{TrackInfo, TRACK_COLUMNS};
use crate::revisions::RevisionStatus;

/// Length of every invitation code.
pub const CODE_LEN: usize = 16;

const MAX_CODE_ATTEMPTS: usize = 5;

/// Who a code belongs to and which project it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub guest_id: i64,
    pub guest_name: String,
    pub project_id: i64,
    pub project_name: String,
}

pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}

/// Invite `guest_id` to `project_id`, returning the new code.
pub fn issue(conn: &Connection, project_id: i64, guest_id: i64) -> AppResult<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code();
        match conn.execute(
            "INSERT INTO invitations (project_id, guest_id, code, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![project_id, guest_id, code, Utc::now()],
        ) {
            Ok(_) => return Ok(code),
            Err(e) if is_unique_violation(&e, "invitations.code") => {
                tracing::debug!("invitation code collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(
        "could not generate a unique invitation code".to_string(),
    ))
}

pub fn find(conn: &Connection, code: &str) -> AppResult<Option<Invitation>> {
    Ok(conn
        .query_row(
            "SELECT g.id, g.name, p.id, p.name
             FROM invitations i
             JOIN guests g ON g.id = i.guest_id
             JOIN projects p ON p.id = i.project_id
             WHERE i.code = ?1",
            [code],
            |row| {
                Ok(Invitation {
                    guest_id: row.get(0)?,
                    guest_name: row.get(1)?,
                    project_id: row.get(2)?,
                    project_name: row.get(3)?,
                })
            },
        )
        .optional()?)
}

/// Look up a code, failing with 400 when it does not exist.
pub fn require(conn: &Connection, code: &str) -> AppResult<Invitation> {
    find(conn, code)?.ok_or_else(|| AppError::bad_request("Invalid invitation code"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitedRevision {
    pub id: i64,
    pub rev_no: i64,
    pub status: RevisionStatus,
}

/// What a guest sees when opening their invitation link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationOverview {
    pub success: bool,
    pub message: String,
    pub guest_name: String,
    pub project_id: i64,
    pub project_name: String,
    pub project_description: Option<String>,
    pub revisions: Vec<InvitedRevision>,
    pub tracks: Vec<TrackInfo>,
}

pub fn resolve(conn: &Connection, code: &str) -> AppResult<InvitationOverview> {
    let invitation = require(conn, code)?;

    let description: Option<String> = conn.query_row(
        "SELECT description FROM projects WHERE id = ?1",
        [invitation.project_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT id, rev_no, status FROM revisions WHERE project_id = ?1 ORDER BY rev_no",
    )?;
    let revisions = stmt
        .query_map([invitation.project_id], |row| {
            Ok(InvitedRevision {
                id: row.get(0)?,
                rev_no: row.get(1)?,
                status: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tracks WHERE project_id = ?1 ORDER BY id",
        TRACK_COLUMNS
    ))?;
    let tracks = stmt
        .query_map([invitation.project_id], TrackInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InvitationOverview {
        success: true,
        message: "Invitation resolved".to_string(),
        guest_name: invitation.guest_name,
        project_id: invitation.project_id,
        project_name: invitation.project_name,
        project_description: description,
        revisions,
        tracks,
    })
}

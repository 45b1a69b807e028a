//! Activity log: an append-only trail of who did what to which project.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppResult;

/// Default number of log entries returned by the list queries.
pub const DEFAULT_LIMIT: i64 = 50;

/// Message keys written by the services.
pub mod msg {
    pub const PROJECT_CREATED: &str = "project.created";
    pub const REVISION_CREATED: &str = "revision.created";
    pub const REVISION_SUBMITTED: &str = "revision.submitted";
    pub const REVISION_REVIEWED: &str = "revision.reviewed";
    pub const TRACK_ADDED: &str = "track.added";
    pub const PAY_CHECK_POINT_PAID: &str = "paycheckpoint.paid";
    pub const FEEDBACK_CREATED: &str = "feedback.created";
    pub const FEEDBACK_EDITED: &str = "feedback.edited";
    pub const FEEDBACK_DELETED: &str = "feedback.deleted";
    pub const FEEDBACK_REPLIED: &str = "feedback.replied";
    pub const FEEDBACK_REPLY_DELETED: &str = "feedback.reply_deleted";
}

/// Author summary attached to project log entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogUser {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub msg: String,
    pub params: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<LogUser>,
}

/// Append a log entry.
///
/// A failed write is reported and swallowed: the action being logged has
/// already happened and must not be undone by its audit trail.
pub fn record(
    conn: &Connection,
    user_id: Option<i64>,
    project_id: Option<i64>,
    msg: &str,
    params: Option<Value>,
) -> Option<i64> {
    let now = Utc::now();
    let params_json = params.map(|p| p.to_string());
    match conn.execute(
        "INSERT INTO activity_logs (user_id, project_id, msg, params, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![user_id, project_id, msg, params_json, now],
    ) {
        Ok(_) => Some(conn.last_insert_rowid()),
        Err(e) => {
            tracing::error!(error = %e, msg, ?project_id, "failed to write activity log");
            None
        }
    }
}

/// Most recent entries for a project, newest first, with the acting user.
pub fn project_logs(
    conn: &Connection,
    project_id: i64,
    limit: Option<i64>,
) -> AppResult<Vec<ActivityLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.user_id, l.project_id, l.msg, l.params, l.created_at, l.updated_at,
                u.id, u.email, u.name
         FROM activity_logs l
         LEFT JOIN users u ON u.id = l.user_id
         WHERE l.project_id = ?1
         ORDER BY l.id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![project_id, effective_limit(limit)], |row| {
        let user_id: Option<i64> = row.get(7)?;
        let user = match user_id {
            Some(id) => Some(LogUser {
                id,
                email: row.get(8)?,
                name: row.get(9)?,
            }),
            None => None,
        };
        Ok(ActivityLogEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            project_id: row.get(2)?,
            msg: row.get(3)?,
            params: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            user,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Most recent entries written by a user, newest first.
pub fn user_logs(
    conn: &Connection,
    user_id: i64,
    limit: Option<i64>,
) -> AppResult<Vec<ActivityLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, project_id, msg, params, created_at, updated_at
         FROM activity_logs
         WHERE user_id = ?1
         ORDER BY id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, effective_limit(limit)], |row| {
        Ok(ActivityLogEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            project_id: row.get(2)?,
            msg: row.get(3)?,
            params: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            user: None,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn effective_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(n) if n > 0 => n,
        _ => DEFAULT_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn seed_user(conn: &Connection) -> i64 {
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (email, name, phone, password, created_at, updated_at)
             VALUES ('owner@example.com', 'Owner', '010-1234-5678', 'x', ?1, ?1)",
            [now],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_record_and_list_user_logs() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let user = seed_user(conn);
            record(conn, Some(user), None, "first", None).unwrap();
            record(
                conn,
                Some(user),
                None,
                "second",
                Some(serde_json::json!({"k": 1})),
            )
            .unwrap();

            let logs = user_logs(conn, user, None).unwrap();
            assert_eq!(logs.len(), 2);
            assert_eq!(logs[0].msg, "second");
            assert_eq!(logs[0].params.as_deref(), Some(r#"{"k":1}"#));
            assert_eq!(logs[1].msg, "first");
        });
    }

    #[test]
    fn test_limit_applies() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let user = seed_user(conn);
            for i in 0..5 {
                record(conn, Some(user), None, &format!("m{}", i), None);
            }
            assert_eq!(user_logs(conn, user, Some(2)).unwrap().len(), 2);
            assert_eq!(user_logs(conn, user, Some(0)).unwrap().len(), 5);
        });
    }

    #[test]
    fn test_record_failure_is_swallowed() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            // No such user: the foreign key rejects the insert.
            assert_eq!(record(conn, Some(999), None, "orphan", None), None);
        });
    }
}

//! User accounts.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::auth::password::hash_password;
use crate::db::is_unique_violation;
use crate::error::{AppError, AppResult};
use crate::files::SavedFile;
use crate::models::{UserInfo, USER_COLUMNS};
use crate::validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub phone: String,
    pub password: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate::email(&self.email)?;
        validate::mobile_phone(&self.phone)?;
        validate::password(&self.password)
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(email) = &self.email {
            validate::email(email)?;
        }
        if let Some(phone) = &self.phone {
            validate::mobile_phone(phone)?;
        }
        if let Some(password) = &self.password {
            validate::password(password)?;
        }
        Ok(())
    }
}

/// Insert a validated account, hashing its password.
pub fn create_user(conn: &Connection, req: &CreateUserRequest) -> AppResult<UserInfo> {
    req.validate()?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (email, name, phone, password, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![req.email, req.name, req.phone, hash_password(&req.password), now],
    )
    .map_err(map_conflict)?;
    get_user(conn, conn.last_insert_rowid())
}

pub fn list_users(conn: &Connection) -> AppResult<Vec<UserInfo>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
    let users = stmt
        .query_map([], UserInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn find_user(conn: &Connection, id: i64) -> AppResult<Option<UserInfo>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            UserInfo::from_row,
        )
        .optional()?)
}

pub fn get_user(conn: &Connection, id: i64) -> AppResult<UserInfo> {
    find_user(conn, id)?.ok_or_else(|| user_not_found(id))
}

/// Look a user up by email, returning the stored password hash alongside.
pub fn find_credentials(conn: &Connection, email: &str) -> AppResult<Option<(UserInfo, String)>> {
    Ok(conn
        .query_row(
            &format!("SELECT {}, password FROM users WHERE email = ?1", USER_COLUMNS),
            [email],
            |row| Ok((UserInfo::from_row(row)?, row.get(6)?)),
        )
        .optional()?)
}

pub fn update_user(conn: &Connection, id: i64, req: &UpdateUserRequest) -> AppResult<UserInfo> {
    req.validate()?;
    let current = get_user(conn, id)?;
    let password_hash = req.password.as_deref().map(hash_password);

    conn.execute(
        "UPDATE users SET
            email = ?1,
            name = ?2,
            phone = ?3,
            password = COALESCE(?4, password),
            updated_at = ?5
         WHERE id = ?6",
        params![
            req.email.as_ref().unwrap_or(&current.email),
            req.name.as_ref().or(current.name.as_ref()),
            req.phone.as_ref().unwrap_or(&current.phone),
            password_hash,
            Utc::now(),
            id
        ],
    )
    .map_err(map_conflict)?;
    get_user(conn, id)
}

/// Delete an account and, by cascade, every project it owns.
///
/// Returns the uploads of those projects so the caller can remove them
/// from disk once the rows are gone.
pub fn remove_user(conn: &mut Connection, id: i64) -> AppResult<Vec<SavedFile>> {
    let tx = conn.transaction()?;
    let orphaned = {
        let mut stmt = tx.prepare(
            "SELECT f.stored_filename, f.file_path
             FROM files f
             JOIN revisions r ON r.id = f.revision_id
             JOIN projects p ON p.id = r.project_id
             WHERE p.author_id = ?1
             ORDER BY f.id",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok(SavedFile {
                stored_filename: row.get(0)?,
                path: PathBuf::from(row.get::<_, String>(1)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let affected = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
    if affected == 0 {
        return Err(user_not_found(id));
    }
    tx.commit()?;
    tracing::info!(user_id = id, files = orphaned.len(), "user removed");
    Ok(orphaned)
}

fn user_not_found(id: i64) -> AppError {
    AppError::not_found(format!("User with ID {} not found", id))
}

/// Turn unique-constraint failures on `users` into 409s.
fn map_conflict(err: rusqlite::Error) -> AppError {
    if is_unique_violation(&err, "users.email") {
        AppError::conflict("Email already exists")
    } else if is_unique_violation(&err, "users.phone") {
        AppError::conflict("Phone number already exists")
    } else {
        err.into()
    }
}

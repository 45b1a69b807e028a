//! SQLite persistence.
//!
//! A single connection lives behind a mutex; async callers go through
//! [`Database::call`], which runs the closure on the blocking pool since
//! rusqlite is synchronous.

pub mod schema;

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{AppError, AppResult};

/// Shared handle to the application database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: &str) -> AppResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(path)?
        };
        Self::from_connection(conn)
    }

    /// Fresh in-memory database, migrated.
    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create all tables that do not exist yet.
    pub fn migrate(&self) -> AppResult<()> {
        let conn = self.conn.lock();
        for statement in schema::MIGRATIONS {
            conn.execute(statement, []).map_err(|e| {
                log::error!("Migration failed: {}", e);
                e
            })?;
        }
        log::debug!("Database schema migrated ({} statements)", schema::MIGRATIONS.len());
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn call<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::Internal(format!("database task failed: {}", e)))?
    }

    /// Run `f` against the connection on the current thread.
    pub fn with_conn<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Connection) -> T,
    {
        let mut guard = self.conn.lock();
        f(&mut guard)
    }
}

/// True when `err` is a UNIQUE constraint failure mentioning `column`
/// (e.g. `"users.email"`).
pub fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE && msg.contains(column)
        }
        _ => false,
    }
}

/// True when `sql`, bound with `id` as `?1`, returns a row.
pub fn exists(conn: &Connection, sql: &str, id: i64) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row(sql, [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

//! Records shared by several services, with their row mappers.
//!
//! Column order in each `from_row` matches the `*_COLUMNS` constant next to
//! it; queries select those constants so the two cannot drift apart.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::revisions::RevisionStatus;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub const USER_COLUMNS: &str = "id, email, name, phone, created_at, updated_at";

/// Public view of a user account (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserInfo {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Guests
// ---------------------------------------------------------------------------

pub const GUEST_COLUMNS: &str =
    "g.id, g.name, g.email, g.phone, i.code, g.created_at, g.updated_at";

/// A guest invited to a project, with the invitation code they review with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuestInfo {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            code: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

pub const TRACK_COLUMNS: &str =
    "id, name, created_rev_no, created_rev_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: i64,
    pub name: String,
    pub created_rev_no: i64,
    pub created_rev_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackInfo {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_rev_no: row.get(2)?,
            created_rev_id: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

pub const REVISION_COLUMNS: &str = "id, rev_no, description, status, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub id: i64,
    pub rev_no: i64,
    pub description: Option<String>,
    pub status: RevisionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RevisionInfo {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            rev_no: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

pub const FILE_COLUMNS: &str = "id, track_id, original_filename, stored_filename, file_size, \
                                mime_type, src, uploaded_at";

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: i64,
    pub track_id: i64,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub src: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl FileInfo {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            track_id: row.get(1)?,
            original_filename: row.get(2)?,
            stored_filename: row.get(3)?,
            file_size: row.get(4)?,
            mime_type: row.get(5)?,
            src: row.get(6)?,
            uploaded_at: row.get(7)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Payment checkpoints
// ---------------------------------------------------------------------------

pub const PAY_CHECK_POINT_COLUMNS: &str =
    "id, pay_date, price, label, paid_amount, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayCheckPointInfo {
    pub id: i64,
    pub pay_date: DateTime<Utc>,
    pub price: i64,
    pub label: String,
    pub paid_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayCheckPointInfo {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            pay_date: row.get(1)?,
            price: row.get(2)?,
            label: row.get(3)?,
            paid_amount: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

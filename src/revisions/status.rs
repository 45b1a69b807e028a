//! Revision lifecycle.
//!
//! ```text
//! pending ──submit (owner)──▶ submitted ──review done (guest)──▶ reviewed
//! ```
//!
//! Guests may post, edit, list and delete feedback only while a revision is
//! `submitted`; the owner may reply only once it is `reviewed`.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Where a revision is in its review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionStatus {
    /// Created, files not yet uploaded.
    Pending,
    /// Files uploaded; guests are reviewing.
    Submitted,
    /// Guests finished reviewing; owner answers feedback.
    Reviewed,
}

/// Events that move a revision forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionEvent {
    Submit,
    ReviewDone,
}

impl RevisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Reviewed => "reviewed",
        }
    }

    /// Apply `event`, or explain why it is not allowed from here.
    pub fn transition(self, event: RevisionEvent) -> AppResult<Self> {
        match (self, event) {
            (Self::Pending, RevisionEvent::Submit) => Ok(Self::Submitted),
            (Self::Submitted, RevisionEvent::ReviewDone) => Ok(Self::Reviewed),
            (Self::Submitted | Self::Reviewed, RevisionEvent::Submit) => {
                Err(AppError::bad_request(format!(
                    "Revision has already been submitted (current status: {})",
                    self
                )))
            }
            (_, RevisionEvent::ReviewDone) => Err(AppError::bad_request(format!(
                "Review can only be completed for a submitted revision (current status: {})",
                self
            ))),
        }
    }

    pub fn accepts_guest_feedback(self) -> bool {
        self == Self::Submitted
    }

    pub fn accepts_owner_reply(self) -> bool {
        self == Self::Reviewed
    }

    /// Fail with a 400 naming `action` unless guests may touch feedback now.
    pub fn require_guest_feedback(self, action: &str) -> AppResult<()> {
        if self.accepts_guest_feedback() {
            Ok(())
        } else {
            Err(AppError::bad_request(format!(
                "Cannot {} feedback: revision status is not 'submitted' (current status: {})",
                action, self
            )))
        }
    }

    /// Fail with a 400 naming `action` unless the owner may reply now.
    pub fn require_owner_reply(self, action: &str) -> AppResult<()> {
        if self.accepts_owner_reply() {
            Ok(())
        } else {
            Err(AppError::bad_request(format!(
                "Cannot {} reply: revision status is not 'reviewed' (current status: {})",
                action, self
            )))
        }
    }
}

impl fmt::Display for RevisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "submitted" => Ok(Self::Submitted),
            "reviewed" => Ok(Self::Reviewed),
            other => Err(format!("unknown revision status '{}'", other)),
        }
    }
}

impl ToSql for RevisionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RevisionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

//! Revision submission, inspection and review.

pub mod status;

pub use status::{RevisionEvent, RevisionStatus};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::{self, msg};
use crate::error::{AppError, AppResult};
use crate::files::{self, FileStore, SavedFile};
use crate::invitations;
use crate::models::{FileInfo, TrackInfo, FILE_COLUMNS, TRACK_COLUMNS};
use crate::validate;

/// Revision row joined with what authorization needs from its project.
#[derive(Debug, Clone)]
struct RevisionRow {
    id: i64,
    project_id: i64,
    project_name: String,
    author_id: i64,
    rev_no: i64,
    description: Option<String>,
    status: RevisionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn load_revision(conn: &Connection, revision_id: i64) -> AppResult<RevisionRow> {
    conn.query_row(
        "SELECT r.id, r.project_id, p.name, p.author_id, r.rev_no, r.description, r.status,
                r.created_at, r.updated_at
         FROM revisions r JOIN projects p ON p.id = r.project_id
         WHERE r.id = ?1",
        [revision_id],
        |row| {
            Ok(RevisionRow {
                id: row.get(0)?,
                project_id: row.get(1)?,
                project_name: row.get(2)?,
                author_id: row.get(3)?,
                rev_no: row.get(4)?,
                description: row.get(5)?,
                status: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Revision not found"))
}

fn load_owned_revision(
    conn: &Connection,
    revision_id: i64,
    owner_id: i64,
) -> AppResult<RevisionRow> {
    let revision = load_revision(conn, revision_id)?;
    if revision.author_id != owner_id {
        return Err(AppError::forbidden("You do not have access to this revision"));
    }
    Ok(revision)
}

/// Status and project of a revision, for the feedback checks.
pub(crate) fn status_of(
    conn: &Connection,
    revision_id: i64,
) -> AppResult<Option<(i64, RevisionStatus)>> {
    Ok(conn
        .query_row(
            "SELECT project_id, status FROM revisions WHERE id = ?1",
            [revision_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// One uploaded file. Field names are snake_case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFile {
    pub original_filename: String,
    pub size: i64,
    pub modified_datetime: String,
    /// Base64 file content.
    pub data: String,
    /// Source file (PSD, AI...) restricted to the owner on download.
    #[serde(default)]
    pub src: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub track_id: i64,
    pub file: UploadFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRevisionRequest {
    pub revision_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uploads: Vec<Upload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRevisionResponse {
    pub success: bool,
    pub message: String,
    pub revision_id: i64,
    pub status: RevisionStatus,
    pub files: Vec<FileInfo>,
    pub submitted_at: DateTime<Utc>,
}

/// Decoded upload, ready to be written.
struct PreparedUpload<'a> {
    track_id: i64,
    file: &'a UploadFile,
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
}

/// Store the uploaded files and mark the revision submitted.
///
/// Files are written before the transaction opens; if the transaction
/// fails they are removed again so no orphan stays on disk.
pub fn submit_revision(
    conn: &mut Connection,
    store: &FileStore,
    owner_id: i64,
    req: &SubmitRevisionRequest,
) -> AppResult<SubmitRevisionResponse> {
    let revision = load_owned_revision(conn, req.revision_id, owner_id)?;
    let next = revision.status.transition(RevisionEvent::Submit)?;

    for upload in &req.uploads {
        let in_project = conn
            .query_row(
                "SELECT id FROM tracks WHERE id = ?1 AND project_id = ?2",
                params![upload.track_id, revision.project_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !in_project {
            return Err(AppError::bad_request(format!(
                "Track {} does not belong to this project",
                upload.track_id
            )));
        }
    }

    let prepared = req
        .uploads
        .iter()
        .map(|upload| {
            let bytes = STANDARD.decode(upload.file.data.trim()).map_err(|_| {
                AppError::bad_request(format!(
                    "File data of {} is not valid base64",
                    upload.file.original_filename
                ))
            })?;
            let modified = validate::date("modified_datetime", &upload.file.modified_datetime)?;
            Ok(PreparedUpload {
                track_id: upload.track_id,
                file: &upload.file,
                bytes,
                modified,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let mut saved: Vec<SavedFile> = Vec::with_capacity(prepared.len());
    for upload in &prepared {
        match store.save(&upload.file.original_filename, &upload.bytes) {
            Ok(file) => saved.push(file),
            Err(e) => {
                store.discard(&saved);
                return Err(e);
            }
        }
    }

    let result = record_submission(conn, &revision, next, req, &prepared, &saved);
    if let Err(ref e) = result {
        tracing::error!(
            revision_id = revision.id,
            error = %e,
            "submission failed, removing stored files"
        );
        store.discard(&saved);
    }
    let (stored, submitted_at) = result?;

    activity::record(
        conn,
        Some(owner_id),
        Some(revision.project_id),
        msg::REVISION_SUBMITTED,
        Some(json!({
            "revisionId": revision.id,
            "revNo": revision.rev_no,
            "files": stored.len(),
        })),
    );
    tracing::info!(revision_id = revision.id, files = stored.len(), "revision submitted");

    Ok(SubmitRevisionResponse {
        success: true,
        message: "Revision submitted successfully".to_string(),
        revision_id: revision.id,
        status: next,
        files: stored,
        submitted_at,
    })
}

fn record_submission(
    conn: &mut Connection,
    revision: &RevisionRow,
    next: RevisionStatus,
    req: &SubmitRevisionRequest,
    prepared: &[PreparedUpload<'_>],
    saved: &[SavedFile],
) -> AppResult<(Vec<FileInfo>, DateTime<Utc>)> {
    let tx = conn.transaction()?;
    let now = Utc::now();
    let mut ids = Vec::with_capacity(saved.len());

    for (upload, file) in prepared.iter().zip(saved) {
        tx.execute(
            "INSERT INTO files (revision_id, track_id, original_filename, stored_filename, file_path,
                                file_size, mime_type, modified_datetime, src, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                revision.id,
                upload.track_id,
                upload.file.original_filename,
                file.stored_filename,
                file.path.to_string_lossy().into_owned(),
                upload.file.size,
                files::mime_type(&upload.file.original_filename),
                upload.modified,
                upload.file.src,
                now,
            ],
        )?;
        ids.push(tx.last_insert_rowid());
    }

    tx.execute(
        "UPDATE revisions SET status = ?1, description = COALESCE(?2, description), updated_at = ?3
         WHERE id = ?4",
        params![next, req.description, now, revision.id],
    )?;

    let mut stored = Vec::with_capacity(ids.len());
    {
        let mut stmt = tx.prepare(&format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS))?;
        for id in ids {
            stored.push(stmt.query_row([id], FileInfo::from_row)?);
        }
    }
    tx.commit()?;
    Ok((stored, now))
}

// ---------------------------------------------------------------------------
// Info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAtRevision {
    #[serde(flatten)]
    pub track: TrackInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_file: Option<FileInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfoResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub rev_no: i64,
    pub description: Option<String>,
    pub status: RevisionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project_id: i64,
    pub project_name: String,
    pub tracks: Vec<TrackAtRevision>,
}

/// Tracks as they stood at a revision, each with its newest file so far.
pub fn revision_info(
    conn: &Connection,
    owner_id: i64,
    revision_id: i64,
) -> AppResult<RevisionInfoResponse> {
    let revision = load_owned_revision(conn, revision_id, owner_id)?;

    let mut tracks_stmt = conn.prepare(&format!(
        "SELECT {} FROM tracks WHERE project_id = ?1 AND created_rev_no <= ?2 ORDER BY id",
        TRACK_COLUMNS
    ))?;
    let tracks = tracks_stmt
        .query_map(params![revision.project_id, revision.rev_no], TrackInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut file_stmt = conn.prepare(&format!(
        "SELECT {} FROM files
         WHERE track_id = ?1
           AND revision_id IN (SELECT id FROM revisions WHERE project_id = ?2 AND rev_no <= ?3)
         ORDER BY (SELECT rev_no FROM revisions WHERE revisions.id = files.revision_id) DESC, id DESC
         LIMIT 1",
        FILE_COLUMNS
    ))?;

    let mut out = Vec::with_capacity(tracks.len());
    for track in tracks {
        let latest_file = file_stmt
            .query_row(
                params![track.id, revision.project_id, revision.rev_no],
                FileInfo::from_row,
            )
            .optional()?;
        out.push(TrackAtRevision { track, latest_file });
    }

    Ok(RevisionInfoResponse {
        success: true,
        message: "Revision info retrieved successfully".to_string(),
        id: revision.id,
        rev_no: revision.rev_no,
        description: revision.description,
        status: revision.status,
        created_at: revision.created_at,
        updated_at: revision.updated_at,
        project_id: revision.project_id,
        project_name: revision.project_name,
        tracks: out,
    })
}

// ---------------------------------------------------------------------------
// Review done
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDoneRequest {
    pub code: String,
    pub revision_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDoneResponse {
    pub success: bool,
    pub message: String,
    pub revision_id: i64,
    pub revision_no: i64,
    pub project_id: i64,
    pub project_name: String,
    pub status: RevisionStatus,
    pub reviewed_at: DateTime<Utc>,
}

/// A guest closes the review of a submitted revision.
pub fn review_done(conn: &Connection, req: &ReviewDoneRequest) -> AppResult<ReviewDoneResponse> {
    let invitation = invitations::require(conn, &req.code)?;
    let revision = load_revision(conn, req.revision_id)?;
    if revision.project_id != invitation.project_id {
        return Err(AppError::forbidden(
            "This invitation does not cover the revision's project",
        ));
    }
    let next = revision.status.transition(RevisionEvent::ReviewDone)?;

    let now = Utc::now();
    conn.execute(
        "UPDATE revisions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![next, now, revision.id],
    )?;
    activity::record(
        conn,
        None,
        Some(revision.project_id),
        msg::REVISION_REVIEWED,
        Some(json!({
            "revisionId": revision.id,
            "revNo": revision.rev_no,
            "guestId": invitation.guest_id,
            "guestName": invitation.guest_name,
        })),
    );

    Ok(ReviewDoneResponse {
        success: true,
        message: "Review completed".to_string(),
        revision_id: revision.id,
        revision_no: revision.rev_no,
        project_id: revision.project_id,
        project_name: revision.project_name,
        status: next,
        reviewed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::projects::{
        add_track, create_project, create_revision, AddTrackRequest, CreateRevisionRequest,
    };
    use crate::test_support::{first_guest_code, sample_project, seed_user};

    fn upload(track_id: i64, name: &str, content: &[u8], src: bool) -> Upload {
        Upload {
            track_id,
            file: UploadFile {
                original_filename: name.to_string(),
                size: content.len() as i64,
                modified_datetime: "2025-03-02T10:30:00.000Z".to_string(),
                data: STANDARD.encode(content),
                src,
            },
        }
    }

    fn stored_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_submit_stores_files_and_changes_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();

            let res = submit_revision(
                conn,
                &store,
                owner,
                &SubmitRevisionRequest {
                    revision_id: project.first_revision_id,
                    description: Some("First draft".to_string()),
                    uploads: vec![
                        upload(project.first_track_id, "cover.PNG", b"png", false),
                        upload(project.first_track_id, "cover.psd", b"psd", true),
                    ],
                },
            )
            .unwrap();

            assert_eq!(res.status, RevisionStatus::Submitted);
            assert_eq!(res.files.len(), 2);
            assert_eq!(res.files[0].mime_type, "image/png");
            assert!(res.files[1].src);
            assert_eq!(stored_files(dir.path()), 2);

            let on_disk = std::fs::read(dir.path().join(&res.files[0].stored_filename)).unwrap();
            assert_eq!(on_disk, b"png");

            let info = revision_info(conn, owner, project.first_revision_id).unwrap();
            assert_eq!(info.description.as_deref(), Some("First draft"));
        });
    }

    #[test]
    fn test_submit_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let req = SubmitRevisionRequest {
                revision_id: project.first_revision_id,
                description: None,
                uploads: vec![],
            };
            submit_revision(conn, &store, owner, &req).unwrap();
            let err = submit_revision(conn, &store, owner, &req).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("submitted")));
        });
    }

    #[test]
    fn test_submit_error_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let other = seed_user(conn, "other@example.com", "010-3333-4444");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let foreign = create_project(conn, other, &sample_project()).unwrap();

            let mut req = SubmitRevisionRequest {
                revision_id: 999,
                description: None,
                uploads: vec![upload(foreign.first_track_id, "a.png", b"x", false)],
            };
            assert!(matches!(
                submit_revision(conn, &store, owner, &req),
                Err(AppError::NotFound(_))
            ));

            req.revision_id = project.first_revision_id;
            assert!(matches!(
                submit_revision(conn, &store, other, &req),
                Err(AppError::Forbidden(_))
            ));

            let err = submit_revision(conn, &store, owner, &req).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("Track")));

            let mut bad = upload(project.first_track_id, "a.png", b"x", false);
            bad.file.data = "%%% not base64 %%%".to_string();
            req.uploads = vec![bad];
            let err = submit_revision(conn, &store, owner, &req).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("base64")));

            let mut bad_date = upload(project.first_track_id, "a.png", b"x", false);
            bad_date.file.modified_datetime = "yesterday".to_string();
            req.uploads = vec![bad_date];
            assert!(matches!(
                submit_revision(conn, &store, owner, &req),
                Err(AppError::BadRequest(_))
            ));

            // Nothing was written and the revision is still pending.
            assert_eq!(stored_files(dir.path()), 0);
            let info = revision_info(conn, owner, project.first_revision_id).unwrap();
            assert_eq!(info.status, RevisionStatus::Pending);
        });
    }

    #[test]
    fn test_failed_transaction_removes_stored_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            conn.execute_batch(
                "CREATE TEMP TRIGGER reject_status BEFORE UPDATE ON revisions
                 BEGIN SELECT RAISE(ABORT, 'status update rejected'); END;",
            )
            .unwrap();

            let err = submit_revision(
                conn,
                &store,
                owner,
                &SubmitRevisionRequest {
                    revision_id: project.first_revision_id,
                    description: None,
                    uploads: vec![
                        upload(project.first_track_id, "a.png", b"one", false),
                        upload(project.first_track_id, "b.psd", b"two", true),
                    ],
                },
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Database(_)));

            assert_eq!(stored_files(dir.path()), 0);
            let files: i64 = conn
                .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
                .unwrap();
            assert_eq!(files, 0);

            conn.execute_batch("DROP TRIGGER reject_status;").unwrap();
            let info = revision_info(conn, owner, project.first_revision_id).unwrap();
            assert_eq!(info.status, RevisionStatus::Pending);
        });
    }

    #[test]
    fn test_revision_info_latest_file_per_track() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let main = project.first_track_id;

            submit_revision(
                conn,
                &store,
                owner,
                &SubmitRevisionRequest {
                    revision_id: project.first_revision_id,
                    description: None,
                    uploads: vec![upload(main, "v1.png", b"v1", false)],
                },
            )
            .unwrap();

            let rev2 = create_revision(conn, owner, &CreateRevisionRequest { project_id: project.id })
                .unwrap();
            let detail = add_track(
                conn,
                owner,
                &AddTrackRequest {
                    project_id: project.id,
                    name: "Detail".to_string(),
                },
            )
            .unwrap();

            // Revision 2 exists but has no files yet: the main track still shows v1.
            let info = revision_info(conn, owner, rev2.id).unwrap();
            assert_eq!(info.tracks.len(), 2);
            assert_eq!(
                info.tracks[0].latest_file.as_ref().unwrap().original_filename,
                "v1.png"
            );
            assert!(info.tracks[1].latest_file.is_none());

            submit_revision(
                conn,
                &store,
                owner,
                &SubmitRevisionRequest {
                    revision_id: rev2.id,
                    description: None,
                    uploads: vec![
                        upload(main, "v2.png", b"v2", false),
                        upload(detail.track_id, "d.png", b"d", false),
                    ],
                },
            )
            .unwrap();

            let info = revision_info(conn, owner, rev2.id).unwrap();
            assert_eq!(
                info.tracks[0].latest_file.as_ref().unwrap().original_filename,
                "v2.png"
            );

            // Revision 1 never sees the later track or file.
            let info = revision_info(conn, owner, project.first_revision_id).unwrap();
            assert_eq!(info.tracks.len(), 1);
            assert_eq!(
                info.tracks[0].latest_file.as_ref().unwrap().original_filename,
                "v1.png"
            );
        });
    }

    #[test]
    fn test_review_done_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let other = seed_user(conn, "other@example.com", "010-3333-4444");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let foreign = create_project(conn, other, &sample_project()).unwrap();
            let code = first_guest_code(conn, project.id);

            let req = ReviewDoneRequest {
                code: code.clone(),
                revision_id: project.first_revision_id,
            };
            // Pending revisions cannot be reviewed.
            assert!(matches!(review_done(conn, &req), Err(AppError::BadRequest(_))));

            submit_revision(
                conn,
                &store,
                owner,
                &SubmitRevisionRequest {
                    revision_id: project.first_revision_id,
                    description: None,
                    uploads: vec![],
                },
            )
            .unwrap();

            let bad_code = ReviewDoneRequest {
                code: "nope".to_string(),
                revision_id: project.first_revision_id,
            };
            assert!(matches!(review_done(conn, &bad_code), Err(AppError::BadRequest(_))));

            let other_project = ReviewDoneRequest {
                code: code.clone(),
                revision_id: foreign.first_revision_id,
            };
            assert!(matches!(review_done(conn, &other_project), Err(AppError::Forbidden(_))));

            let missing = ReviewDoneRequest {
                code,
                revision_id: 999,
            };
            assert!(matches!(review_done(conn, &missing), Err(AppError::NotFound(_))));

            let done = review_done(conn, &req).unwrap();
            assert_eq!(done.status, RevisionStatus::Reviewed);
            assert_eq!(done.revision_no, 1);
            assert!(matches!(review_done(conn, &req), Err(AppError::BadRequest(_))));

            let logs = activity::project_logs(conn, project.id, None).unwrap();
            assert_eq!(logs[0].msg, msg::REVISION_REVIEWED);
            assert!(logs[0].user.is_none());
        });
    }

    #[test]
    fn test_download_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_user(conn, "owner@example.com", "010-1111-2222");
            let other = seed_user(conn, "other@example.com", "010-3333-4444");
            let project = create_project(conn, owner, &sample_project()).unwrap();
            let res = submit_revision(
                conn,
                &store,
                owner,
                &SubmitRevisionRequest {
                    revision_id: project.first_revision_id,
                    description: None,
                    uploads: vec![
                        upload(project.first_track_id, "preview.jpg", b"jpg", false),
                        upload(project.first_track_id, "layers.psd", b"psd", true),
                    ],
                },
            )
            .unwrap();
            let preview = &res.files[0].stored_filename;
            let source = &res.files[1].stored_filename;

            let d = files::authorize_download(conn, other, preview).unwrap();
            assert_eq!(d.original_filename, "preview.jpg");
            assert_eq!(d.mime_type, "image/jpeg");

            assert!(files::authorize_download(conn, owner, source).is_ok());
            assert!(matches!(
                files::authorize_download(conn, other, source),
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(
                files::authorize_download(conn, owner, "missing.png"),
                Err(AppError::NotFound(_))
            ));
        });
    }
}

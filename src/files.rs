//! Uploaded file storage and download authorization.
//!
//! Files are stored flat under one directory as `<uuid><ext>`. The database
//! row keeps the original name, which is restored on download.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Content type for an extension-bearing file name. Case-insensitive.
pub fn mime_type(filename: &str) -> &'static str {
    match extension(filename).to_ascii_lowercase().as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".bmp" => "image/bmp",
        ".webp" => "image/webp",
        ".svg" => "image/svg+xml",
        ".psd" => "image/vnd.adobe.photoshop",
        ".ai" => "application/postscript",
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".txt" => "text/plain",
        ".zip" => "application/zip",
        ".rar" => "application/x-rar-compressed",
        _ => "application/octet-stream",
    }
}

/// Extension including the leading dot, or `""`.
pub fn extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(i) if i > 0 && !filename[i..].contains(['/', '\\']) => &filename[i..],
        _ => "",
    }
}

/// A file written by [`FileStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub stored_filename: String,
    pub path: PathBuf,
}

/// The upload directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a fresh name carrying `original`'s extension.
    pub fn save(&self, original: &str, bytes: &[u8]) -> AppResult<SavedFile> {
        std::fs::create_dir_all(&self.root)?;
        let stored_filename = format!("{}{}", Uuid::new_v4(), extension(original));
        let path = self.root.join(&stored_filename);
        std::fs::write(&path, bytes)?;
        log::debug!("Stored {} ({} bytes)", stored_filename, bytes.len());
        Ok(SavedFile {
            stored_filename,
            path,
        })
    }

    /// Best-effort removal, used to undo writes of a failed upload.
    pub fn discard(&self, saved: &[SavedFile]) {
        for file in saved {
            if let Err(e) = std::fs::remove_file(&file.path) {
                log::warn!("Failed to remove {}: {}", file.path.display(), e);
            }
        }
    }

    /// Resolve a stored name to its path. Names that could escape the
    /// directory resolve to nothing.
    pub fn path_of(&self, stored_filename: &str) -> Option<PathBuf> {
        if stored_filename.is_empty()
            || stored_filename.contains(['/', '\\'])
            || stored_filename.starts_with('.')
        {
            return None;
        }
        Some(self.root.join(stored_filename))
    }

    /// Read a stored file. A missing file is a 404.
    pub async fn read(&self, stored_filename: &str) -> AppResult<Vec<u8>> {
        let path = self
            .path_of(stored_filename)
            .ok_or_else(|| AppError::not_found("File not found"))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "file record exists but file is missing");
                Err(AppError::not_found("File not found on disk"))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Download authorization
// ---------------------------------------------------------------------------

/// What the download handler needs to serve a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub stored_filename: String,
    pub original_filename: String,
    pub mime_type: String,
}

/// Check that `user_id` may download `stored_filename`.
///
/// Any signed-in user may fetch a deliverable; source files (`src`) are
/// restricted to the project owner.
pub fn authorize_download(
    conn: &Connection,
    user_id: i64,
    stored_filename: &str,
) -> AppResult<Download> {
    let (original_filename, mime_type, src, author_id): (String, String, bool, i64) = conn
        .query_row(
            "SELECT f.original_filename, f.mime_type, f.src, p.author_id
             FROM files f
             JOIN revisions r ON r.id = f.revision_id
             JOIN projects p ON p.id = r.project_id
             WHERE f.stored_filename = ?1",
            [stored_filename],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?
        .ok_or_else(|| AppError::not_found("File not found"))?;

    if src && author_id != user_id {
        return Err(AppError::forbidden(
            "Only the project owner may download source files",
        ));
    }

    Ok(Download {
        stored_filename: stored_filename.to_string(),
        original_filename,
        mime_type,
    })
}

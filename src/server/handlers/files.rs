//! File download.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::files::authorize_download;
use crate::server::extract::CurrentUser;
use crate::server::routes::AppState;

/// GET /api/files/:filename
pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let target = state
        .db
        .call(move |conn| authorize_download(conn, user, &filename))
        .await?;
    let bytes = state.files.read(&target.stored_filename).await?;

    let content_type = HeaderValue::from_str(&target.mime_type)
        .map_err(|e| AppError::Internal(format!("bad stored mime type: {}", e)))?;
    let disposition = HeaderValue::from_str(&content_disposition(&target.original_filename))
        .map_err(|e| AppError::Internal(format!("bad content disposition: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(bytes.len())),
        ],
        bytes,
    )
        .into_response())
}

/// `attachment; filename="..."`, plus an RFC 5987 `filename*` when the
/// name is not plain ASCII.
fn content_disposition(original: &str) -> String {
    let fallback: String = original
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if original.is_ascii() && fallback == original {
        return format!("attachment; filename=\"{}\"", fallback);
    }
    let encoded: String = original
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

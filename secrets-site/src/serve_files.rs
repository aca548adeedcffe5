//! The members-only download. `ServeFile` handles content type, conditional
//! requests and byte ranges; this module adds the inline disposition.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::CONTENT_DISPOSITION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FileServeError {
    #[error("invalid path")]
    InvalidPath,
    #[error("file not found")]
    NotFound,
    #[error("invalid header value")]
    HeaderValue(#[from] axum::http::header::InvalidHeaderValue),
}

/// Reject absolute paths and `..` so a configured path cannot leave its root.
pub fn sanitize_relative_path(requested_path: &str) -> Result<PathBuf, FileServeError> {
    let requested = Path::new(requested_path.trim_start_matches('/'));
    let mut sanitized = PathBuf::new();

    for component in requested.components() {
        match component {
            Component::Normal(part) => sanitized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FileServeError::InvalidPath);
            }
        }
    }

    if sanitized.as_os_str().is_empty() {
        return Err(FileServeError::InvalidPath);
    }

    Ok(sanitized)
}

/// Answer `request` with the file at `path`, marked for display in the browser
/// rather than as an attachment.
pub async fn serve_inline(path: &Path, request: Request) -> Result<Response, FileServeError> {
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        warn!(path = %path.display(), "download file not found or inaccessible");
        return Err(FileServeError::NotFound);
    }

    let mut response = response.map(Body::new);
    response
        .headers_mut()
        .insert(CONTENT_DISPOSITION, inline_disposition(path)?);

    debug!(path = %path.display(), status = %response.status(), "serving download");
    Ok(response)
}

fn inline_disposition(path: &Path) -> Result<HeaderValue, FileServeError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().replace(['"', '\\'], "_"))
        .filter(|name| name.is_ascii())
        .unwrap_or_default();
    if filename.is_empty() {
        return Ok(HeaderValue::from_static("inline"));
    }
    Ok(HeaderValue::from_str(&format!(
        "inline; filename=\"{filename}\""
    ))?)
}

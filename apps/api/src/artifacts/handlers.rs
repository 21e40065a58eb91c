use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::artifacts::validate_filename;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/sessions/:id/artifacts/:filename
///
/// Downloads the newest version of an artifact.
pub async fn handle_download_artifact(
    State(state): State<AppState>,
    Path((session_id, filename)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    if !validate_filename(&filename) {
        return Err(AppError::Validation(format!(
            "'{filename}' is not a valid artifact name"
        )));
    }

    let artifact = state
        .artifacts
        .latest(session_id, &filename)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Artifact {filename} not found for session {session_id}"))
        })?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.filename);
    let version = artifact.version.to_string();
    let last_modified = artifact
        .created_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::ETAG, format!("\"v{version}\"")),
            (header::LAST_MODIFIED, last_modified),
        ],
        artifact.data,
    )
        .into_response())
}

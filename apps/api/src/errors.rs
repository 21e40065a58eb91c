use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::latex::TemplateError;
use crate::session::store::SessionStoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Session store error: {0}")]
    SessionStore(#[from] SessionStoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Template(TemplateError::NotFound { path }) => {
                tracing::error!("LaTeX template missing at {}", path.display());
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_NOT_FOUND",
                    "The LaTeX template is not installed on this server".to_string(),
                )
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_ERROR",
                    "The LaTeX template could not be read".to_string(),
                )
            }
            AppError::Artifact(ArtifactError::NotConfigured) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ARTIFACTS_NOT_CONFIGURED",
                "Artifact storage is not configured on this server".to_string(),
            ),
            AppError::Artifact(e) => {
                tracing::error!("Artifact error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ARTIFACT_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::SessionStore(e) => {
                tracing::error!("Session store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_STORE_ERROR",
                    "A session storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_409() {
        let response = AppError::Conflict("session is not awaiting input".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_oversized_upload_maps_to_413() {
        let response = AppError::PayloadTooLarge("resume.pdf is larger than 5 MB".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_unconfigured_artifacts_map_to_503() {
        let response = AppError::Artifact(ArtifactError::NotConfigured).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_missing_template_is_distinct_from_io_failure() {
        let not_found = AppError::Template(TemplateError::NotFound {
            path: "templates/resume.tex".into(),
        });
        assert!(not_found.to_string().contains("not found"));
        assert_eq!(
            not_found.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

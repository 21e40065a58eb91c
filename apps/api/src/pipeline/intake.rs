//! Intake: turns uploaded résumé / job description files into plain text.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Uploads larger than this are rejected before parsing.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Request body limit for the multipart upload route: two files at the cap
/// plus the text fields and multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = 2 * MAX_UPLOAD_BYTES + 64 * 1024;

/// PDF detection uses the content type, the file extension or the magic bytes.
pub fn is_pdf(filename: Option<&str>, content_type: Option<&str>, data: &[u8]) -> bool {
    content_type == Some("application/pdf")
        || filename.is_some_and(|f| f.to_ascii_lowercase().ends_with(".pdf"))
        || data.starts_with(PDF_MAGIC)
}

/// Extracts text from a PDF or UTF-8 text upload. CPU-bound; see [`extract_text_blocking`].
pub fn extract_text(
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &Bytes,
) -> Result<String, AppError> {
    let label = filename.unwrap_or("upload");
    if data.is_empty() {
        return Err(AppError::Validation(format!("{label} is empty")));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "{label} is larger than {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let text = if is_pdf(filename, content_type, data) {
        debug!(file = label, bytes = data.len(), "extracting text from PDF");
        pdf_extract::extract_text_from_mem(data)
            .map_err(|e| AppError::Validation(format!("Could not read PDF {label}: {e}")))?
    } else {
        String::from_utf8(data.to_vec()).map_err(|_| {
            AppError::Validation(format!("{label} is neither a PDF nor UTF-8 text"))
        })?
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(format!(
            "No text could be extracted from {label}"
        )));
    }
    Ok(text)
}

/// Runs [`extract_text`] on the blocking pool. A panic inside the PDF parser
/// surfaces as a validation error for that file.
pub async fn extract_text_blocking(
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
) -> Result<String, AppError> {
    let label = filename.clone().unwrap_or_else(|| "upload".to_string());
    tokio::task::spawn_blocking(move || {
        extract_text(filename.as_deref(), content_type.as_deref(), &data)
    })
    .await
    .map_err(|e| {
        warn!(file = %label, "text extraction aborted: {e}");
        AppError::Validation(format!("{label} could not be read"))
    })?
}

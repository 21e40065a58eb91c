//! Artifacts: named, versioned byte blobs produced by a run (the generated `.tex`).
//!
//! Every `put` for the same (session, filename) gets the next version number,
//! starting at 1. Nothing is overwritten.
//!
//! `AppState` carries an `ArtifactWriter`, which wraps an optional backend so a
//! server without artifact storage reports `NotConfigured` instead of failing
//! somewhere deeper.

pub mod handlers;
pub mod memory;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use memory::InMemoryArtifactStore;
pub use s3::S3ArtifactStore;

pub const LATEX_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact storage is not configured")]
    NotConfigured,

    #[error("Unexpected artifact storage failure: {0}")]
    Unexpected(String),
}

/// One stored version of an artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub version: u32,
    pub content_type: String,
    pub data: Bytes,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists a new version and returns its number.
    async fn put(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<u32, ArtifactError>;

    /// Highest version for (session, filename), if any.
    async fn latest(
        &self,
        session_id: Uuid,
        filename: &str,
    ) -> Result<Option<Artifact>, ArtifactError>;
}

#[derive(Clone, Default)]
pub struct ArtifactWriter {
    store: Option<Arc<dyn ArtifactStore>>,
}

impl ArtifactWriter {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub async fn save(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<u32, ArtifactError> {
        let store = self.store.as_ref().ok_or(ArtifactError::NotConfigured)?;
        let size = data.len();
        let version = store.put(session_id, filename, content_type, data).await?;
        info!(%session_id, filename, version, size, "artifact saved");
        Ok(version)
    }

    pub async fn latest(
        &self,
        session_id: Uuid,
        filename: &str,
    ) -> Result<Option<Artifact>, ArtifactError> {
        let store = self.store.as_ref().ok_or(ArtifactError::NotConfigured)?;
        store.latest(session_id, filename).await
    }
}

/// Rejects names that could escape a key prefix or break a download header.
pub fn validate_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename.len() <= 128
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Artifact, ArtifactError, ArtifactStore};

/// Keeps every version in memory. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    versions: Mutex<HashMap<(Uuid, String), Vec<Artifact>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<u32, ArtifactError> {
        let mut versions = self.versions.lock().await;
        let history = versions
            .entry((session_id, filename.to_string()))
            .or_default();
        let version = u32::try_from(history.len() + 1)
            .map_err(|_| ArtifactError::Unexpected(format!("too many versions of {filename}")))?;
        history.push(Artifact {
            filename: filename.to_string(),
            version,
            content_type: content_type.to_string(),
            data,
            created_at: Utc::now(),
        });
        Ok(version)
    }

    async fn latest(
        &self,
        session_id: Uuid,
        filename: &str,
    ) -> Result<Option<Artifact>, ArtifactError> {
        let versions = self.versions.lock().await;
        Ok(versions
            .get(&(session_id, filename.to_string()))
            .and_then(|history| history.last().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_increase_per_filename() {
        let store = InMemoryArtifactStore::new();
        let session = Uuid::new_v4();

        let a1 = store.put(session, "a.tex", "text/plain", Bytes::from_static(b"1")).await.unwrap();
        let b1 = store.put(session, "b.tex", "text/plain", Bytes::from_static(b"1")).await.unwrap();
        let a2 = store.put(session, "a.tex", "text/plain", Bytes::from_static(b"2")).await.unwrap();

        assert_eq!((a1, b1, a2), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_sessions_have_separate_version_sequences() {
        let store = InMemoryArtifactStore::new();
        let first = store
            .put(Uuid::new_v4(), "a.tex", "text/plain", Bytes::from_static(b"x"))
            .await
            .unwrap();
        let second = store
            .put(Uuid::new_v4(), "a.tex", "text/plain", Bytes::from_static(b"y"))
            .await
            .unwrap();
        assert_eq!((first, second), (1, 1));
    }

    #[tokio::test]
    async fn test_latest_returns_newest_bytes() {
        let store = InMemoryArtifactStore::new();
        let session = Uuid::new_v4();
        assert!(store.latest(session, "a.tex").await.unwrap().is_none());

        store.put(session, "a.tex", "text/plain", Bytes::from_static(b"old")).await.unwrap();
        store.put(session, "a.tex", "text/plain", Bytes::from_static(b"new")).await.unwrap();

        let latest = store.latest(session, "a.tex").await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.data, Bytes::from_static(b"new"));
    }
}

//! Session stores: keep a run alive between "awaiting input" and the reply.
//!
//! `AppState` holds an `Arc<dyn SessionStore>`, chosen at startup from `SESSION_BACKEND`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::session::models::Session;

/// Upper bound on how long one request may hold a session claim in Redis.
/// Covers a full resume run including LLM retries.
pub const CLAIM_TTL_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt session record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionStoreError>;

    /// Inserts or replaces the session record.
    async fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Takes the exclusive right to advance session `id`.
    /// Returns `false` when another request already holds it.
    async fn try_claim(&self, id: Uuid) -> Result<bool, SessionStoreError>;

    async fn release(&self, id: Uuid) -> Result<(), SessionStoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store. Records expire `ttl` after their last write and are
/// swept on every save; everything is lost when the process exits.
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, (Instant, Session)>>,
    claims: Mutex<HashSet<Uuid>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
            claims: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionStoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .filter(|(written, _)| written.elapsed() < self.ttl)
            .map(|(_, session)| session.clone()))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (written, _)| written.elapsed() < self.ttl);
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "expired sessions evicted");
        }
        sessions.insert(session.id, (Instant::now(), session.clone()));
        Ok(())
    }

    async fn try_claim(&self, id: Uuid) -> Result<bool, SessionStoreError> {
        Ok(self.claims.lock().await.insert(id))
    }

    async fn release(&self, id: Uuid) -> Result<(), SessionStoreError> {
        self.claims.lock().await.remove(&id);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

/// JSON records under `session:<id>`, expiring `ttl_secs` after the last write.
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

fn session_key(id: Uuid) -> String {
    format!("session:{id}")
}

fn claim_key(id: Uuid) -> String {
    format!("session:{id}:claim")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(id))
            .query_async(&mut conn)
            .await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(SessionStoreError::from)
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(session)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(session_key(session.id))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(session_id = %session.id, ttl = self.ttl_secs, "session saved to redis");
        Ok(())
    }

    async fn try_claim(&self, id: Uuid) -> Result<bool, SessionStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SET NX answers nil when the key already exists.
        let acquired: Option<String> = redis::cmd("SET")
            .arg(claim_key(id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(CLAIM_TTL_SECS)
            .query_async(&mut conn)
            .await?;
        Ok(acquired.is_some())
    }

    async fn release(&self, id: Uuid) -> Result<(), SessionStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("DEL")
            .arg(claim_key(id))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::SessionPhase;
    use crate::session::state::{keys, SessionState};

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test]
    async fn test_memory_store_returns_none_for_unknown_id() {
        let store = InMemorySessionStore::new(DAY);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_save_replaces_record() {
        let store = InMemorySessionStore::new(DAY);
        let mut session = Session::new(SessionState::new());
        store.save(&session).await.unwrap();

        session.phase = SessionPhase::Completed;
        store.save(&session).await.unwrap();

        let loaded = store.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.phase, SessionPhase::Completed);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_state() {
        let store = InMemorySessionStore::new(DAY);
        let mut a = Session::new(SessionState::new());
        let b = Session::new(SessionState::new());
        a.state.set(keys::USER_INPUT, "only for a");
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let loaded_b = store.get(b.id).await.unwrap().unwrap();
        assert!(loaded_b.state.get(keys::USER_INPUT).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expires_records_after_ttl() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let stale = Session::new(SessionState::new());
        store.save(&stale).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get(stale.id).await.unwrap().is_none());

        let fresh = Session::new(SessionState::new());
        store.save(&fresh).await.unwrap();
        assert_eq!(store.sessions.read().await.len(), 1);
        assert!(store.get(fresh.id).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_save_refreshes_expiry() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new(SessionState::new());
        store.save(&session).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        store.save(&session).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;

        assert!(store.get(session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_released() {
        let store = InMemorySessionStore::new(DAY);
        let id = Uuid::new_v4();

        assert!(store.try_claim(id).await.unwrap());
        assert!(!store.try_claim(id).await.unwrap());
        assert!(store.try_claim(Uuid::new_v4()).await.unwrap());

        store.release(id).await.unwrap();
        assert!(store.try_claim(id).await.unwrap());
    }

    #[test]
    fn test_session_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            session_key(id),
            "session:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            claim_key(id),
            "session:00000000-0000-0000-0000-000000000000:claim"
        );
    }
}

//! Session storage backends
//!
//! Provides both in-memory and Redis-backed session storage.
//!
//! - `MemoryStore` is for development/testing only - data is lost on restart
//! - `RedisStore` should be used in production
//! - Session data contains conversation history and phone numbers - handle
//!   with care

use super::Session;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Session store trait for abstracting storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a session by user id
    async fn get(&self, user_id: &str) -> Result<Option<Session>>;

    /// Save a complete session snapshot
    async fn save(&self, session: &Session) -> Result<()>;

    /// Delete a session; returns whether a record existed
    async fn delete(&self, user_id: &str) -> Result<bool>;

    /// Check if a session exists
    async fn exists(&self, user_id: &str) -> Result<bool>;

    /// List all session keys (use with caution in production)
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Get session count
    async fn count(&self) -> Result<usize>;

    /// Cleanup expired sessions; returns how many were removed
    async fn cleanup_expired(&self) -> Result<usize>;
}

/// In-memory session store (for development/testing)
///
/// Data is lost on restart; there is no persistence or replication. Use
/// [`super::RedisStore`] for production deployments.
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Session TTL in hours
    ttl_hours: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new memory store
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_hours: 24 * 30,
        }
    }

    /// Create with custom TTL
    #[must_use]
    pub fn with_ttl_hours(ttl_hours: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_hours,
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(user_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(user_id).is_some())
    }

    async fn exists(&self, user_id: &str) -> Result<bool> {
        let sessions = self.sessions.read().await;
        Ok(sessions.contains_key(user_id))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        let sessions = self.sessions.read().await;
        Ok(sessions.len())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::hours(self.ttl_hours as i64);
        let mut sessions = self.sessions.write().await;

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| session.last_active <= cutoff)
            .map(|(key, _)| key.clone())
            .collect();

        let removed = expired.len();
        for key in expired {
            sessions.remove(&key);
            debug!(user = %key, "Expired session removed");
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryStore::new();

        assert_eq!(store.count().await.unwrap(), 0);

        let session = Session::new("u1", "web");
        store.save(&session).await.unwrap();

        assert!(store.exists("u1").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);

        let loaded = store.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded.last_channel, "web");

        assert!(store.delete("u1").await.unwrap());
        assert!(!store.exists("u1").await.unwrap());
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(!store.delete("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_keys() {
        let store = MemoryStore::new();
        store.save(&Session::new("a", "web")).await.unwrap();
        store.save(&Session::new("b", "whatsapp")).await.unwrap();

        let mut keys = store.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::with_ttl_hours(1);

        let mut stale = Session::new("stale", "web");
        stale.last_active = Utc::now() - chrono::Duration::hours(2);
        store.save(&stale).await.unwrap();
        store.save(&Session::new("fresh", "web")).await.unwrap();

        let removed = store.cleanup_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("stale").await.unwrap().is_none());
        assert!(store.get("fresh").await.unwrap().is_some());
    }
}

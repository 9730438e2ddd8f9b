use super::{Session, SessionStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Redis-backed session store (for production)
///
/// - Sliding TTL-based expiration: every save refreshes the TTL
/// - Session keys are prefixed to isolate from other Redis data
/// - Consider enabling Redis AUTH and TLS in production
pub struct RedisStore {
    client: redis::Client,
    /// Key prefix for session keys
    prefix: String,
    /// TTL in seconds
    ttl_seconds: u64,
}

/// 30 days, refreshed on every write
const DEFAULT_TTL_SECONDS: u64 = 60 * 60 * 24 * 30;

impl RedisStore {
    /// Create a new Redis store
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| Error::Store(e.to_string()))?;

        Ok(Self {
            client,
            prefix: "session:".to_string(),
            ttl_seconds: DEFAULT_TTL_SECONDS,
        })
    }

    /// Create with custom prefix and TTL
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid
    pub fn with_options(redis_url: &str, prefix: &str, ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| Error::Store(e.to_string()))?;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
            ttl_seconds,
        })
    }

    /// Build the full Redis key
    fn build_key(&self, user_id: &str) -> String {
        format!("{}{}", self.prefix, user_id)
    }

    /// Get an async connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Store(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, user_id: &str) -> Result<Option<Session>> {
        let mut conn = self.get_connection().await?;
        let key = self.build_key(user_id);

        let data: Option<String> = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis GET failed: {}", e)))?;

        match data {
            Some(json) => {
                let session: Session = serde_json::from_str(&json).map_err(|e| {
                    Error::Store(format!("Failed to deserialize session: {}", e))
                })?;
                debug!(user = %user_id, "Session loaded from Redis");
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let key = self.build_key(&session.user_id);

        let json = serde_json::to_string(session)
            .map_err(|e| Error::Store(format!("Failed to serialize session: {}", e)))?;

        redis::cmd("SETEX")
            .arg(&key)
            .arg(self.ttl_seconds)
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis SETEX failed: {}", e)))?;

        debug!(user = %session.user_id, ttl = %self.ttl_seconds, "Session saved to Redis");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let key = self.build_key(user_id);

        let deleted: i64 = redis::cmd("DEL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis DEL failed: {}", e)))?;

        debug!(user = %user_id, deleted = deleted > 0, "Session deleted from Redis");
        Ok(deleted > 0)
    }

    async fn exists(&self, user_id: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let key = self.build_key(user_id);

        let exists: i64 = redis::cmd("EXISTS")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis EXISTS failed: {}", e)))?;

        Ok(exists > 0)
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        let pattern = format!("{}*", self.prefix);

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis KEYS failed: {}", e)))?;

        // Strip prefix from keys
        let user_ids: Vec<String> = keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(|s| s.to_string()))
            .collect();

        warn!(
            count = user_ids.len(),
            "Listed all session keys from Redis (use with caution)"
        );
        Ok(user_ids)
    }

    async fn count(&self) -> Result<usize> {
        // Note: This is not efficient for large datasets
        // Consider using SCAN in production
        let keys = self.list_keys().await?;
        Ok(keys.len())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        // Redis TTL handles expiration automatically
        debug!("Redis TTL handles session expiration automatically");
        Ok(0)
    }
}

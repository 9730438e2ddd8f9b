//! Session Manager
//!
//! Sole authority for reading, creating and mutating [`Session`] records:
//! nothing else writes to the session store. All read-modify-write
//! operations for the same user are serialized through a per-user async
//! mutex, so two near-simultaneous messages from different channels cannot
//! overwrite each other's channel bookkeeping or history appends.
//!
//! Failure semantics: a store outage degrades every operation to
//! absence/no-op rather than an error. The conversation must continue even
//! when persistence is down; this is best-effort chat memory, not a
//! ledger.

use super::{CartItem, Session, SessionStore, StoredMessage};
use crate::event_log::{ConversationRecord, EventLog};
use atelier_llm::MessageRole;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mask a user identifier for logging (phone numbers are PII)
fn mask_user(user_id: &str) -> String {
    if user_id.len() <= 6 {
        return "***".to_string();
    }
    format!("{}...", &user_id[..6])
}

/// Session lifecycle manager with per-user write serialization.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    event_log: Option<Arc<dyn EventLog>>,
    // One lock per active user id; entries live for the process lifetime.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionManager {
    /// Create a new session manager over a store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            event_log: None,
            locks: DashMap::new(),
        }
    }

    /// Attach a best-effort event log for analytics/audit.
    #[must_use]
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read the current persisted snapshot. Store errors degrade to absence.
    pub async fn get(&self, user_id: &str) -> Option<Session> {
        match self.store.get(user_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(user = %mask_user(user_id), error = %e, "Session read failed, treating as absent");
                None
            }
        }
    }

    /// Get the session for a user, creating it on first contact.
    ///
    /// For an existing session this applies the channel-switch transition:
    /// the switch counter increments exactly once when the incoming channel
    /// differs from the stored `last_channel`.
    pub async fn get_or_create(&self, user_id: &str, channel: &str) -> Session {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.get_or_create_inner(user_id, channel).await
    }

    // Caller must hold the per-user lock.
    async fn get_or_create_inner(&self, user_id: &str, channel: &str) -> Session {
        match self.get(user_id).await {
            None => {
                let session = Session::new(user_id, channel);
                self.persist(&session).await;
                info!(user = %mask_user(user_id), channel = %channel, "New session created");
                session
            }
            Some(mut session) => {
                let from_channel = session.last_channel.clone();
                if session.record_channel(channel) {
                    info!(
                        user = %mask_user(user_id),
                        from_channel = %from_channel,
                        to_channel = %channel,
                        "Channel switch detected"
                    );
                }
                self.persist(&session).await;
                session
            }
        }
    }

    /// Append one conversation turn and persist the session.
    ///
    /// Runs the `get_or_create` transition first (so channel bookkeeping is
    /// applied), bounds the history window, then records the same turn to
    /// the event log without blocking the caller.
    pub async fn append_message(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
        channel: &str,
    ) {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut session = self.get_or_create_inner(user_id, channel).await;
        session.push_message(role, content, channel);
        self.persist(&session).await;

        self.dispatch_log(ConversationRecord::new(user_id, role, content, channel));
    }

    /// The most recent `limit` turns, oldest to newest. Empty when the
    /// session is absent or the store is unreachable.
    pub async fn history(&self, user_id: &str, limit: usize) -> Vec<StoredMessage> {
        match self.get(user_id).await {
            Some(session) => session.recent(limit).to_vec(),
            None => Vec::new(),
        }
    }

    /// Overwrite the stored style profile wholesale (no merging).
    ///
    /// Silently does nothing when the session does not exist yet; callers
    /// are expected to have triggered creation via a preceding message.
    pub async fn update_style_profile(&self, user_id: &str, profile: crate::StyleProfile) {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        match self.get(user_id).await {
            Some(mut session) => {
                session.style_profile = Some(profile);
                session.last_active = Utc::now();
                self.persist(&session).await;
                info!(user = %mask_user(user_id), "Style profile updated");
            }
            None => {
                debug!(user = %mask_user(user_id), "Style profile update for absent session ignored");
            }
        }
    }

    /// Add an item to the cart (storage only).
    pub async fn add_to_cart(&self, user_id: &str, item: CartItem) {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(mut session) = self.get(user_id).await {
            session.cart.push(item);
            session.last_active = Utc::now();
            self.persist(&session).await;
        }
    }

    /// Current cart contents; empty when the session is absent.
    pub async fn cart(&self, user_id: &str) -> Vec<CartItem> {
        self.get(user_id).await.map(|s| s.cart).unwrap_or_default()
    }

    /// Empty the cart.
    pub async fn clear_cart(&self, user_id: &str) {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(mut session) = self.get(user_id).await {
            session.cart.clear();
            self.persist(&session).await;
        }
    }

    /// Delete the session record outright. Idempotent: clearing an absent
    /// session is not an error.
    pub async fn clear(&self, user_id: &str) {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        match self.store.delete(user_id).await {
            Ok(existed) => {
                info!(user = %mask_user(user_id), existed = existed, "Session cleared");
            }
            Err(e) => {
                warn!(user = %mask_user(user_id), error = %e, "Session clear failed");
            }
        }
    }

    /// Snapshot every stored session (analytics read path).
    pub async fn scan(&self) -> Vec<Session> {
        let keys = match self.store.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Session scan failed");
                return Vec::new();
            }
        };

        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(session) = self.get(&key).await {
                sessions.push(session);
            }
        }
        sessions
    }

    async fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session).await {
            warn!(user = %mask_user(&session.user_id), error = %e, "Session save failed, continuing without persistence");
        }
    }

    // Fire-and-forget: event log latency and failures never touch the
    // primary path.
    fn dispatch_log(&self, record: ConversationRecord) {
        if let Some(log) = &self.event_log {
            let log = log.clone();
            tokio::spawn(async move {
                if let Err(e) = log.insert(&record).await {
                    warn!(error = %e, "Failed to record message to event log");
                }
            });
        }
    }
}

//! Cross-channel session state
//!
//! One [`Session`] exists per user identity and is the unit of continuity
//! across channels: it carries the conversation history, channel
//! bookkeeping, the analyzed style profile and the cart. A session that
//! does not exist is represented as absence at the store boundary and is
//! never a record with missing required fields.

mod manager;
mod redis_store;
mod store;

pub use manager::SessionManager;
pub use redis_store::RedisStore;
pub use store::{MemoryStore, SessionStore};

use atelier_llm::MessageRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::StyleProfile;

/// Maximum number of messages retained per session; older entries are
/// silently dropped from the head (ring semantics).
pub const MAX_HISTORY: usize = 50;

/// A single conversation turn, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Who spoke
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Channel the turn arrived/left on
    pub channel: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

/// An item in the customer's cart (storage only, no business rules)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Product display name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// When the item was added
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Create a cart item stamped with the current time
    #[must_use]
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            added_at: Utc::now(),
        }
    }
}

/// Durable per-user record of cross-channel state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable user identity (phone number or opaque id)
    pub user_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp, refreshed on every inbound message
    pub last_active: DateTime<Utc>,
    /// Channel of the most recently processed message
    pub last_channel: String,
    /// Channels ever seen for this user, insertion order preserved for display
    pub channels_used: Vec<String>,
    /// Count of inbound messages whose channel differed from `last_channel`
    pub channel_switches: u32,
    /// Bounded conversation history, oldest first
    pub conversation_history: Vec<StoredMessage>,
    /// Cart contents
    pub cart: Vec<CartItem>,
    /// Analyzed style profile; absent until the first image analysis
    pub style_profile: Option<StyleProfile>,
    /// Display name, if known
    pub name: Option<String>,
    /// Phone number, if the user identity is one
    pub phone: Option<String>,
}

impl Session {
    /// Create a fresh session for a first-contact user.
    #[must_use]
    pub fn new(user_id: impl Into<String>, channel: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let channel = channel.into();
        let now = Utc::now();
        let phone = user_id.starts_with('+').then(|| user_id.clone());

        Self {
            user_id,
            created_at: now,
            last_active: now,
            last_channel: channel.clone(),
            channels_used: vec![channel],
            channel_switches: 0,
            conversation_history: Vec::new(),
            cart: Vec::new(),
            style_profile: None,
            name: None,
            phone,
        }
    }

    /// Apply channel bookkeeping for an inbound message.
    ///
    /// Increments `channel_switches` exactly once when the incoming channel
    /// differs from the stored `last_channel`, records the channel in
    /// `channels_used`, and unconditionally refreshes `last_channel` and
    /// `last_active`. Returns whether a switch was counted.
    pub fn record_channel(&mut self, channel: &str) -> bool {
        let switched = self.last_channel != channel;
        if switched {
            self.channel_switches += 1;
            if !self.channels_used.iter().any(|c| c == channel) {
                self.channels_used.push(channel.to_string());
            }
        }
        self.last_channel = channel.to_string();
        self.last_active = Utc::now();
        switched
    }

    /// Append a turn and drop the oldest entries beyond [`MAX_HISTORY`].
    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>, channel: &str) {
        self.conversation_history.push(StoredMessage {
            role,
            content: content.into(),
            channel: channel.to_string(),
            timestamp: Utc::now(),
        });

        if self.conversation_history.len() > MAX_HISTORY {
            let excess = self.conversation_history.len() - MAX_HISTORY;
            self.conversation_history.drain(0..excess);
        }
    }

    /// The most recent `limit` turns, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> &[StoredMessage] {
        let len = self.conversation_history.len();
        &self.conversation_history[len.saturating_sub(limit)..]
    }
}

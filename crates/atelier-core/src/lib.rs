//! Atelier Core - Cross-channel session engine and conversation orchestration
//!
//! This crate owns the stateful heart of the assistant:
//! - [`session`]: the per-user [`Session`] entity, its storage backends and
//!   the [`SessionManager`] (sole writer, per-user serialization)
//! - [`context`]: pure projection of a session into the prompt context block
//! - [`orchestrator`]: sequences one inbound-message turn end-to-end
//! - [`profile`]: style attributes derived from customer photos
//! - [`event_log`]: best-effort append-only conversation log for analytics

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod event_log;
pub mod orchestrator;
pub mod profile;
pub mod session;

pub use error::{Error, Result};
pub use event_log::{ConversationRecord, EventLog, LogStats, MemoryEventLog, SqliteEventLog};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorInput, APOLOGY};
pub use profile::{PaletteExtractor, ProfileExtractor, StyleProfile, Undertone};
pub use session::{
    CartItem, MemoryStore, RedisStore, Session, SessionManager, SessionStore, StoredMessage,
    MAX_HISTORY,
};

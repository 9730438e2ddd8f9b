//! Error types for atelier-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Session store error (Redis, serialization)
    #[error("store error: {0}")]
    Store(String),

    /// Event log error (SQLite)
    #[error("event log error: {0}")]
    EventLog(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

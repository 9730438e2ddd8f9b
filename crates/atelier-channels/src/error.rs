//! Error types for atelier-channels

use thiserror::Error;

/// Channel error type
#[derive(Debug, Error)]
pub enum Error {
    /// Transport not configured
    #[error("channel not configured: {0}")]
    NotConfigured(String),

    /// Messaging gateway API error
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Message parsing error
    #[error("message parsing error: {0}")]
    Parse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

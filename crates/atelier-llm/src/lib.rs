//! Atelier LLM - Completion provider abstraction
//!
//! This crate defines the message and completion types exchanged with text
//! generation backends, the [`CompletionProvider`] trait, and the providers
//! shipped with Atelier:
//! - Groq (OpenAI-compatible API, free tier)
//! - a mock provider for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod groq;
pub mod message;
pub mod mock;
pub mod provider;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use groq::{GroqConfig, GroqProvider};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::CompletionProvider;

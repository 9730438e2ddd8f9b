//! Mock completion provider for testing
//!
//! Returns queued responses (or failures) in FIFO order and records every
//! request it receives so tests can assert on prompt construction.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};
use crate::provider::CompletionProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Scripted {
    Reply(String),
    Failure,
}

/// A mock completion provider with scripted responses.
#[derive(Clone)]
pub struct MockProvider {
    scripted: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful response.
    pub fn queue_response(&self, text: impl Into<String>) {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Reply(text.into()));
    }

    /// Queue a failure (generic "unavailable" condition).
    pub fn queue_failure(&self) {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Failure);
    }

    /// Requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(Scripted::Reply(content)) => Ok(CompletionResponse {
                content,
                usage: None,
                finish_reason: Some("stop".to_string()),
                model: "mock-model".to_string(),
            }),
            Some(Scripted::Failure) => Err(Error::Api("mock provider unavailable".to_string())),
            // Default behavior if queue empty
            None => Ok(CompletionResponse {
                content: "mock response".to_string(),
                usage: None,
                finish_reason: Some("stop".to_string()),
                model: "mock-model".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockProvider::new();
        mock.queue_response("first");
        mock.queue_response("second");

        let req = CompletionRequest::new("").with_message(Message::user("hi"));
        let r1 = mock.complete(req.clone()).await.unwrap();
        let r2 = mock.complete(req).await.unwrap();

        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }

    #[tokio::test]
    async fn test_queued_failure() {
        let mock = MockProvider::new();
        mock.queue_failure();

        let result = mock
            .complete(CompletionRequest::new("").with_message(Message::user("hi")))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_records_requests() {
        let mock = MockProvider::new();
        mock.complete(CompletionRequest::new("m").with_message(Message::user("hello")))
            .await
            .unwrap();

        let seen = mock.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].content, "hello");
    }
}

//! Conversation orchestrator
//!
//! Sequences one inbound-message turn end-to-end: session bookkeeping →
//! history read → context assembly → completion call → persist both sides
//! of the exchange. Both turns are written only after generation succeeds,
//! so a failed generation never leaves a user turn without its reply; the
//! caller gets the fixed apology text instead and the user resends.

use crate::context;
use crate::profile::StyleProfile;
use crate::session::SessionManager;
use atelier_llm::{CompletionProvider, CompletionRequest, Message, MessageRole};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Fixed, user-safe reply for completion failures and timeouts
pub const APOLOGY: &str = "I apologize, but I'm having a moment. Could you please try again?";

/// Empty or blank input is treated as a greeting rather than rejected
pub const DEFAULT_GREETING: &str = "Hi";

/// The assistant persona and guardrails sent with every completion
const SYSTEM_PROMPT: &str = "\
You are Atelier - an omnichannel retail styling assistant.

## YOUR ROLE & PERSONALITY
- You are a professional, trustworthy sales & styling assistant, not a street bargainer.
- Tone: warm, polite, upbeat, but always brand-safe and realistic.
- You care about helping the customer look great, respecting their budget,
  and protecting the retailer's brand, pricing and policies.

## WHAT YOU CAN DO
- Ask smart questions: occasion, budget, fit, color preference, climate, how formal.
- Recommend complete looks: top + bottom + footwear + 1 accessory.
- Talk about approximate price ranges:
  - Shirts: ₹1,000 - ₹4,000
  - Trousers/Jeans: ₹1,500 - ₹4,500
  - Blazers: ₹4,000 - ₹9,000
  - Ethnic sets: ₹2,000 - ₹7,000
  - Shoes: ₹2,000 - ₹8,000
- Mention realistic offers like seasonal sales or flat 10-20%, NEVER extreme discounts.

## PRICING & DISCOUNTS - STRICT RULES
1. Never offer more than 30% total discount under any circumstance.
2. If the user keeps asking for discounts, after at most 2 rounds say clearly
   that the best available offers are already applied and redirect to options
   within their budget.
3. Never agree to unrealistic requests (e.g. ₹8k for items worth ₹40k);
   suggest similar options within the stated budget instead.
4. Free gifts stay small: an accessory, socks, a pocket square - never
   expensive items or full outfits.

## BEHAVIOUR & SAFETY
- Stay polite if the user flirts or is silly; redirect to shopping.
- If the user guilt-trips, acknowledge once but hold the pricing policy.
- If the user is rude, respond calmly once, then gently disengage.
- Never use harsh system-sounding refusals; rephrase to soft, human language:
  \"I'm afraid I can't do that, but here's what I can help with...\"

## CONVERSATION STYLE
- Short, clear, visually structured; under ~150-180 words per response.
- Prefer bullet points for recommendations: Brand - Item - Key feature - Price.
- Always close with a helpful next-step question.";

/// Input for one conversation turn
#[derive(Debug, Clone)]
pub struct OrchestratorInput {
    /// User identity (phone number or opaque id)
    pub user_id: String,
    /// Channel the message arrived on
    pub channel: String,
    /// Message text
    pub text: String,
    /// Profile computed from an image attached to this message, not yet
    /// persisted
    pub fresh_profile: Option<StyleProfile>,
}

impl OrchestratorInput {
    /// Create a new input
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel: channel.into(),
            text: text.into(),
            fresh_profile: None,
        }
    }

    /// Attach a freshly-analyzed profile
    #[must_use]
    pub fn with_fresh_profile(mut self, profile: StyleProfile) -> Self {
        self.fresh_profile = Some(profile);
        self
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model to request (empty string selects the provider default)
    pub model: String,
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Turns of history sent with each completion
    pub history_limit: usize,
    /// Upper bound on the completion call; a timeout is treated like any
    /// other completion failure
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 300,
            temperature: 0.7,
            history_limit: 10,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    /// Create a default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the history window sent with each completion
    #[must_use]
    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// Set the completion timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Coordinates the session manager, context assembler and completion
/// provider for each inbound message.
pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    sessions: Arc<SessionManager>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        sessions: Arc<SessionManager>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            sessions,
            config,
        }
    }

    /// The session manager this orchestrator writes through
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Process one inbound message and return the assistant's reply.
    ///
    /// Only a completion failure changes the user-visible outcome (the
    /// fixed apology, with neither turn persisted); every other subsystem
    /// failure degrades silently inside the session manager.
    pub async fn process(&self, input: OrchestratorInput) -> String {
        let text = normalize_input(&input.text);

        // Channel bookkeeping must run before the history read so the
        // transition note sees the pre-switch state.
        let session = self
            .sessions
            .get_or_create(&input.user_id, &input.channel)
            .await;
        let history = self
            .sessions
            .history(&input.user_id, self.config.history_limit)
            .await;

        let context = context::assemble(&session, &input.channel, input.fresh_profile.as_ref());

        let mut messages = vec![Message::system(format!("{SYSTEM_PROMPT}{context}"))];
        messages.extend(history.iter().map(|m| Message {
            role: m.role,
            content: m.content.clone(),
        }));
        messages.push(Message::user(text.clone()));

        let request = CompletionRequest::new(self.config.model.clone())
            .with_messages(messages)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let reply = match tokio::time::timeout(
            self.config.request_timeout,
            self.provider.complete(request),
        )
        .await
        {
            Ok(Ok(response)) => response.content,
            Ok(Err(e)) => {
                error!(error = %e, channel = %input.channel, "Completion failed");
                return APOLOGY.to_string();
            }
            Err(_) => {
                error!(
                    timeout_secs = self.config.request_timeout.as_secs(),
                    channel = %input.channel,
                    "Completion timed out"
                );
                return APOLOGY.to_string();
            }
        };

        // Persist both sides of the exchange only after generation succeeded
        self.sessions
            .append_message(&input.user_id, MessageRole::User, &text, &input.channel)
            .await;
        self.sessions
            .append_message(&input.user_id, MessageRole::Assistant, &reply, &input.channel)
            .await;

        info!(
            channel = %input.channel,
            message_length = text.len(),
            response_length = reply.len(),
            "Message processed"
        );

        reply
    }
}

fn normalize_input(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        DEFAULT_GREETING.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;
    use atelier_llm::MockProvider;

    fn harness() -> (Arc<MockProvider>, Arc<SessionManager>, Orchestrator) {
        let provider = Arc::new(MockProvider::new());
        let sessions = Arc::new(SessionManager::new(Arc::new(MemoryStore::new())));
        let orchestrator = Orchestrator::new(
            provider.clone(),
            sessions.clone(),
            OrchestratorConfig::default(),
        );
        (provider, sessions, orchestrator)
    }

    #[tokio::test]
    async fn test_successful_turn_persists_both_sides() {
        let (provider, sessions, orchestrator) = harness();
        provider.queue_response("Welcome! What are you shopping for?");

        let reply = orchestrator
            .process(OrchestratorInput::new("u1", "web", "Hi"))
            .await;

        assert_eq!(reply, "Welcome! What are you shopping for?");

        let history = sessions.history("u1", 10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "Hi");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "Welcome! What are you shopping for?");
    }

    #[tokio::test]
    async fn test_failure_returns_apology_and_persists_nothing() {
        let (provider, sessions, orchestrator) = harness();
        provider.queue_failure();

        let reply = orchestrator
            .process(OrchestratorInput::new("u1", "web", "Hi"))
            .await;

        assert_eq!(reply, APOLOGY);
        assert!(sessions.history("u1", 10).await.is_empty());

        // The session itself was still created by the bookkeeping step
        let session = sessions.get("u1").await.unwrap();
        assert_eq!(session.channel_switches, 0);
    }

    #[tokio::test]
    async fn test_empty_input_becomes_greeting() {
        let (provider, _, orchestrator) = harness();
        provider.queue_response("Hello!");

        orchestrator
            .process(OrchestratorInput::new("u1", "whatsapp", "   "))
            .await;

        let seen = provider.requests();
        let user_turn = seen[0].messages.last().unwrap();
        assert_eq!(user_turn.content, DEFAULT_GREETING);
    }

    #[tokio::test]
    async fn test_system_prompt_carries_context() {
        let (provider, _, orchestrator) = harness();
        provider.queue_response("ok");
        provider.queue_response("ok");

        orchestrator
            .process(OrchestratorInput::new("u1", "web", "Hi"))
            .await;
        orchestrator
            .process(OrchestratorInput::new("u1", "whatsapp", "Hi again"))
            .await;

        let seen = provider.requests();
        let system = &seen[1].messages[0];
        assert_eq!(system.role, MessageRole::System);
        assert!(system.content.contains("## CUSTOMER CONTEXT"));
        assert!(system.content.contains("Channel Switches: 1"));
        assert!(system.content.contains("switched from web to whatsapp"));
    }

    #[tokio::test]
    async fn test_history_is_bounded_in_prompt() {
        let (provider, sessions, orchestrator) = harness();
        for i in 0..15 {
            sessions
                .append_message("u1", MessageRole::User, &format!("m{i}"), "web")
                .await;
        }
        provider.queue_response("ok");

        orchestrator
            .process(OrchestratorInput::new("u1", "web", "latest"))
            .await;

        let seen = provider.requests();
        // system + 10 history turns + current user turn
        assert_eq!(seen[0].messages.len(), 12);
    }

    #[tokio::test]
    async fn test_fresh_profile_reaches_prompt() {
        let (provider, _, orchestrator) = harness();
        provider.queue_response("ok");

        let fresh = crate::StyleProfile::degraded_default();
        orchestrator
            .process(OrchestratorInput::new("u1", "whatsapp", "analyzed my photo?").with_fresh_profile(fresh))
            .await;

        let seen = provider.requests();
        assert!(seen[0].messages[0].content.contains("## JUST ANALYZED IMAGE"));
    }

    #[tokio::test]
    async fn test_scenario_cross_channel_continuity() {
        let (provider, sessions, orchestrator) = harness();
        provider.queue_response("hello from web");
        provider.queue_response("hello from whatsapp");

        orchestrator
            .process(OrchestratorInput::new("u1", "web", "Hi"))
            .await;
        let session = sessions.get("u1").await.unwrap();
        assert_eq!(session.channel_switches, 0);

        orchestrator
            .process(OrchestratorInput::new("u1", "whatsapp", "Hi"))
            .await;
        let session = sessions.get("u1").await.unwrap();
        assert_eq!(session.channel_switches, 1);
        assert_eq!(session.channels_used, vec!["web", "whatsapp"]);
        assert_eq!(session.last_channel, "whatsapp");
    }
}

//! End-to-end conversation flows over the library crates: session manager,
//! orchestrator, context assembly and the event log wired together the same
//! way the server wires them.

use atelier_core::{
    EventLog, MemoryStore, Orchestrator, OrchestratorConfig, OrchestratorInput, PaletteExtractor,
    ProfileExtractor, SessionManager, SqliteEventLog, APOLOGY, MAX_HISTORY,
};
use atelier_llm::{MessageRole, MockProvider};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    provider: Arc<MockProvider>,
    sessions: Arc<SessionManager>,
    orchestrator: Orchestrator,
}

async fn harness_with_log(event_log: Option<Arc<dyn EventLog>>) -> Harness {
    let provider = Arc::new(MockProvider::new());
    let mut manager = SessionManager::new(Arc::new(MemoryStore::new()));
    if let Some(log) = &event_log {
        manager = manager.with_event_log(log.clone());
    }
    let sessions = Arc::new(manager);
    let orchestrator = Orchestrator::new(
        provider.clone(),
        sessions.clone(),
        OrchestratorConfig::default(),
    );
    Harness {
        provider,
        sessions,
        orchestrator,
    }
}

async fn harness() -> Harness {
    harness_with_log(None).await
}

#[tokio::test]
async fn cross_channel_conversation_keeps_one_session() {
    let h = harness().await;
    h.provider.queue_response("Hello! What are you shopping for?");
    h.provider.queue_response("Picking up right where we left off.");

    // First contact on web
    let reply = h
        .orchestrator
        .process(OrchestratorInput::new("+919876543210", "web", "Hi"))
        .await;
    assert_eq!(reply, "Hello! What are you shopping for?");

    let session = h.sessions.get("+919876543210").await.unwrap();
    assert_eq!(session.channel_switches, 0);
    assert_eq!(session.channels_used, vec!["web"]);

    // Same user moves to WhatsApp
    h.orchestrator
        .process(OrchestratorInput::new("+919876543210", "whatsapp", "Hi"))
        .await;

    let session = h.sessions.get("+919876543210").await.unwrap();
    assert_eq!(session.channel_switches, 1);
    assert_eq!(session.channels_used, vec!["web", "whatsapp"]);
    assert_eq!(session.last_channel, "whatsapp");

    // One conversation across both channels
    let history = h.sessions.history("+919876543210", 10).await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].channel, "web");
    assert_eq!(history[2].channel, "whatsapp");

    // The second prompt announced the transition to the model
    let requests = h.provider.requests();
    assert!(requests[1].messages[0]
        .content
        .contains("switched from web to whatsapp"));
}

#[tokio::test]
async fn failed_generation_leaves_no_trace() {
    let h = harness().await;
    h.provider.queue_response("First reply");
    h.provider.queue_failure();

    h.orchestrator
        .process(OrchestratorInput::new("u1", "web", "Hello"))
        .await;
    let reply = h
        .orchestrator
        .process(OrchestratorInput::new("u1", "web", "Are you there?"))
        .await;

    assert_eq!(reply, APOLOGY);

    // Only the successful exchange is in history - no orphaned user turn
    let history = h.sessions.history("u1", 10).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "First reply");
}

#[tokio::test]
async fn history_window_survives_a_long_conversation() {
    let h = harness().await;

    // 26 turns x 2 messages = 52 appended entries
    for i in 1..=26 {
        h.provider.queue_response(format!("reply {i}"));
        h.orchestrator
            .process(OrchestratorInput::new("u1", "web", format!("message {i}")))
            .await;
    }

    let history = h.sessions.history("u1", 100).await;
    assert_eq!(history.len(), MAX_HISTORY);
    // The first exchange fell off the head
    assert_eq!(history[0].content, "message 2");
    assert_eq!(history[49].content, "reply 26");
}

#[tokio::test]
async fn analyzed_profile_reaches_the_next_prompt() {
    let h = harness().await;
    h.provider.queue_response("noted");
    h.provider.queue_response("try coral and peach!");

    // Establish the session, then analyze a warm-toned photo
    h.orchestrator
        .process(OrchestratorInput::new("u1", "whatsapp", "Hi"))
        .await;

    let extractor = PaletteExtractor::new();
    let image: Vec<u8> = [220u8, 120, 40].repeat(300);
    let profile = extractor.analyze(&image).await;
    h.sessions.update_style_profile("u1", profile).await;

    h.orchestrator
        .process(OrchestratorInput::new("u1", "whatsapp", "what colors suit me?"))
        .await;

    let requests = h.provider.requests();
    let system = &requests[1].messages[0].content;
    assert!(system.contains("## STYLE PROFILE (Analyzed)"));
    assert!(system.contains("- Undertone: warm"));
}

#[tokio::test]
async fn event_log_records_the_conversation() {
    let log = Arc::new(SqliteEventLog::in_memory().await.unwrap());
    let h = harness_with_log(Some(log.clone())).await;
    h.provider.queue_response("hello!");

    h.orchestrator
        .process(OrchestratorInput::new("u1", "web", "Hi"))
        .await;

    // Log writes are fire-and-forget; poll briefly
    let mut records = Vec::new();
    for _ in 0..50 {
        records = log.recent(10).await.unwrap();
        if records.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(records.len(), 2);
    let roles: Vec<&str> = records.iter().map(|r| r.role.as_str()).collect();
    assert!(roles.contains(&"user"));
    assert!(roles.contains(&"assistant"));
}

#[tokio::test]
async fn concurrent_channels_lose_no_messages() {
    let h = harness().await;
    let sessions = h.sessions.clone();

    let mut handles = Vec::new();
    for i in 0..30 {
        let sessions = sessions.clone();
        let channel = if i % 2 == 0 { "web" } else { "whatsapp" };
        handles.push(tokio::spawn(async move {
            sessions
                .append_message("u1", MessageRole::User, &format!("m{i}"), channel)
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(h.sessions.history("u1", 100).await.len(), 30);
}

#[tokio::test]
async fn cleared_session_starts_fresh() {
    let h = harness().await;
    h.provider.queue_response("welcome back");

    h.sessions
        .append_message("u1", MessageRole::User, "remember me", "web")
        .await;
    h.sessions.clear("u1").await;
    assert!(h.sessions.get("u1").await.is_none());

    // Next message lazily recreates the session from scratch
    h.orchestrator
        .process(OrchestratorInput::new("u1", "whatsapp", "Hi"))
        .await;

    let session = h.sessions.get("u1").await.unwrap();
    assert_eq!(session.channel_switches, 0);
    assert_eq!(session.channels_used, vec!["whatsapp"]);
}

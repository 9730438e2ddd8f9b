//! Web/app chat endpoints
//!
//! The main conversational surface for web and mobile clients, plus the
//! session-inspection and administrative clear operations.

use super::{SharedOrchestrator, SharedSessions};
use atelier_core::{OrchestratorInput, Session, StoredMessage};
use axum::{
    extract::{Extension, Path, Query},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

fn default_channel() -> String {
    "web".to_string()
}

/// Chat request from web/app
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default = "default_channel")]
    pub channel: String,
}

/// Session summary attached to chat responses
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub channels_used: Vec<String>,
    pub channel_switches: u32,
    pub cart_count: usize,
    pub has_style_profile: bool,
}

impl SessionInfo {
    fn from_session(session: &Session) -> Self {
        Self {
            channels_used: session.channels_used.clone(),
            channel_switches: session.channel_switches,
            cart_count: session.cart.len(),
            has_style_profile: session.style_profile.is_some(),
        }
    }
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub user_id: String,
    pub channel: String,
    pub session_info: Option<SessionInfo>,
}

/// Get session info request
#[derive(Debug, Deserialize)]
pub struct SessionInfoRequest {
    pub user_id: String,
}

/// Session information
#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub user_id: String,
    pub channels_used: Vec<String>,
    pub channel_switches: u32,
    pub cart_items: usize,
    pub has_style_profile: bool,
    pub last_channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub messages: Vec<StoredMessage>,
    pub count: usize,
}

/// Send a message and get the assistant's reply.
///
/// This is the main chat endpoint for web/app channels and demonstrates
/// cross-channel session continuity.
async fn send_message(
    Extension(orchestrator): Extension<SharedOrchestrator>,
    Extension(sessions): Extension<SharedSessions>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let response = orchestrator
        .process(OrchestratorInput::new(
            &request.user_id,
            &request.channel,
            &request.message,
        ))
        .await;

    let session_info = sessions
        .get(&request.user_id)
        .await
        .map(|s| SessionInfo::from_session(&s));

    info!(channel = %request.channel, "Chat message processed");

    Json(ChatResponse {
        response,
        user_id: request.user_id,
        channel: request.channel,
        session_info,
    })
}

/// Get session information for a user.
async fn session_info(
    Extension(sessions): Extension<SharedSessions>,
    Json(request): Json<SessionInfoRequest>,
) -> Json<SessionInfoResponse> {
    let response = match sessions.get(&request.user_id).await {
        Some(session) => SessionInfoResponse {
            user_id: request.user_id,
            channels_used: session.channels_used,
            channel_switches: session.channel_switches,
            cart_items: session.cart.len(),
            has_style_profile: session.style_profile.is_some(),
            last_channel: Some(session.last_channel),
        },
        None => SessionInfoResponse {
            user_id: request.user_id,
            channels_used: Vec::new(),
            channel_switches: 0,
            cart_items: 0,
            has_style_profile: false,
            last_channel: None,
        },
    };

    Json(response)
}

/// Get conversation history for a user, across all channels.
async fn chat_history(
    Extension(sessions): Extension<SharedSessions>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let messages = sessions.history(&user_id, query.limit).await;
    let count = messages.len();

    Json(HistoryResponse {
        user_id,
        messages,
        count,
    })
}

/// Clear the session for a user (administrative, idempotent).
async fn clear_session(
    Extension(sessions): Extension<SharedSessions>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    sessions.clear(&user_id).await;

    Json(serde_json::json!({
        "message": "Session cleared",
        "user_id": user_id,
    }))
}

/// Create chat routes
pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/v1/chat/message", post(send_message))
        .route("/api/v1/chat/session", post(session_info))
        .route("/api/v1/chat/history/:user_id", get(chat_history))
        .route("/api/v1/chat/session/:user_id", delete(clear_session))
}

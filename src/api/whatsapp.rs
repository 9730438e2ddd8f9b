//! WhatsApp webhook endpoints (Twilio)
//!
//! Inbound WhatsApp traffic lands here as form-encoded webhooks. Photo
//! messages flow through the profile extractor and persist a style
//! profile; text messages flow through the orchestrator. Either way the
//! sender always gets a TwiML reply - webhook failures answer with a
//! friendly apology rather than an error status, so the gateway never
//! retries into a broken conversation.

use super::{SharedExtractor, SharedOrchestrator, SharedSessions, SharedWhatsApp};
use atelier_channels::{mask_user, twiml_response, TwilioWebhook};
use atelier_core::{OrchestratorInput, StyleProfile};
use atelier_llm::MessageRole;
use axum::{
    extract::{Extension, Form},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info, warn};

const CHANNEL: &str = "whatsapp";

fn xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}

/// Reachability probe; Twilio calls this during webhook setup.
async fn verify_webhook() -> &'static str {
    "Atelier WhatsApp webhook active"
}

/// Formatted style-analysis reply sent back over WhatsApp
fn style_summary(profile: &StyleProfile) -> String {
    format!(
        "✨ *Style Profile Complete!*\n\n\
         🎨 *Your Undertone:* {}\n\n\
         🌈 *Colors That Suit You:*\n{}\n\n\
         🚫 *Colors to Avoid:*\n{}\n\n\
         👗 *Style Type:* {}\n\
         ⭐ *Celebrity Match:* {}\n\n\
         Now I can recommend outfits that will look *amazing* on you!\n\n\
         What are you shopping for today? 👠👔👗",
        capitalize(profile.undertone.as_str()),
        profile
            .best_colors
            .iter()
            .take(5)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        profile
            .avoid_colors
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        profile.style_personality,
        profile.celebrity_match,
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Handle an inbound WhatsApp message.
async fn webhook(
    Extension(orchestrator): Extension<SharedOrchestrator>,
    Extension(sessions): Extension<SharedSessions>,
    Extension(extractor): Extension<SharedExtractor>,
    Extension(adapter): Extension<SharedWhatsApp>,
    Form(payload): Form<TwilioWebhook>,
) -> Response {
    let message = payload.normalize();
    let user_id = message.user_id.clone();

    info!(
        from = %mask_user(&user_id),
        has_media = message.has_image(),
        "WhatsApp message received"
    );

    // Photo message: analyze, persist the profile, reply with the summary
    if message.has_image() {
        if let Some(adapter) = &adapter {
            let media_url = message.media_url.as_deref().unwrap_or_default();
            match adapter.download_media(media_url).await {
                Ok(bytes) => {
                    let analysis = extractor.analyze(&bytes).await;

                    sessions
                        .append_message(
                            &user_id,
                            MessageRole::User,
                            "[Sent a photo for analysis]",
                            CHANNEL,
                        )
                        .await;
                    sessions.update_style_profile(&user_id, analysis.clone()).await;

                    let response = style_summary(&analysis);
                    sessions
                        .append_message(&user_id, MessageRole::Assistant, &response, CHANNEL)
                        .await;

                    return xml(twiml_response(&response));
                }
                Err(e) => {
                    error!(error = %e, "Failed to download WhatsApp media");
                    return xml(twiml_response(
                        "Oops! I couldn't read that photo. Could you try sending it again? 🙏",
                    ));
                }
            }
        }
        warn!("Image received but WhatsApp transport is not configured, treating as text");
    }

    let reply = orchestrator
        .process(OrchestratorInput::new(&user_id, CHANNEL, &message.text))
        .await;

    xml(twiml_response(&reply))
}

/// Operator test-send request
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to_number: String,
    pub message: String,
}

/// Send a WhatsApp message (for testing).
///
/// Only works with numbers that have joined the sandbox.
async fn send_message(
    Extension(adapter): Extension<SharedWhatsApp>,
    Json(request): Json<SendRequest>,
) -> Response {
    let Some(adapter) = adapter else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "WhatsApp transport is not configured"})),
        )
            .into_response();
    };

    match adapter.send_message(&request.to_number, &request.message).await {
        Ok(sid) => Json(serde_json::json!({
            "status": "sent",
            "to": request.to_number,
            "sid": sid,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to send WhatsApp message");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Create WhatsApp routes
pub fn whatsapp_routes() -> Router {
    Router::new()
        .route(
            "/api/v1/whatsapp/webhook",
            get(verify_webhook).post(webhook),
        )
        .route("/api/v1/whatsapp/send", post(send_message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{
        MemoryStore, Orchestrator, OrchestratorConfig, PaletteExtractor, ProfileExtractor,
        SessionManager,
    };
    use atelier_llm::MockProvider;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router(provider: Arc<MockProvider>) -> (Router, Arc<SessionManager>) {
        let sessions = Arc::new(SessionManager::new(Arc::new(MemoryStore::new())));
        let orchestrator = Arc::new(Orchestrator::new(
            provider,
            sessions.clone(),
            OrchestratorConfig::default(),
        ));
        let extractor: SharedExtractor = Arc::new(PaletteExtractor::new());
        let adapter: SharedWhatsApp = None;

        let router = Router::new()
            .merge(whatsapp_routes())
            .layer(Extension(sessions.clone()))
            .layer(Extension(orchestrator))
            .layer(Extension(extractor))
            .layer(Extension(adapter));
        (router, sessions)
    }

    #[tokio::test]
    async fn test_verify_endpoint() {
        let (app, _) = test_router(Arc::new(MockProvider::new()));

        let request = Request::builder()
            .uri("/api/v1/whatsapp/webhook")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_text_webhook_returns_twiml() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Hello from the stylist!");
        let (app, sessions) = test_router(provider);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/whatsapp/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "From=whatsapp%3A%2B15550001111&Body=Hi&NumMedia=0",
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let twiml = String::from_utf8(body.to_vec()).unwrap();
        assert!(twiml.contains("<Message>Hello from the stylist!</Message>"));

        // The turn was persisted against the phone-number identity
        let history = sessions.history("+15550001111", 10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].channel, "whatsapp");
    }

    #[tokio::test]
    async fn test_empty_body_becomes_greeting() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Welcome!");
        let (app, sessions) = test_router(provider.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/whatsapp/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("From=whatsapp%3A%2B15550001111&Body="))
            .unwrap();

        app.oneshot(request).await.unwrap();

        let history = sessions.history("+15550001111", 10).await;
        assert_eq!(history[0].content, "Hi");
    }

    #[tokio::test]
    async fn test_send_without_transport_is_unavailable() {
        let (app, _) = test_router(Arc::new(MockProvider::new()));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/whatsapp/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"to_number": "+15550001111", "message": "hi"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_style_summary_formatting() {
        let profile = StyleProfile::degraded_default();
        let summary = style_summary(&profile);

        assert!(summary.contains("*Your Undertone:* Neutral"));
        assert!(summary.contains("jade green"));
        assert!(summary.contains("*Style Type:* Versatile Classic"));
    }
}

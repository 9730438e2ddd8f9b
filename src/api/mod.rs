//! Web API module for Atelier
//!
//! Provides REST endpoints for:
//! - Web/app chat (`/api/v1/chat/*`)
//! - The WhatsApp webhook (`/api/v1/whatsapp/*`)
//! - Style profile analysis (`/api/v1/profile/*`)
//! - Dashboard analytics (`/api/v1/analytics/*`)

pub mod analytics;
pub mod chat;
pub mod profile;
pub mod whatsapp;

use atelier_channels::WhatsAppAdapter;
use atelier_core::{EventLog, Orchestrator, ProfileExtractor, SessionManager};
use axum::Router;
use std::sync::Arc;

/// Injected session manager
pub type SharedSessions = Arc<SessionManager>;
/// Injected orchestrator
pub type SharedOrchestrator = Arc<Orchestrator>;
/// Injected profile extractor
pub type SharedExtractor = Arc<dyn ProfileExtractor>;
/// Injected event log; absent when disabled or unavailable
pub type SharedEventLog = Option<Arc<dyn EventLog>>;
/// Injected WhatsApp transport; absent when disabled or unconfigured
pub type SharedWhatsApp = Option<Arc<WhatsAppAdapter>>;

pub use chat::chat_routes;
pub use whatsapp::whatsapp_routes;
pub use profile::profile_routes;
pub use analytics::analytics_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(chat_routes())
        .merge(whatsapp_routes())
        .merge(profile_routes())
        .merge(analytics_routes())
}

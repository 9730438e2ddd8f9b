//! Server module for Atelier
//!
//! Contains configuration loading, component wiring and the HTTP runtime.
//! Every component is constructed once here and handed to the router as an
//! explicit extension - there is no process-wide mutable state.

use crate::api;
use anyhow::{Context, Result};
use atelier_channels::WhatsAppAdapter;
use atelier_core::{
    EventLog, MemoryStore, Orchestrator, OrchestratorConfig, PaletteExtractor, ProfileExtractor,
    RedisStore, SessionManager, SessionStore, SqliteEventLog,
};
use atelier_llm::{CompletionProvider, GroqConfig, GroqProvider};
use axum::{routing::get, Extension, Json, Router};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
    pub llm: LlmConfig,
    pub event_log: EventLogConfig,
    pub whatsapp: WhatsAppChannelConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Session expiry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sliding TTL, refreshed on every write
    pub ttl_days: u64,
}

/// LLM configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub default_provider: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub history_limit: usize,
    pub request_timeout_secs: u64,
}

/// Event log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventLogConfig {
    pub enabled: bool,
    pub path: String,
}

/// WhatsApp channel config
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppChannelConfig {
    pub enabled: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Detailed health check response
#[derive(Debug, Serialize)]
struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    checks: HealthChecks,
}

/// Individual health checks
#[derive(Debug, Serialize)]
struct HealthChecks {
    redis: ComponentHealth,
}

/// Component health status
#[derive(Debug, Serialize)]
struct ComponentHealth {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// Simple health check endpoint (for load balancers)
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Detailed health check with component status
async fn detailed_health_check(
    Extension(redis_url): Extension<String>,
) -> Json<DetailedHealthResponse> {
    let redis_health = {
        let start = std::time::Instant::now();
        match redis::Client::open(redis_url.as_str()) {
            Ok(client) => match client.get_multiplexed_async_connection().await {
                Ok(mut conn) => match redis::cmd("PING").query_async::<String>(&mut conn).await {
                    Ok(_) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
                    Err(e) => ComponentHealth::unhealthy(e.to_string()),
                },
                Err(e) => ComponentHealth::unhealthy(e.to_string()),
            },
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        }
    };

    let overall_status = if redis_health.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            redis: redis_health,
        },
    })
}

/// Welcome endpoint
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Atelier - Omnichannel Retail Assistant",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "health": "/health",
    }))
}

/// Embedded default configuration (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Load configuration from files and environment
pub(crate) fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("ATELIER_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        // 3. Environment variables (highest priority), e.g. ATELIER_SERVER__PORT
        .add_source(
            Environment::with_prefix("ATELIER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

fn resolve_provider(llm_config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>> {
    match llm_config.default_provider.as_str() {
        "groq" | "auto" | "" => {
            let config = GroqConfig::from_env().context(
                "No completion provider configured.\n\n\
                 Set the GROQ_API_KEY environment variable (free tier at console.groq.com)\n\
                 and optionally GROQ_MODEL to pick a model.",
            )?;
            let provider = GroqProvider::new(config);
            info!(model = %provider.default_model(), "Registered Groq provider");
            Ok(Arc::new(provider))
        }
        other => anyhow::bail!("Unknown completion provider '{other}' (supported: groq)"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Atelier v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    // ── Event log (best-effort analytics sink) ─────────────────────────
    let event_log: Option<Arc<dyn EventLog>> = if config.event_log.enabled {
        match SqliteEventLog::from_path(Path::new(&config.event_log.path)).await {
            Ok(log) => Some(Arc::new(log)),
            Err(e) => {
                warn!("Event log unavailable, continuing without it: {e}");
                None
            }
        }
    } else {
        info!("Event log disabled by configuration");
        None
    };

    // ── Session store ──────────────────────────────────────────────────
    let ttl_seconds = config.session.ttl_days * 24 * 3600;
    let session_store: Arc<dyn SessionStore> =
        match RedisStore::with_options(&config.redis.url, "session:", ttl_seconds) {
            Ok(store) => {
                info!(ttl_days = config.session.ttl_days, "Redis session store initialized");
                Arc::new(store)
            }
            Err(e) => {
                warn!("Redis unavailable, using in-memory session store: {e}");
                Arc::new(MemoryStore::new())
            }
        };

    let mut manager = SessionManager::new(session_store);
    if let Some(log) = &event_log {
        manager = manager.with_event_log(log.clone());
    }
    let sessions = Arc::new(manager);
    info!("Session manager initialized");

    // ── Completion provider and orchestrator ───────────────────────────
    let provider = resolve_provider(&config.llm)?;

    let orchestrator_config = OrchestratorConfig::new()
        .with_max_tokens(config.llm.max_tokens)
        .with_temperature(config.llm.temperature)
        .with_history_limit(config.llm.history_limit)
        .with_request_timeout(Duration::from_secs(config.llm.request_timeout_secs));

    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        sessions.clone(),
        orchestrator_config,
    ));
    info!("Orchestrator initialized");

    // ── Profile extraction ─────────────────────────────────────────────
    let extractor: Arc<dyn ProfileExtractor> = Arc::new(PaletteExtractor::new());
    info!("Profile extractor initialized");

    // ── WhatsApp transport ─────────────────────────────────────────────
    let whatsapp: Option<Arc<WhatsAppAdapter>> = if config.whatsapp.enabled {
        match WhatsAppAdapter::from_env() {
            Ok(adapter) => Some(Arc::new(adapter)),
            Err(e) => {
                warn!("WhatsApp transport not started: {e}");
                None
            }
        }
    } else {
        info!("WhatsApp channel disabled by configuration");
        None
    };

    let redis_url_for_health = config.redis.url.clone();

    // Build the main router with all endpoints
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/", get(root))
        .merge(api::api_router())
        .layer(Extension(redis_url_for_health))
        .layer(Extension(sessions))
        .layer(Extension(orchestrator))
        .layer(Extension(extractor))
        .layer(Extension(event_log))
        .layer(Extension(whatsapp))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Atelier shutdown complete");
    Ok(())
}

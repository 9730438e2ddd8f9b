//! Style profile endpoints
//!
//! Image analysis for web/mobile clients (base64 payloads) and read access
//! to stored profiles and the reference palettes.

use super::{SharedExtractor, SharedSessions};
use atelier_core::profile::all_palettes;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::{info, warn};

/// Request with a base64 encoded image
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// When present, the resulting profile is persisted to this session
    #[serde(default)]
    pub user_id: String,
    pub image_base64: String,
}

/// Analyze a base64 encoded image.
///
/// For web/mobile apps that send the selfie as a base64 string. The
/// analysis itself never fails - an unusable image yields the degraded
/// default profile.
async fn analyze_image(
    Extension(extractor): Extension<SharedExtractor>,
    Extension(sessions): Extension<SharedSessions>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let image = match STANDARD.decode(&request.image_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Rejected undecodable image payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "image_base64 is not valid base64"})),
            )
                .into_response();
        }
    };

    let profile = extractor.analyze(&image).await;

    if !request.user_id.is_empty() {
        sessions
            .update_style_profile(&request.user_id, profile.clone())
            .await;
    }

    info!(undertone = %profile.undertone, "Color analysis completed");
    Json(profile).into_response()
}

/// Get the stored style profile for a user.
///
/// A missing profile is a genuine not-found, unlike the idempotent
/// mutation endpoints.
async fn get_profile(
    Extension(sessions): Extension<SharedSessions>,
    Path(user_id): Path<String>,
) -> Response {
    match sessions.get(&user_id).await.and_then(|s| s.style_profile) {
        Some(profile) => Json(profile).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "Style profile not found. Upload a selfie first!"
            })),
        )
            .into_response(),
    }
}

/// Get all color palettes for reference.
async fn get_palettes() -> Json<serde_json::Value> {
    let mut palettes = serde_json::Map::new();
    for (undertone, palette) in all_palettes() {
        palettes.insert(
            undertone.as_str().to_string(),
            serde_json::json!(palette),
        );
    }

    Json(serde_json::json!({
        "palettes": palettes,
        "description": {
            "warm": "Golden, peachy, olive tones - best with earth colors",
            "cool": "Pink, blue, silver tones - best with jewel colors",
            "neutral": "Balanced tones - versatile with most colors",
        },
    }))
}

/// Create profile routes
pub fn profile_routes() -> Router {
    Router::new()
        .route("/api/v1/profile/analyze", post(analyze_image))
        .route("/api/v1/profile/palettes", get(get_palettes))
        .route("/api/v1/profile/:user_id", get(get_profile))
}

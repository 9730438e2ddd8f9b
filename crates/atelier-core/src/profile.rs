//! Style profile - color attributes derived from a customer photo
//!
//! The extraction itself is an opaque collaborator behind
//! [`ProfileExtractor`]: bytes in, a small structured attribute record out.
//! It never fails: when no usable signal is found it degrades to a fixed
//! neutral default with lowered confidence, and the conversation proceeds
//! normally.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Skin undertone classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    /// Golden/peachy tones
    Warm,
    /// Pink/blue tones
    Cool,
    /// Balanced tones
    Neutral,
}

impl Undertone {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warm => "warm",
            Self::Cool => "cool",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Undertone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Color palette for an undertone
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Palette {
    /// Colors that flatter this undertone
    pub best: &'static [&'static str],
    /// Colors to steer away from
    pub avoid: &'static [&'static str],
    /// Well-known people with this undertone (social proof)
    pub celebrities: &'static [&'static str],
}

/// Palette for warm undertones
pub const WARM_PALETTE: Palette = Palette {
    best: &[
        "coral", "peach", "olive green", "warm red", "golden yellow",
        "terracotta", "cream", "bronze", "rust", "camel",
    ],
    avoid: &["icy blue", "bright pink", "silver", "pure white"],
    celebrities: &["Deepika Padukone", "Priyanka Chopra", "Ranveer Singh"],
};

/// Palette for cool undertones
pub const COOL_PALETTE: Palette = Palette {
    best: &[
        "royal blue", "emerald green", "purple", "pink", "silver",
        "navy", "lavender", "burgundy", "charcoal", "true red",
    ],
    avoid: &["orange", "golden yellow", "warm brown", "rust"],
    celebrities: &["Kareena Kapoor", "Alia Bhatt", "Ranbir Kapoor"],
};

/// Palette for neutral undertones
pub const NEUTRAL_PALETTE: Palette = Palette {
    best: &[
        "jade green", "dusty pink", "teal", "soft white", "taupe",
        "blush", "sage", "medium blue", "mauve", "soft black",
    ],
    avoid: &["neon colors", "very bright shades"],
    celebrities: &["Anushka Sharma", "Katrina Kaif", "Hrithik Roshan"],
};

/// Look up the palette for an undertone
#[must_use]
pub fn palette(undertone: Undertone) -> &'static Palette {
    match undertone {
        Undertone::Warm => &WARM_PALETTE,
        Undertone::Cool => &COOL_PALETTE,
        Undertone::Neutral => &NEUTRAL_PALETTE,
    }
}

/// All palettes, keyed by undertone (reference endpoint)
#[must_use]
pub fn all_palettes() -> [(Undertone, &'static Palette); 3] {
    [
        (Undertone::Warm, &WARM_PALETTE),
        (Undertone::Cool, &COOL_PALETTE),
        (Undertone::Neutral, &NEUTRAL_PALETTE),
    ]
}

fn personalities(undertone: Undertone) -> &'static [&'static str] {
    match undertone {
        Undertone::Warm => &["Classic Elegant", "Bohemian Chic", "Natural Earthy"],
        Undertone::Cool => &["Modern Minimalist", "Glamorous Bold", "Sophisticated"],
        Undertone::Neutral => &["Versatile Classic", "Timeless Elegant", "Effortless"],
    }
}

/// Structured style attributes derived from a photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Detected undertone
    pub undertone: Undertone,
    /// Colors that flatter the customer
    pub best_colors: Vec<String>,
    /// Colors to steer away from
    pub avoid_colors: Vec<String>,
    /// Style personality label
    pub style_personality: String,
    /// Celebrity with a matching undertone
    pub celebrity_match: String,
    /// Analysis confidence, 0.0 - 1.0
    pub confidence: f32,
    /// Set on degraded results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StyleProfile {
    /// Build a profile for an undertone from the static palettes.
    #[must_use]
    pub fn for_undertone(undertone: Undertone, confidence: f32) -> Self {
        let palette = palette(undertone);
        let mut rng = rand::thread_rng();

        Self {
            undertone,
            best_colors: palette.best.iter().map(|s| (*s).to_string()).collect(),
            avoid_colors: palette.avoid.iter().map(|s| (*s).to_string()).collect(),
            style_personality: personalities(undertone)
                .choose(&mut rng)
                .copied()
                .unwrap_or("Classic")
                .to_string(),
            celebrity_match: palette
                .celebrities
                .choose(&mut rng)
                .copied()
                .unwrap_or("Anushka Sharma")
                .to_string(),
            confidence,
            note: None,
        }
    }

    /// The fixed fallback used when no usable signal is found.
    #[must_use]
    pub fn degraded_default() -> Self {
        Self {
            undertone: Undertone::Neutral,
            best_colors: NEUTRAL_PALETTE
                .best
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            avoid_colors: NEUTRAL_PALETTE
                .avoid
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            style_personality: "Versatile Classic".to_string(),
            celebrity_match: "Anushka Sharma".to_string(),
            confidence: 0.5,
            note: Some("Using default recommendations".to_string()),
        }
    }
}

/// Opaque profile-extraction collaborator: bytes in, attributes out.
/// Implementations never fail; they degrade to the neutral default.
#[async_trait::async_trait]
pub trait ProfileExtractor: Send + Sync {
    /// Analyze an image and return style attributes.
    async fn analyze(&self, image: &[u8]) -> StyleProfile;
}

/// Heuristic extractor: estimates warmth from a coarse channel average over
/// the raw pixel data.
///
/// TODO: replace the whole-image average with a face-region sampler once a
/// pure-Rust landmark model is wired in.
#[derive(Debug, Default)]
pub struct PaletteExtractor;

/// Below this many bytes there is no usable signal
const MIN_SAMPLE_BYTES: usize = 64;

impl PaletteExtractor {
    /// Create a new extractor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn classify(image: &[u8]) -> Option<Undertone> {
        if image.len() < MIN_SAMPLE_BYTES {
            return None;
        }

        let mut red: i64 = 0;
        let mut blue: i64 = 0;
        let mut samples: i64 = 0;

        for chunk in image.chunks_exact(3).step_by(16) {
            red += i64::from(chunk[0]);
            blue += i64::from(chunk[2]);
            samples += 1;
        }

        if samples == 0 {
            return None;
        }

        let warmth = (red - blue) as f64 / (255.0 * samples as f64);

        if warmth > 0.15 {
            Some(Undertone::Warm)
        } else if warmth < -0.05 {
            Some(Undertone::Cool)
        } else {
            Some(Undertone::Neutral)
        }
    }
}

#[async_trait::async_trait]
impl ProfileExtractor for PaletteExtractor {
    async fn analyze(&self, image: &[u8]) -> StyleProfile {
        match Self::classify(image) {
            Some(undertone) => {
                tracing::info!(undertone = %undertone, "Color analysis complete");
                StyleProfile::for_undertone(undertone, 0.85)
            }
            None => {
                tracing::warn!("No usable signal in image, using default profile");
                StyleProfile::degraded_default()
            }
        }
    }
}

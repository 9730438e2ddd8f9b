//! Context assembler
//!
//! Pure projection of a session (plus the incoming channel and an optional
//! freshly-computed style profile) into the text block prepended to the
//! completion prompt. The block order is fixed (continuity signals first,
//! then profile, then cart) so identical inputs always produce identical
//! prompts.

use crate::profile::StyleProfile;
use crate::session::Session;

/// Cart items shown to the model
const MAX_CART_LINES: usize = 3;

/// Best colors shown to the model
const MAX_BEST_COLORS: usize = 5;

/// Avoid colors shown to the model
const MAX_AVOID_COLORS: usize = 3;

/// Project a session into the prompt context block.
///
/// `fresh_profile` is a profile computed from an image attached to the
/// current message and not yet persisted; it supplements a stored profile
/// rather than replacing it. The transition note at the end relies on the
/// history not yet containing the current turn.
#[must_use]
pub fn assemble(session: &Session, channel: &str, fresh_profile: Option<&StyleProfile>) -> String {
    let mut parts = vec!["\n\n## CUSTOMER CONTEXT".to_string()];

    if let Some(name) = &session.name {
        parts.push(format!("- Name: {name}"));
    }

    parts.push(format!("- Current Channel: {channel}"));
    parts.push(format!(
        "- Channels Used: {}",
        session.channels_used.join(", ")
    ));

    if session.channel_switches > 0 {
        parts.push(format!(
            "- Channel Switches: {} (seamless experience!)",
            session.channel_switches
        ));
    }

    if let Some(profile) = &session.style_profile {
        parts.push("\n## STYLE PROFILE (Analyzed)".to_string());
        parts.push(format!("- Undertone: {}", profile.undertone));
        parts.push(format!(
            "- Best Colors: {}",
            join_first(&profile.best_colors, MAX_BEST_COLORS)
        ));
        parts.push(format!(
            "- Avoid Colors: {}",
            join_first(&profile.avoid_colors, MAX_AVOID_COLORS)
        ));
        parts.push(format!("- Style Type: {}", profile.style_personality));
    }

    if let Some(fresh) = fresh_profile {
        parts.push("\n## JUST ANALYZED IMAGE".to_string());
        parts.push(format!("- Undertone: {}", fresh.undertone));
        parts.push(format!(
            "- Best Colors: {}",
            join_first(&fresh.best_colors, MAX_BEST_COLORS)
        ));
        parts.push("- Provide personalized color recommendations based on this!".to_string());
    }

    if !session.cart.is_empty() {
        parts.push(format!("\n## CURRENT CART ({} items)", session.cart.len()));
        for item in session.cart.iter().take(MAX_CART_LINES) {
            parts.push(format!("- {}: ₹{}", item.name, item.price));
        }
    }

    // Transition note: the previous persisted turn was on a different
    // channel than the incoming message.
    if session.channel_switches > 0 {
        if let Some(last) = session.conversation_history.last() {
            if last.channel != channel {
                parts.push(format!(
                    "\n[Note: Customer just switched from {} to {}. \
                     Acknowledge this seamless transition briefly.]",
                    last.channel, channel
                ));
            }
        }
    }

    parts.join("\n")
}

fn join_first(items: &[String], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Normalized message types
//!
//! A normalized inbound message abstracts the differences between the
//! surfaces a customer can reach the assistant from (WhatsApp webhook,
//! web chat, mobile app, in-store kiosk).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// WhatsApp (Twilio messaging gateway)
    Whatsapp,
    /// Web chat widget
    Web,
    /// Mobile app
    MobileApp,
    /// In-store kiosk
    StoreKiosk,
    /// Direct HTTP API
    Api,
}

impl ChannelType {
    /// Get the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Web => "web",
            Self::MobileApp => "mobile_app",
            Self::StoreKiosk => "store_kiosk",
            Self::Api => "api",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChannelType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(Self::Whatsapp),
            "web" => Ok(Self::Web),
            "mobile_app" | "mobile" => Ok(Self::MobileApp),
            "store_kiosk" | "kiosk" => Ok(Self::StoreKiosk),
            "api" => Ok(Self::Api),
            other => Err(crate::Error::Parse(format!("unknown channel: {other}"))),
        }
    }
}

/// A normalized incoming message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Internal message ID
    pub id: Uuid,
    /// Channel the message arrived on
    pub channel: ChannelType,
    /// User identifier (phone number or opaque id)
    pub user_id: String,
    /// User display name (if the surface provides one)
    pub user_name: Option<String>,
    /// Message text content
    pub text: String,
    /// URL of an attached media item (if any)
    pub media_url: Option<String>,
    /// MIME type of the attached media (if any)
    pub media_content_type: Option<String>,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl NormalizedMessage {
    /// Create a new normalized message
    #[must_use]
    pub fn new(channel: ChannelType, user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            user_id: user_id.into(),
            user_name: None,
            text: text.into(),
            media_url: None,
            media_content_type: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the user name
    #[must_use]
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    /// Attach a media reference
    #[must_use]
    pub fn with_media(
        mut self,
        url: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        self.media_url = Some(url.into());
        self.media_content_type = Some(content_type.into());
        self
    }

    /// Check if the message carries an image attachment
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.media_url.is_some()
            && self
                .media_content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image"))
    }
}

/// Mask a user identifier for logging (phone numbers are PII)
#[must_use]
pub fn mask_user(user_id: &str) -> String {
    if user_id.len() <= 6 {
        return "***".to_string();
    }
    format!("{}...", &user_id[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_channel_type_display() {
        assert_eq!(ChannelType::Whatsapp.to_string(), "whatsapp");
        assert_eq!(ChannelType::StoreKiosk.to_string(), "store_kiosk");
    }

    #[test]
    fn test_channel_type_parse() {
        assert_eq!(
            ChannelType::from_str("whatsapp").unwrap(),
            ChannelType::Whatsapp
        );
        assert_eq!(ChannelType::from_str("kiosk").unwrap(), ChannelType::StoreKiosk);
        assert!(ChannelType::from_str("carrier-pigeon").is_err());
    }

    #[test]
    fn test_has_image() {
        let msg = NormalizedMessage::new(ChannelType::Whatsapp, "+15550001111", "look at this")
            .with_media("https://example.com/m/1", "image/jpeg");
        assert!(msg.has_image());

        let msg = NormalizedMessage::new(ChannelType::Whatsapp, "+15550001111", "a voice note")
            .with_media("https://example.com/m/2", "audio/ogg");
        assert!(!msg.has_image());

        let msg = NormalizedMessage::new(ChannelType::Web, "user-1", "plain text");
        assert!(!msg.has_image());
    }

    #[test]
    fn test_mask_user() {
        assert_eq!(mask_user("+919876543210"), "+91987...");
        assert_eq!(mask_user("abc"), "***");
    }
}

use crate::message::{ChannelType, NormalizedMessage};
use serde::Deserialize;

/// Incoming webhook payload from Twilio (form-encoded)
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioWebhook {
    /// Sender, `whatsapp:+E164` form
    #[serde(rename = "From")]
    pub from: String,
    /// Message body
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Number of media attachments (Twilio sends this as a string)
    #[serde(rename = "NumMedia", default = "default_num_media")]
    pub num_media: String,
    /// URL of the first media attachment
    #[serde(rename = "MediaUrl0", default)]
    pub media_url: Option<String>,
    /// MIME type of the first media attachment
    #[serde(rename = "MediaContentType0", default)]
    pub media_content_type: Option<String>,
    /// WhatsApp profile name of the sender
    #[serde(rename = "ProfileName", default)]
    pub profile_name: Option<String>,
}

fn default_num_media() -> String {
    "0".to_string()
}

impl TwilioWebhook {
    /// Stable user identity: the phone number without the `whatsapp:` prefix
    #[must_use]
    pub fn user_id(&self) -> String {
        self.from
            .strip_prefix("whatsapp:")
            .unwrap_or(&self.from)
            .to_string()
    }

    /// Number of attached media items
    #[must_use]
    pub fn media_count(&self) -> usize {
        self.num_media.parse().unwrap_or(0)
    }

    /// Convert to the channel-agnostic message form
    #[must_use]
    pub fn normalize(&self) -> NormalizedMessage {
        let mut normalized =
            NormalizedMessage::new(ChannelType::Whatsapp, self.user_id(), self.body.trim());

        if let Some(name) = &self.profile_name {
            if !name.is_empty() {
                normalized = normalized.with_user_name(name);
            }
        }

        if self.media_count() > 0 {
            if let (Some(url), Some(ct)) = (&self.media_url, &self.media_content_type) {
                normalized = normalized.with_media(url, ct);
            }
        }

        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_form_deserialize() {
        let form = "From=whatsapp%3A%2B919876543210&Body=Hi+there&NumMedia=0";
        let webhook: TwilioWebhook = serde_urlencoded::from_str(form).unwrap();

        assert_eq!(webhook.from, "whatsapp:+919876543210");
        assert_eq!(webhook.body, "Hi there");
        assert_eq!(webhook.media_count(), 0);
    }

    #[test]
    fn test_user_id_strips_prefix() {
        let form = "From=whatsapp%3A%2B15550001111&Body=hello";
        let webhook: TwilioWebhook = serde_urlencoded::from_str(form).unwrap();
        assert_eq!(webhook.user_id(), "+15550001111");
    }

    #[test]
    fn test_normalize_with_image() {
        let form = "From=whatsapp%3A%2B15550001111&Body=&NumMedia=1\
                    &MediaUrl0=https%3A%2F%2Fapi.twilio.com%2Fmedia%2F1\
                    &MediaContentType0=image%2Fjpeg&ProfileName=Asha";
        let webhook: TwilioWebhook = serde_urlencoded::from_str(form).unwrap();
        let normalized = webhook.normalize();

        assert_eq!(normalized.channel, ChannelType::Whatsapp);
        assert_eq!(normalized.user_id, "+15550001111");
        assert_eq!(normalized.user_name.as_deref(), Some("Asha"));
        assert!(normalized.has_image());
    }
}

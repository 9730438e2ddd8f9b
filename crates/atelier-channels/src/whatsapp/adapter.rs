use super::config::WhatsAppConfig;
use crate::error::{Error, Result};
use crate::message::mask_user;

use serde::Deserialize;
use tracing::{debug, info};

/// WhatsApp transport over Twilio's REST API
pub struct WhatsAppAdapter {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SendResponse {
    sid: Option<String>,
    message: Option<String>,
}

impl WhatsAppAdapter {
    /// Create a new WhatsApp adapter
    #[must_use]
    pub fn new(config: WhatsAppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        info!(from = %config.from_number, "WhatsApp adapter initialized");
        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let config = WhatsAppConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Ensure the `whatsapp:` prefix Twilio expects on addresses
    fn address(number: &str) -> String {
        if number.starts_with("whatsapp:") {
            number.to_string()
        } else {
            format!("whatsapp:{number}")
        }
    }

    /// Send a text message, returning the gateway message SID
    pub async fn send_message(&self, to_number: &str, body: &str) -> Result<String> {
        let params = [
            ("To", Self::address(to_number)),
            ("From", self.config.from_number.clone()),
            ("Body", body.to_string()),
        ];
        self.post_message(&params, to_number).await
    }

    /// Send a message with a media attachment
    pub async fn send_media(&self, to_number: &str, body: &str, media_url: &str) -> Result<String> {
        let params = [
            ("To", Self::address(to_number)),
            ("From", self.config.from_number.clone()),
            ("Body", body.to_string()),
            ("MediaUrl", media_url.to_string()),
        ];
        self.post_message(&params, to_number).await
    }

    async fn post_message(&self, params: &[(&str, String)], to_number: &str) -> Result<String> {
        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(params)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("unreadable gateway response: {e}")))?;

        if !status.is_success() {
            return Err(Error::Gateway(
                parsed
                    .message
                    .unwrap_or_else(|| format!("gateway returned {status}")),
            ));
        }

        let sid = parsed
            .sid
            .ok_or_else(|| Error::Gateway("no message sid in response".to_string()))?;

        info!(to = %mask_user(to_number), sid = %sid, "WhatsApp message sent");
        Ok(sid)
    }

    /// Download a media attachment (Twilio media URLs require basic auth)
    pub async fn download_media(&self, media_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(media_url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "media download returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        debug!(size = bytes.len(), "Media downloaded");
        Ok(bytes.to_vec())
    }
}

/// Build a TwiML reply for an inbound webhook
#[must_use]
pub fn twiml_response(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(body)
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_prefix() {
        assert_eq!(
            WhatsAppAdapter::address("+15550001111"),
            "whatsapp:+15550001111"
        );
        assert_eq!(
            WhatsAppAdapter::address("whatsapp:+15550001111"),
            "whatsapp:+15550001111"
        );
    }

    #[test]
    fn test_twiml_response() {
        let twiml = twiml_response("Hello!");
        assert!(twiml.starts_with("<?xml"));
        assert!(twiml.contains("<Message>Hello!</Message>"));
    }

    #[test]
    fn test_twiml_escapes_markup() {
        let twiml = twiml_response("Tops < ₹2,000 & more");
        assert!(twiml.contains("Tops &lt; ₹2,000 &amp; more"));
        assert!(!twiml.contains("< ₹"));
    }
}

use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

/// Twilio API base URL
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Default sandbox sender number
pub const DEFAULT_FROM_NUMBER: &str = "whatsapp:+14155238886";

/// WhatsApp (Twilio) transport configuration
#[derive(Clone)]
pub struct WhatsAppConfig {
    /// Twilio account SID
    pub account_sid: String,
    /// Twilio auth token
    pub auth_token: String,
    /// Sender number, `whatsapp:+E164` form
    pub from_number: String,
    /// API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

// Custom Debug implementation to mask the auth token
impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &mask_token(&self.auth_token))
            .field("from_number", &self.from_number)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        return "****".to_string();
    }
    format!("{}...{}", &token[..4], &token[token.len() - 4..])
}

impl WhatsAppConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: DEFAULT_FROM_NUMBER.to_string(),
            base_url: TWILIO_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .map_err(|_| Error::NotConfigured("TWILIO_ACCOUNT_SID not set".to_string()))?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN")
            .map_err(|_| Error::NotConfigured("TWILIO_AUTH_TOKEN not set".to_string()))?;
        let from_number = std::env::var("TWILIO_WHATSAPP_NUMBER")
            .unwrap_or_else(|_| DEFAULT_FROM_NUMBER.to_string());

        Ok(Self {
            account_sid,
            auth_token,
            from_number,
            base_url: TWILIO_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        })
    }

    /// Set the sender number
    #[must_use]
    pub fn with_from_number(mut self, number: impl Into<String>) -> Self {
        self.from_number = number.into();
        self
    }

    /// Messages endpoint for this account
    #[must_use]
    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let config = WhatsAppConfig::new("AC123", "token-secret-value");
        assert_eq!(
            config.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_debug_masks_token() {
        let config = WhatsAppConfig::new("AC123", "super-secret-auth-token");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super-secret-auth-token"));
        assert!(debug_str.contains("AC123"));
    }
}

//! Atelier Channels - Channel taxonomy and messaging transports
//!
//! This crate provides the channel identifiers shared across the assistant
//! (WhatsApp, web chat, mobile app, in-store kiosk) and the WhatsApp
//! transport built on Twilio's messaging API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod message;
pub mod whatsapp;

pub use error::{Error, Result};

// Re-export message types
pub use message::{mask_user, ChannelType, NormalizedMessage};

// Re-export WhatsApp transport
pub use whatsapp::{twiml_response, TwilioWebhook, WhatsAppAdapter, WhatsAppConfig};

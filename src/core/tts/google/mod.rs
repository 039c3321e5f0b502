//! Google Cloud Text-to-Speech provider module.
//!
//! Requests go to the `text:synthesize` REST endpoint keyed by an API key and
//! return base64-encoded LINEAR16 audio. The provider supports:
//!
//! - Native speaking rate and pitch
//! - SSML input
//! - Device effects profiles (`telephony-class-application` by default)
//! - Volume gain in decibels

mod config;
mod provider;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_EFFECTS_PROFILE, EFFECTS_PROFILES, GOOGLE_TTS_URL, GoogleTTSConfig, MAX_TEXT_LENGTH,
};
pub use provider::GoogleTTS;

//! Configuration types for the ElevenLabs provider.

use serde::{Deserialize, Serialize};

use crate::core::tts::base::non_empty;
use crate::core::tts::http::DEFAULT_TIMEOUT_SECS;

pub const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";

pub const DEFAULT_MODEL: &str = "eleven_monolingual_v1";

/// Maximum characters per request
pub const MAX_TEXT_LENGTH: usize = 5000;

pub const DEFAULT_STABILITY: f64 = 0.5;
pub const DEFAULT_SIMILARITY_BOOST: f64 = 0.75;

/// Settings of the ElevenLabs provider (`elevenlabs` configuration section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    /// Voice id of the virtual agent
    pub va_voice: Option<String>,
    /// Voice id of the caller
    pub caller_voice: Option<String>,
    pub model: String,
    /// Locales reported in voice profiles; not sent to the API
    pub va_locale: String,
    pub caller_locale: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            va_voice: None,
            caller_voice: None,
            model: DEFAULT_MODEL.to_string(),
            va_locale: "en-US".to_string(),
            caller_locale: "en-US".to_string(),
            base_url: ELEVENLABS_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ElevenLabsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if non_empty(&self.api_key).is_none() {
            return Err("ElevenLabs TTS requires an API key. \
                 Set ELEVENLABS_API_KEY environment variable or pass api_key parameter."
                .to_string());
        }
        if non_empty(&self.va_voice).is_none() {
            return Err("ElevenLabs TTS requires va_voice (voice ID for virtual assistant). \
                 Set ELEVENLABS_VA_VOICE environment variable or pass va_voice parameter."
                .to_string());
        }
        if non_empty(&self.caller_voice).is_none() {
            return Err("ElevenLabs TTS requires caller_voice (voice ID for caller). \
                 Set ELEVENLABS_CALLER_VOICE environment variable or pass caller_voice parameter."
                .to_string());
        }
        if self.model.is_empty() {
            return Err("ElevenLabs model must not be empty".to_string());
        }
        Ok(())
    }

    /// `{base_url}/{path}` without doubled slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

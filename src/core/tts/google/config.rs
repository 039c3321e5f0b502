//! Configuration types for the Google Cloud Text-to-Speech provider.

use serde::{Deserialize, Serialize};

use crate::core::tts::http::DEFAULT_TIMEOUT_SECS;

/// Google TTS REST endpoint
pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1beta1/text:synthesize";

/// Maximum characters per request
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Effects profile applied by plain `synthesize`
pub const DEFAULT_EFFECTS_PROFILE: &str = "telephony-class-application";

/// Device profiles documented by Google
pub const EFFECTS_PROFILES: &[&str] = &[
    "telephony-class-application",
    "wearable-class-device",
    "handset-class-device",
    "headphone-class-device",
    "small-bluetooth-speaker-class-device",
    "medium-bluetooth-speaker-class-device",
    "large-home-entertainment-class-device",
    "large-automotive-class-device",
];

/// Settings of the Google provider (`google` configuration section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleTTSConfig {
    /// API key, required
    pub api_key: Option<String>,
    pub va_voice: String,
    pub va_locale: String,
    pub caller_voice: String,
    pub caller_locale: String,
    /// Pitch in semitones, -20.0 to 20.0
    pub pitch: f64,
    /// Synthesis endpoint
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for GoogleTTSConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            va_voice: "en-US-Journey-O".to_string(),
            va_locale: "en-US".to_string(),
            caller_voice: "en-US-Journey-D".to_string(),
            caller_locale: "en-US".to_string(),
            pitch: 0.0,
            endpoint: GOOGLE_TTS_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GoogleTTSConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err("Google TTS requires an API key. \
                 Set GOOGLE_API_KEY environment variable or pass api_key parameter."
                .to_string());
        }
        if !(-20.0..=20.0).contains(&self.pitch) {
            return Err(format!("Pitch {} out of range -20.0 to 20.0", self.pitch));
        }
        Ok(())
    }
}

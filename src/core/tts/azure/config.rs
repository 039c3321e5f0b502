//! Configuration types for the Azure Text-to-Speech provider.

use serde::{Deserialize, Serialize};

use crate::core::tts::http::DEFAULT_TIMEOUT_SECS;

/// Output format requested through `X-Microsoft-OutputFormat`
pub const DEFAULT_OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

/// Documented request budget of the free tier
pub const MAX_REQUESTS_PER_MINUTE: u32 = 20;

/// Settings of the Azure provider (`azure` configuration section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureTTSConfig {
    /// Speech resource key, required
    pub subscription_key: Option<String>,
    pub region: String,
    pub va_voice: String,
    pub va_locale: String,
    pub caller_voice: String,
    pub caller_locale: String,
    pub output_format: String,
    /// Overrides the regional endpoint
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for AzureTTSConfig {
    fn default() -> Self {
        Self {
            subscription_key: None,
            region: "eastus".to_string(),
            va_voice: "en-US-JennyNeural".to_string(),
            va_locale: "en-US".to_string(),
            caller_voice: "en-US-GuyNeural".to_string(),
            caller_locale: "en-US".to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            endpoint: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AzureTTSConfig {
    /// Synthesis URL for the configured region, unless overridden.
    pub fn synthesis_url(&self) -> String {
        match self.endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
            _ => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.region
            ),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.subscription_key.as_deref().is_none_or(str::is_empty) {
            return Err("Azure TTS requires a subscription key. \
                 Set AZURE_SUBSCRIPTION_KEY environment variable or pass subscription_key parameter."
                .to_string());
        }
        if self.region.is_empty() && self.endpoint.as_deref().is_none_or(str::is_empty) {
            return Err("Azure TTS requires a region".to_string());
        }
        Ok(())
    }
}

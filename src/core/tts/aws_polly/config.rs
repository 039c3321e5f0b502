//! Configuration types for the Amazon Polly provider.
//!
//! The `aws` configuration section deserializes into [`AwsPollyConfig`]:
//!
//! ```yaml
//! aws:
//!   access_key_id: "AKIA..."
//!   secret_access_key: "..."
//!   region: "us-east-1"
//!   va_voice: "Joanna"
//!   caller_voice: "Matthew"
//!   engine: "neural"
//! ```

use serde::Deserialize;

/// Maximum characters per SynthesizeSpeech request
pub const MAX_TEXT_LENGTH: usize = 3000;

/// PCM sample rate requested from Polly
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Sample rates Polly accepts for PCM output
pub const PCM_SAMPLE_RATES: &[u32] = &[8000, 16000];

pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// Polly Engine
// =============================================================================

/// Amazon Polly synthesis engine.
///
/// - **Standard**: Basic TTS, lowest latency
/// - **Neural**: High-quality neural voices (default)
/// - **LongForm**: Optimized for longer content
/// - **Generative**: Generative voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum PollyEngine {
    Standard,
    #[default]
    Neural,
    LongForm,
    Generative,
}

impl PollyEngine {
    /// Convert to AWS API string.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Neural => "neural",
            Self::LongForm => "long-form",
            Self::Generative => "generative",
        }
    }

    /// Parse from string, with fallback to Neural.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "standard" => Self::Standard,
            "neural" => Self::Neural,
            "long-form" | "longform" | "long_form" => Self::LongForm,
            "generative" => Self::Generative,
            _ => Self::default(),
        }
    }
}

impl From<String> for PollyEngine {
    fn from(s: String) -> Self {
        Self::from_str_or_default(&s)
    }
}

impl std::fmt::Display for PollyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Provider configuration
// =============================================================================

/// Settings of the Amazon Polly provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AwsPollyConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Optional session token for temporary credentials
    pub session_token: Option<String>,
    pub region: String,
    pub va_voice: String,
    pub va_locale: String,
    pub caller_voice: String,
    pub caller_locale: String,
    pub engine: PollyEngine,
    /// PCM sample rate, 8000 or 16000
    pub sample_rate: u32,
    /// Custom endpoint, e.g. a local mock of the Polly API
    pub endpoint_url: Option<String>,
}

impl Default for AwsPollyConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            region: DEFAULT_REGION.to_string(),
            va_voice: "Joanna".to_string(),
            va_locale: "en-US".to_string(),
            caller_voice: "Matthew".to_string(),
            caller_locale: "en-US".to_string(),
            engine: PollyEngine::Neural,
            sample_rate: DEFAULT_SAMPLE_RATE,
            endpoint_url: None,
        }
    }
}

impl AwsPollyConfig {
    /// Both halves of an explicit key pair are present.
    pub fn has_explicit_credentials(&self) -> bool {
        self.access_key_id.as_deref().is_some_and(|k| !k.is_empty())
            && self
                .secret_access_key
                .as_deref()
                .is_some_and(|k| !k.is_empty())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.region.is_empty() {
            return Err("AWS region is required".to_string());
        }
        if self.va_voice.is_empty() || self.caller_voice.is_empty() {
            return Err("AWS Polly voices must not be empty".to_string());
        }
        if !PCM_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(format!(
                "Unsupported PCM sample rate {}, expected one of {:?}",
                self.sample_rate, PCM_SAMPLE_RATES
            ));
        }
        Ok(())
    }
}

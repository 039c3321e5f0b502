//! Optional provider features.
//!
//! Each optional behaviour is its own trait. Providers implement the ones they
//! support and return `Some(self)` from the matching `as_*` accessor on
//! [`TTSProvider`], so callers can discover them from a trait object:
//!
//! ```rust,ignore
//! if let Some(streaming) = provider.as_streaming() {
//!     let mut stream = streaming.synthesize_stream(text, voice, locale, 1.0, 4096).await?;
//!     while let Some(chunk) = stream.next().await { /* ... */ }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{TTSProvider, TTSResult};

/// Default chunk size for streaming synthesis.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Stream of audio chunks, each at most the requested chunk size.
pub type AudioStream = BoxStream<'static, TTSResult<Bytes>>;

// =============================================================================
// Feature traits
// =============================================================================

/// Incremental synthesis.
#[async_trait]
pub trait StreamingSynthesis: Send + Sync {
    /// Start a synthesis request and return its audio as a stream.
    ///
    /// Failures of the initiating request are returned here, before any chunk.
    /// Failures while reading the body arrive as `Err` items.
    async fn synthesize_stream(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        chunk_size: usize,
    ) -> TTSResult<AudioStream>;
}

/// Synthesis from SSML markup.
#[async_trait]
pub trait SsmlSynthesis: Send + Sync {
    async fn synthesize_ssml(
        &self,
        ssml: &str,
        voice: &str,
        locale: &str,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes>;

    /// Shallow well-formedness check: the markup carries an opening `<speak`
    /// and a closing `</speak>`.
    fn validate_ssml(&self, ssml: &str) -> bool {
        super::ssml::validate(ssml)
    }
}

/// A voice registered or cloned on the provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomVoice {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Synthesis with account-specific voices addressed by id.
#[async_trait]
pub trait CustomVoiceSynthesis: Send + Sync {
    /// `voice_settings` is merged over the provider's default settings.
    async fn synthesize_with_voice_id(
        &self,
        text: &str,
        voice_id: &str,
        locale: Option<&str>,
        rate: f64,
        output_file: Option<&Path>,
        voice_settings: &Map<String, Value>,
    ) -> TTSResult<Bytes>;

    async fn list_custom_voices(&self) -> TTSResult<Vec<CustomVoice>>;
}

/// Vendor post-processing presets (device profiles).
#[async_trait]
pub trait AudioEffectsSynthesis: Send + Sync {
    /// `effects_profile` of `None` requests the audio without any profile.
    async fn synthesize_with_effects(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        effects_profile: Option<&str>,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes>;

    fn list_effects_profiles(&self) -> Vec<String>;
}

/// Output volume adjustment.
#[async_trait]
pub trait VolumeControlSynthesis: Send + Sync {
    /// `volume` is a multiplier in `0.0..=2.0`; `1.0` leaves the level unchanged.
    async fn synthesize_with_volume(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        volume: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes>;
}

// =============================================================================
// Runtime discovery
// =============================================================================

/// Optional features discoverable on a provider trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TTSFeature {
    Streaming,
    Ssml,
    CustomVoices,
    AudioEffects,
    VolumeControl,
}

impl TTSFeature {
    pub const ALL: [TTSFeature; 5] = [
        TTSFeature::Streaming,
        TTSFeature::Ssml,
        TTSFeature::CustomVoices,
        TTSFeature::AudioEffects,
        TTSFeature::VolumeControl,
    ];

    /// Name as used by [`super::TTSCapabilities::has_feature`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Ssml => "ssml",
            Self::CustomVoices => "custom_voices",
            Self::AudioEffects => "audio_effects",
            Self::VolumeControl => "volume_control",
        }
    }
}

impl std::fmt::Display for TTSFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `provider` implements the trait behind `feature`.
pub fn has_feature(provider: &dyn TTSProvider, feature: TTSFeature) -> bool {
    match feature {
        TTSFeature::Streaming => provider.as_streaming().is_some(),
        TTSFeature::Ssml => provider.as_ssml().is_some(),
        TTSFeature::CustomVoices => provider.as_custom_voice().is_some(),
        TTSFeature::AudioEffects => provider.as_audio_effects().is_some(),
        TTSFeature::VolumeControl => provider.as_volume_control().is_some(),
    }
}

/// Features implemented by `provider`, in [`TTSFeature::ALL`] order.
pub fn supported_features(provider: &dyn TTSProvider) -> Vec<TTSFeature> {
    TTSFeature::ALL
        .into_iter()
        .filter(|feature| has_feature(provider, *feature))
        .collect()
}

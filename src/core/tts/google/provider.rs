//! Google Cloud Text-to-Speech provider implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://texttospeech.googleapis.com/v1beta1/text:synthesize?alt=json&key=...`
//! - Input: `text` or `ssml`
//! - Output: LINEAR16, base64 in `audioContent`
//! - Audio config: speakingRate, pitch, volumeGainDb, effectsProfileId

use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::config::{
    DEFAULT_EFFECTS_PROFILE, EFFECTS_PROFILES, GoogleTTSConfig, MAX_TEXT_LENGTH,
};
use crate::core::tts::base::{
    ProviderOptions, SpeakerRole, TTSError, TTSProvider, TTSResult, VoiceProfile, apply_options,
    options_into_config, write_output,
};
use crate::core::tts::capabilities::{TTSCapabilities, formats};
use crate::core::tts::features::{AudioEffectsSynthesis, SsmlSynthesis, VolumeControlSynthesis};
use crate::core::tts::http::{build_client, ensure_success, transport_error};
use crate::core::tts::ssml;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum SynthesisInput {
    Text(String),
    Ssml(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    pitch: f64,
    speaking_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_gain_db: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    effects_profile_id: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest {
    audio_config: AudioConfig,
    input: SynthesisInput,
    voice: VoiceSelection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// One synthesis call, before it becomes a request body.
struct Synthesis<'a> {
    input: SynthesisInput,
    voice: &'a str,
    locale: &'a str,
    rate: f64,
    effects_profile: Option<&'a str>,
    volume_gain_db: Option<f64>,
}

fn google_capabilities() -> TTSCapabilities {
    TTSCapabilities {
        supports_streaming: false,
        supports_ssml: true,
        supports_custom_voices: false,
        supported_audio_formats: formats(&["wav", "mp3", "ogg"]),
        max_text_length: Some(MAX_TEXT_LENGTH),
        max_requests_per_minute: None,
        supports_pitch_control: true,
        supports_rate_control: true,
        supports_volume_control: true,
        supports_audio_effects: true,
        requires_api_key: true,
        ..Default::default()
    }
}

// =============================================================================
// Google TTS Provider
// =============================================================================

/// Google Cloud Text-to-Speech provider.
pub struct GoogleTTS {
    config: GoogleTTSConfig,
    capabilities: TTSCapabilities,
    client: reqwest::Client,
}

impl GoogleTTS {
    pub fn new(config: GoogleTTSConfig) -> TTSResult<Self> {
        config.validate().map_err(TTSError::InvalidConfiguration)?;
        let client = build_client(config.request_timeout_secs, None)?;

        debug!(endpoint = %config.endpoint, "Created Google TTS provider");

        Ok(Self {
            config,
            capabilities: google_capabilities(),
            client,
        })
    }

    /// Build from the resolved `google` configuration section.
    pub fn from_options(options: ProviderOptions) -> TTSResult<Self> {
        Self::new(options_into_config("google", options)?)
    }

    pub fn config(&self) -> &GoogleTTSConfig {
        &self.config
    }

    fn build_request(&self, synthesis: Synthesis<'_>) -> SynthesizeRequest {
        SynthesizeRequest {
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
                pitch: self.config.pitch,
                speaking_rate: synthesis.rate,
                volume_gain_db: synthesis.volume_gain_db,
                effects_profile_id: synthesis
                    .effects_profile
                    .map(|p| vec![p.to_string()])
                    .unwrap_or_default(),
            },
            input: synthesis.input,
            voice: VoiceSelection {
                language_code: synthesis.locale.to_string(),
                name: synthesis.voice.to_string(),
            },
        }
    }

    async fn run(&self, synthesis: Synthesis<'_>, output_file: Option<&Path>) -> TTSResult<Bytes> {
        debug!(
            voice = synthesis.voice,
            locale = synthesis.locale,
            rate = synthesis.rate,
            effects_profile = synthesis.effects_profile.unwrap_or("none"),
            "Synthesizing text with Google TTS"
        );

        let body = self.build_request(synthesis);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("alt", "json"), ("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("google", e))?;
        let response = ensure_success("google", response).await?;

        let payload: SynthesizeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed Google TTS response");
            TTSError::api_with_source(format!("Failed to parse Google TTS API response: {e}"), e)
        })?;

        let audio = BASE64.decode(payload.audio_content.as_bytes()).map_err(|e| {
            error!(error = %e, "Invalid base64 audio in Google TTS response");
            TTSError::api_with_source(format!("Failed to parse Google TTS API response: {e}"), e)
        })?;

        debug!(audio_bytes = audio.len(), "Successfully synthesized audio");

        if let Some(path) = output_file {
            write_output(path, &audio).await?;
        }

        Ok(Bytes::from(audio))
    }
}

#[async_trait]
impl TTSProvider for GoogleTTS {
    fn name(&self) -> &'static str {
        "google"
    }

    fn capabilities(&self) -> &TTSCapabilities {
        &self.capabilities
    }

    fn configure(&mut self, options: &ProviderOptions) -> TTSResult<()> {
        let config = apply_options("google", &self.config, options)?;
        config.validate().map_err(TTSError::InvalidConfiguration)?;

        if config.request_timeout_secs != self.config.request_timeout_secs {
            self.client = build_client(config.request_timeout_secs, None)?;
        }
        self.config = config;
        Ok(())
    }

    fn voice_profile(&self, role: SpeakerRole) -> VoiceProfile {
        match role {
            SpeakerRole::VirtualAgent => {
                VoiceProfile::new(&self.config.va_voice, &self.config.va_locale)
            }
            SpeakerRole::Caller => {
                VoiceProfile::new(&self.config.caller_voice, &self.config.caller_locale)
            }
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        let synthesis = Synthesis {
            input: SynthesisInput::Text(text.to_string()),
            voice,
            locale,
            rate,
            effects_profile: Some(DEFAULT_EFFECTS_PROFILE),
            volume_gain_db: None,
        };
        self.run(synthesis, output_file).await
    }

    fn as_ssml(&self) -> Option<&dyn SsmlSynthesis> {
        Some(self)
    }

    fn as_audio_effects(&self) -> Option<&dyn AudioEffectsSynthesis> {
        Some(self)
    }

    fn as_volume_control(&self) -> Option<&dyn VolumeControlSynthesis> {
        Some(self)
    }
}

#[async_trait]
impl SsmlSynthesis for GoogleTTS {
    async fn synthesize_ssml(
        &self,
        ssml: &str,
        voice: &str,
        locale: &str,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        let synthesis = Synthesis {
            input: SynthesisInput::Ssml(ssml.to_string()),
            voice,
            locale,
            rate: 1.0,
            effects_profile: Some(DEFAULT_EFFECTS_PROFILE),
            volume_gain_db: None,
        };
        self.run(synthesis, output_file).await
    }
}

#[async_trait]
impl AudioEffectsSynthesis for GoogleTTS {
    async fn synthesize_with_effects(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        effects_profile: Option<&str>,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        let synthesis = Synthesis {
            input: SynthesisInput::Text(text.to_string()),
            voice,
            locale,
            rate,
            effects_profile,
            volume_gain_db: None,
        };
        self.run(synthesis, output_file).await
    }

    fn list_effects_profiles(&self) -> Vec<String> {
        EFFECTS_PROFILES.iter().map(|p| p.to_string()).collect()
    }
}

#[async_trait]
impl VolumeControlSynthesis for GoogleTTS {
    async fn synthesize_with_volume(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        volume: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        let synthesis = Synthesis {
            input: SynthesisInput::Text(text.to_string()),
            voice,
            locale,
            rate,
            effects_profile: Some(DEFAULT_EFFECTS_PROFILE),
            volume_gain_db: Some(ssml::volume_gain_db(volume)),
        };
        self.run(synthesis, output_file).await
    }
}

//! ElevenLabs Text-to-Speech provider implementation.
//!
//! # API Reference
//!
//! - Synthesis: `POST {base}/text-to-speech/{voice_id}`
//! - Streaming: `POST {base}/text-to-speech/{voice_id}/stream`
//! - Voices: `GET {base}/voices`
//! - Auth: `xi-api-key` header
//! - Output: MP3 (`Accept: audio/mpeg`)

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, info};

use super::config::{
    DEFAULT_SIMILARITY_BOOST, DEFAULT_STABILITY, ElevenLabsConfig, MAX_TEXT_LENGTH,
};
use crate::core::tts::base::{
    ProviderOptions, SpeakerRole, TTSError, TTSProvider, TTSResult, VoiceProfile, apply_options,
    options_into_config, write_output,
};
use crate::core::tts::capabilities::{TTSCapabilities, formats};
use crate::core::tts::features::{
    AudioStream, CustomVoice, CustomVoiceSynthesis, StreamingSynthesis,
};
use crate::core::tts::http::{
    build_client, ensure_success, read_body, response_stream, transport_error,
};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    labels: Option<Map<String, Value>>,
}

impl From<VoiceEntry> for CustomVoice {
    fn from(entry: VoiceEntry) -> Self {
        let labels: HashMap<String, String> = entry
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect();

        CustomVoice {
            id: entry.voice_id,
            name: entry.name,
            category: entry.category.unwrap_or_else(|| "custom".to_string()),
            labels,
        }
    }
}

/// Default voice settings with `overrides` merged over them.
pub(super) fn merged_voice_settings(overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    settings.insert("stability".to_string(), json!(DEFAULT_STABILITY));
    settings.insert("similarity_boost".to_string(), json!(DEFAULT_SIMILARITY_BOOST));
    for (key, value) in overrides {
        settings.insert(key.clone(), value.clone());
    }
    settings
}

fn elevenlabs_capabilities() -> TTSCapabilities {
    TTSCapabilities {
        supports_streaming: true,
        supports_ssml: false,
        supports_custom_voices: true,
        supported_audio_formats: formats(&["mp3", "wav"]),
        max_text_length: Some(MAX_TEXT_LENGTH),
        max_requests_per_minute: None,
        supports_pitch_control: false,
        supports_rate_control: false,
        supports_volume_control: false,
        requires_api_key: true,
        ..Default::default()
    }
}

fn default_headers(config: &ElevenLabsConfig) -> TTSResult<HeaderMap> {
    let key = config.api_key.as_deref().unwrap_or_default();
    let key = HeaderValue::from_str(key).map_err(|e| {
        TTSError::InvalidConfiguration(format!("Invalid ElevenLabs API key: {e}"))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("xi-api-key"), key);
    headers.insert(ACCEPT, HeaderValue::from_static("audio/mpeg"));
    Ok(headers)
}

// =============================================================================
// ElevenLabs TTS Provider
// =============================================================================

/// ElevenLabs Text-to-Speech provider.
pub struct ElevenLabsTTS {
    config: ElevenLabsConfig,
    capabilities: TTSCapabilities,
    client: reqwest::Client,
}

impl ElevenLabsTTS {
    pub fn new(config: ElevenLabsConfig) -> TTSResult<Self> {
        config.validate().map_err(TTSError::InvalidConfiguration)?;
        let client = build_client(config.request_timeout_secs, Some(default_headers(&config)?))?;

        debug!(
            model = %config.model,
            base_url = %config.base_url,
            "Created ElevenLabs TTS provider"
        );

        Ok(Self {
            config,
            capabilities: elevenlabs_capabilities(),
            client,
        })
    }

    /// Build from the resolved `elevenlabs` configuration section.
    pub fn from_options(options: ProviderOptions) -> TTSResult<Self> {
        Self::new(options_into_config("elevenlabs", options)?)
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    /// `{base}/text-to-speech/{voice_id}[/stream]` with the id as one escaped segment.
    fn voice_url(&self, voice_id: &str, stream: bool) -> TTSResult<reqwest::Url> {
        let invalid = || {
            TTSError::InvalidConfiguration(format!(
                "Invalid ElevenLabs base_url: {}",
                self.config.base_url
            ))
        };

        let mut url = reqwest::Url::parse(&self.config.url("text-to-speech")).map_err(|_| invalid())?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| invalid())?;
            segments.push(voice_id);
            if stream {
                segments.push("stream");
            }
        }
        Ok(url)
    }

    async fn post_text(
        &self,
        url: reqwest::Url,
        text: &str,
        voice_settings: &Map<String, Value>,
    ) -> TTSResult<reqwest::Response> {
        let body = TextToSpeechRequest {
            text,
            model_id: &self.config.model,
            voice_settings: merged_voice_settings(voice_settings),
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("elevenlabs", e))?;
        ensure_success("elevenlabs", response).await
    }
}

#[async_trait]
impl TTSProvider for ElevenLabsTTS {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn capabilities(&self) -> &TTSCapabilities {
        &self.capabilities
    }

    fn configure(&mut self, options: &ProviderOptions) -> TTSResult<()> {
        let config = apply_options("elevenlabs", &self.config, options)?;
        config.validate().map_err(TTSError::InvalidConfiguration)?;

        if config.api_key != self.config.api_key
            || config.request_timeout_secs != self.config.request_timeout_secs
        {
            self.client =
                build_client(config.request_timeout_secs, Some(default_headers(&config)?))?;
            debug!("Recreated ElevenLabs HTTP client");
        }
        self.config = config;
        Ok(())
    }

    fn voice_profile(&self, role: SpeakerRole) -> VoiceProfile {
        let (voice, locale) = match role {
            SpeakerRole::VirtualAgent => (&self.config.va_voice, &self.config.va_locale),
            SpeakerRole::Caller => (&self.config.caller_voice, &self.config.caller_locale),
        };
        VoiceProfile::new(voice.as_deref().unwrap_or_default(), locale)
    }

    /// `voice` is a voice id; `locale` and `rate` are ignored.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        self.synthesize_with_voice_id(text, voice, Some(locale), rate, output_file, &Map::new())
            .await
    }

    fn as_streaming(&self) -> Option<&dyn StreamingSynthesis> {
        Some(self)
    }

    fn as_custom_voice(&self) -> Option<&dyn CustomVoiceSynthesis> {
        Some(self)
    }
}

#[async_trait]
impl CustomVoiceSynthesis for ElevenLabsTTS {
    async fn synthesize_with_voice_id(
        &self,
        text: &str,
        voice_id: &str,
        _locale: Option<&str>,
        _rate: f64,
        output_file: Option<&Path>,
        voice_settings: &Map<String, Value>,
    ) -> TTSResult<Bytes> {
        debug!(
            voice_id = voice_id,
            model = %self.config.model,
            text_len = text.len(),
            "Synthesizing text with ElevenLabs"
        );

        let response = self
            .post_text(self.voice_url(voice_id, false)?, text, voice_settings)
            .await?;
        let audio = read_body("elevenlabs", response).await?;

        debug!(audio_bytes = audio.len(), "Successfully synthesized audio");

        if let Some(path) = output_file {
            write_output(path, &audio).await?;
        }
        Ok(audio)
    }

    async fn list_custom_voices(&self) -> TTSResult<Vec<CustomVoice>> {
        let response = self
            .client
            .get(self.config.url("voices"))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error("elevenlabs", e))?;
        let response = ensure_success("elevenlabs", response).await?;

        let payload: VoicesResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed ElevenLabs voices response");
            TTSError::api_with_source(format!("Failed to list ElevenLabs voices: {e}"), e)
        })?;

        let voices: Vec<CustomVoice> = payload.voices.into_iter().map(CustomVoice::from).collect();
        info!(count = voices.len(), "Listed ElevenLabs voices");
        Ok(voices)
    }
}

#[async_trait]
impl StreamingSynthesis for ElevenLabsTTS {
    async fn synthesize_stream(
        &self,
        text: &str,
        voice: &str,
        _locale: &str,
        _rate: f64,
        chunk_size: usize,
    ) -> TTSResult<AudioStream> {
        debug!(
            voice_id = voice,
            chunk_size = chunk_size,
            "Starting ElevenLabs streaming synthesis"
        );

        let response = self
            .post_text(self.voice_url(voice, true)?, text, &Map::new())
            .await?;
        Ok(response_stream("elevenlabs", response, chunk_size))
    }
}

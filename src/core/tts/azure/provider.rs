//! Azure Text-to-Speech provider implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://{region}.tts.speech.microsoft.com/cognitiveservices/v1`
//! - Auth: `Ocp-Apim-Subscription-Key` header
//! - Body: SSML (`application/ssml+xml`)
//! - Output: selected by `X-Microsoft-OutputFormat`

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::debug;

use super::config::{AzureTTSConfig, MAX_REQUESTS_PER_MINUTE};
use crate::core::tts::base::{
    ProviderOptions, SpeakerRole, TTSError, TTSProvider, TTSResult, VoiceProfile, apply_options,
    options_into_config, write_output,
};
use crate::core::tts::capabilities::{TTSCapabilities, formats};
use crate::core::tts::features::{SsmlSynthesis, VolumeControlSynthesis};
use crate::core::tts::http::{build_client, ensure_success, read_body, transport_error};
use crate::core::tts::ssml;

const SSML_NAMESPACE: &str = "http://www.w3.org/2001/10/synthesis";

fn azure_capabilities() -> TTSCapabilities {
    TTSCapabilities {
        supports_streaming: false,
        supports_ssml: true,
        supports_custom_voices: false,
        supported_audio_formats: formats(&["wav", "mp3"]),
        max_text_length: None,
        max_requests_per_minute: Some(MAX_REQUESTS_PER_MINUTE),
        supports_pitch_control: true,
        supports_rate_control: true,
        supports_volume_control: true,
        requires_api_key: true,
        ..Default::default()
    }
}

fn header_value(name: &str, value: &str) -> TTSResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| TTSError::InvalidConfiguration(format!("Invalid value for {name}: {e}")))
}

fn default_headers(config: &AzureTTSConfig) -> TTSResult<HeaderMap> {
    let key = config.subscription_key.as_deref().unwrap_or_default();

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("ocp-apim-subscription-key"),
        header_value("subscription_key", key)?,
    );
    headers.insert(
        HeaderName::from_static("x-microsoft-outputformat"),
        header_value("output_format", &config.output_format)?,
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/ssml+xml"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static("vision-clip"));
    Ok(headers)
}

/// Relative prosody volume for a multiplier, e.g. `1.5` -> `+50%`.
pub(super) fn volume_percent(volume: f64) -> String {
    let change = ((volume.clamp(0.0, 2.0) - 1.0) * 100.0) as i32;
    format!("{change:+}%")
}

/// Wrap plain text in the `<speak><voice>` envelope Azure expects.
///
/// Rate and volume become attributes of a single `<prosody>` element, which
/// is omitted when both are neutral.
pub(super) fn build_ssml(text: &str, voice: &str, locale: &str, rate: f64, volume: Option<f64>) -> String {
    let mut attributes = String::new();
    if ssml::needs_rate_markup(rate) {
        attributes.push_str(&format!(" rate=\"{}%\"", ssml::rate_percent(rate)));
    }
    if let Some(volume) = volume {
        attributes.push_str(&format!(" volume=\"{}\"", volume_percent(volume)));
    }

    let body = if attributes.is_empty() {
        ssml::escape_xml(text)
    } else {
        format!("<prosody{attributes}>{}</prosody>", ssml::escape_xml(text))
    };

    format!(
        "<speak version=\"1.0\" xmlns=\"{SSML_NAMESPACE}\" xml:lang=\"{}\"><voice name=\"{}\">{body}</voice></speak>",
        ssml::escape_xml(locale),
        ssml::escape_xml(voice),
    )
}

// =============================================================================
// Azure TTS Provider
// =============================================================================

/// Azure Cognitive Services Text-to-Speech provider.
pub struct AzureTTS {
    config: AzureTTSConfig,
    capabilities: TTSCapabilities,
    client: reqwest::Client,
}

impl AzureTTS {
    pub fn new(config: AzureTTSConfig) -> TTSResult<Self> {
        config.validate().map_err(TTSError::InvalidConfiguration)?;
        let client = build_client(config.request_timeout_secs, Some(default_headers(&config)?))?;

        debug!(
            region = %config.region,
            output_format = %config.output_format,
            "Created Azure TTS provider"
        );

        Ok(Self {
            config,
            capabilities: azure_capabilities(),
            client,
        })
    }

    /// Build from the resolved `azure` configuration section.
    pub fn from_options(options: ProviderOptions) -> TTSResult<Self> {
        Self::new(options_into_config("azure", options)?)
    }

    pub fn config(&self) -> &AzureTTSConfig {
        &self.config
    }

    async fn post_ssml(&self, body: String, output_file: Option<&Path>) -> TTSResult<Bytes> {
        let url = self.config.synthesis_url();
        debug!(url = %url, ssml_len = body.len(), "Sending Azure TTS request");

        let response = self
            .client
            .post(&url)
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("azure", e))?;
        let response = ensure_success("azure", response).await?;
        let audio = read_body("azure", response).await?;

        debug!(audio_bytes = audio.len(), "Successfully synthesized audio");

        if let Some(path) = output_file {
            write_output(path, &audio).await?;
        }
        Ok(audio)
    }
}

#[async_trait]
impl TTSProvider for AzureTTS {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn capabilities(&self) -> &TTSCapabilities {
        &self.capabilities
    }

    fn configure(&mut self, options: &ProviderOptions) -> TTSResult<()> {
        let config = apply_options("azure", &self.config, options)?;
        config.validate().map_err(TTSError::InvalidConfiguration)?;

        let rebuild = config.subscription_key != self.config.subscription_key
            || config.output_format != self.config.output_format
            || config.request_timeout_secs != self.config.request_timeout_secs;
        if rebuild {
            self.client =
                build_client(config.request_timeout_secs, Some(default_headers(&config)?))?;
            debug!(region = %config.region, "Recreated Azure TTS client");
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
        debug!(
            voice = voice,
            locale = locale,
            rate = rate,
            text_len = text.len(),
            "Synthesizing text with Azure TTS"
        );
        self.post_ssml(build_ssml(text, voice, locale, rate, None), output_file)
            .await
    }

    fn as_ssml(&self) -> Option<&dyn SsmlSynthesis> {
        Some(self)
    }

    fn as_volume_control(&self) -> Option<&dyn VolumeControlSynthesis> {
        Some(self)
    }
}

#[async_trait]
impl SsmlSynthesis for AzureTTS {
    /// The markup is sent as-is and must select its own `<voice>`.
    async fn synthesize_ssml(
        &self,
        ssml: &str,
        voice: &str,
        locale: &str,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        debug!(voice = voice, locale = locale, "Synthesizing SSML with Azure TTS");
        self.post_ssml(ssml.to_string(), output_file).await
    }
}

#[async_trait]
impl VolumeControlSynthesis for AzureTTS {
    async fn synthesize_with_volume(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        volume: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        debug!(voice = voice, volume = volume, "Synthesizing text with volume via Azure TTS");
        self.post_ssml(build_ssml(text, voice, locale, rate, Some(volume)), output_file)
            .await
    }
}

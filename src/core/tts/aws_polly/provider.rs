//! Amazon Polly TTS provider implementation.
//!
//! # API Reference
//!
//! - Service: Amazon Polly
//! - Operation: SynthesizeSpeech
//! - Output: pcm (16-bit signed little-endian, mono) at 16 kHz
//! - Text types: text, ssml

use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_polly::Client as PollyClient;
use aws_sdk_polly::config::Builder as PollyConfigBuilder;
use aws_sdk_polly::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_polly::primitives::ByteStream;
use aws_sdk_polly::types::{Engine, LanguageCode, OutputFormat, TextType, VoiceId};
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::config::{AwsPollyConfig, MAX_TEXT_LENGTH, PollyEngine};
use crate::core::tts::base::{
    ProviderOptions, SpeakerRole, TTSError, TTSProvider, TTSResult, VoiceProfile, option_string,
    options_into_config, write_output,
};
use crate::core::tts::capabilities::{TTSCapabilities, formats};
use crate::core::tts::features::{
    AudioStream, SsmlSynthesis, StreamingSynthesis, VolumeControlSynthesis,
};
use crate::core::tts::http::rechunk;
use crate::core::tts::ssml;
use crate::utils::wav::pcm_to_wav;

/// Error codes Polly uses for throttling.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// Option keys that require a new SDK client when they change.
const CONNECTION_KEYS: &[&str] = &[
    "access_key_id",
    "secret_access_key",
    "session_token",
    "region",
    "endpoint_url",
];

// =============================================================================
// Helper Functions
// =============================================================================

pub(super) fn is_throttling_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| THROTTLING_CODES.contains(&c))
}

/// Classify an SDK failure. Throttling codes become [`TTSError::RateLimited`].
fn map_sdk_error<E, R>(err: SdkError<E, R>) -> TTSError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let message = format!("Polly API error: {}", DisplayErrorContext(&err));

    error!(
        code = code.as_deref().unwrap_or("unknown"),
        error = %message,
        "Polly request failed"
    );

    if is_throttling_code(code.as_deref()) {
        TTSError::RateLimited {
            message,
            retry_after: None,
        }
    } else {
        TTSError::api(message)
    }
}

pub(super) fn is_wav_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

fn polly_capabilities() -> TTSCapabilities {
    TTSCapabilities {
        supports_streaming: true,
        supports_ssml: true,
        supports_custom_voices: false,
        supported_audio_formats: formats(&["pcm", "mp3", "ogg"]),
        max_text_length: Some(MAX_TEXT_LENGTH),
        max_requests_per_minute: None,
        supports_pitch_control: true,
        supports_rate_control: true,
        supports_volume_control: true,
        // The SDK falls back to the default credential chain
        requires_api_key: false,
        ..Default::default()
    }
}

// =============================================================================
// Amazon Polly TTS Provider
// =============================================================================

/// Amazon Polly TTS provider using the AWS SDK.
pub struct AwsPollyTTS {
    config: AwsPollyConfig,
    capabilities: TTSCapabilities,
    /// SDK client, created on first use and dropped when credentials change
    client: RwLock<Option<PollyClient>>,
}

impl AwsPollyTTS {
    pub fn new(config: AwsPollyConfig) -> TTSResult<Self> {
        config.validate().map_err(TTSError::InvalidConfiguration)?;

        debug!(
            region = %config.region,
            engine = %config.engine,
            explicit_credentials = config.has_explicit_credentials(),
            "Created Amazon Polly TTS provider"
        );

        Ok(Self {
            config,
            capabilities: polly_capabilities(),
            client: RwLock::new(None),
        })
    }

    /// Build from the resolved `aws` configuration section.
    pub fn from_options(options: ProviderOptions) -> TTSResult<Self> {
        Self::new(options_into_config("aws", options)?)
    }

    pub fn config(&self) -> &AwsPollyConfig {
        &self.config
    }

    /// Initialize AWS Polly client with credentials.
    async fn init_client(&self) -> TTSResult<PollyClient> {
        let region = Region::new(self.config.region.clone());

        if self.config.has_explicit_credentials() {
            let access_key = self.config.access_key_id.as_deref().unwrap_or_default();
            let secret_key = self.config.secret_access_key.as_deref().unwrap_or_default();
            let credentials = Credentials::new(
                access_key,
                secret_key,
                self.config.session_token.clone(),
                None,
                "vision-clip",
            );

            let mut builder = PollyConfigBuilder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(credentials);
            if let Some(endpoint) = &self.config.endpoint_url {
                builder = builder.endpoint_url(endpoint.clone());
            }

            return Ok(PollyClient::from_conf(builder.build()));
        }

        // Default credential chain (environment, profile, IAM roles)
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(endpoint) = &self.config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let aws_config = loader.load().await;

        Ok(PollyClient::new(&aws_config))
    }

    async fn client(&self) -> TTSResult<PollyClient> {
        if let Some(client) = self.client.read().await.clone() {
            return Ok(client);
        }

        let mut guard = self.client.write().await;
        if let Some(client) = guard.clone() {
            return Ok(client);
        }

        info!(region = %self.config.region, "Initializing Amazon Polly client");
        let client = self.init_client().await?;
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Issue a SynthesizeSpeech request and return the undrained audio stream.
    async fn request_speech(
        &self,
        input: &str,
        text_type: TextType,
        voice: &str,
        locale: &str,
    ) -> TTSResult<ByteStream> {
        let client = self.client().await?;

        debug!(
            text_len = input.len(),
            text_type = text_type.as_str(),
            voice = voice,
            locale = locale,
            engine = %self.config.engine,
            "Synthesizing text with Amazon Polly"
        );

        let response = client
            .synthesize_speech()
            .text(input)
            .text_type(text_type)
            .voice_id(VoiceId::from(voice))
            .engine(Engine::from(self.config.engine.as_str()))
            .language_code(LanguageCode::from(locale))
            .output_format(OutputFormat::Pcm)
            .sample_rate(self.config.sample_rate.to_string())
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(response.audio_stream)
    }

    /// Synthesize prepared input, add a WAV header for `.wav` targets, persist.
    async fn synthesize_input(
        &self,
        input: &str,
        text_type: TextType,
        voice: &str,
        locale: &str,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        let stream = self.request_speech(input, text_type, voice, locale).await?;
        let pcm = stream
            .collect()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read Polly audio stream");
                TTSError::api_with_source(format!("Failed to read Polly audio stream: {e}"), e)
            })?
            .into_bytes();

        let audio = match output_file {
            Some(path) if is_wav_path(path) => {
                Bytes::from(pcm_to_wav(&pcm, self.config.sample_rate, 1, 16))
            }
            _ => pcm,
        };

        debug!(audio_bytes = audio.len(), "Successfully synthesized audio");

        if let Some(path) = output_file {
            write_output(path, &audio).await?;
        }

        Ok(audio)
    }

    /// Plain text, or SSML carrying the rate when it is not 1.0.
    fn prepare_input(text: &str, rate: f64) -> (String, TextType) {
        match ssml::wrap_rate(text, rate) {
            Some(markup) => (markup, TextType::Ssml),
            None => (text.to_string(), TextType::Text),
        }
    }

    fn check_length(text: &str) -> TTSResult<()> {
        let length = text.chars().count();
        if length > MAX_TEXT_LENGTH {
            return Err(TTSError::InvalidConfiguration(format!(
                "Text length {length} exceeds maximum {MAX_TEXT_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TTSProvider for AwsPollyTTS {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn capabilities(&self) -> &TTSCapabilities {
        &self.capabilities
    }

    fn configure(&mut self, options: &ProviderOptions) -> TTSResult<()> {
        let mut config = self.config.clone();

        if let Some(v) = option_string(options, "access_key_id") {
            config.access_key_id = Some(v);
        }
        if let Some(v) = option_string(options, "secret_access_key") {
            config.secret_access_key = Some(v);
        }
        if let Some(v) = option_string(options, "session_token") {
            config.session_token = Some(v);
        }
        if let Some(v) = option_string(options, "endpoint_url") {
            config.endpoint_url = Some(v);
        }
        if let Some(v) = option_string(options, "region") {
            config.region = v;
        }
        if let Some(v) = option_string(options, "va_voice") {
            config.va_voice = v;
        }
        if let Some(v) = option_string(options, "va_locale") {
            config.va_locale = v;
        }
        if let Some(v) = option_string(options, "caller_voice") {
            config.caller_voice = v;
        }
        if let Some(v) = option_string(options, "caller_locale") {
            config.caller_locale = v;
        }
        if let Some(v) = option_string(options, "engine") {
            config.engine = PollyEngine::from_str_or_default(&v);
        }
        if let Some(v) = option_string(options, "sample_rate") {
            config.sample_rate = v.parse().map_err(|_| {
                TTSError::InvalidConfiguration(format!("Invalid sample rate: {v}"))
            })?;
        }

        config.validate().map_err(TTSError::InvalidConfiguration)?;
        self.config = config;

        if CONNECTION_KEYS.iter().any(|key| options.contains_key(*key)) {
            debug!(region = %self.config.region, "Polly connection settings changed, resetting client");
            *self.client.get_mut() = None;
        }

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
        Self::check_length(text)?;
        let (input, text_type) = Self::prepare_input(text, rate);
        self.synthesize_input(&input, text_type, voice, locale, output_file)
            .await
    }

    fn as_streaming(&self) -> Option<&dyn StreamingSynthesis> {
        Some(self)
    }

    fn as_ssml(&self) -> Option<&dyn SsmlSynthesis> {
        Some(self)
    }

    fn as_volume_control(&self) -> Option<&dyn VolumeControlSynthesis> {
        Some(self)
    }
}

#[async_trait]
impl SsmlSynthesis for AwsPollyTTS {
    async fn synthesize_ssml(
        &self,
        ssml: &str,
        voice: &str,
        locale: &str,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        self.synthesize_input(ssml, TextType::Ssml, voice, locale, output_file)
            .await
    }
}

#[async_trait]
impl StreamingSynthesis for AwsPollyTTS {
    async fn synthesize_stream(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        chunk_size: usize,
    ) -> TTSResult<AudioStream> {
        Self::check_length(text)?;
        let (input, text_type) = Self::prepare_input(text, rate);
        let mut audio = self.request_speech(&input, text_type, voice, locale).await?;

        let chunks = async_stream::stream! {
            while let Some(chunk) = audio.next().await {
                yield chunk;
            }
        };

        Ok(rechunk("aws", chunks, chunk_size))
    }
}

#[async_trait]
impl VolumeControlSynthesis for AwsPollyTTS {
    async fn synthesize_with_volume(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        volume: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes> {
        Self::check_length(text)?;
        let markup = volume_markup(text, rate, volume);
        self.synthesize_input(&markup, TextType::Ssml, voice, locale, output_file)
            .await
    }
}

/// `<speak><prosody [rate] volume>text</prosody></speak>`
pub(super) fn volume_markup(text: &str, rate: f64, volume: f64) -> String {
    let rate_attr = if ssml::needs_rate_markup(rate) {
        format!(r#" rate="{}%""#, ssml::rate_percent(rate))
    } else {
        String::new()
    };

    format!(
        r#"<speak><prosody{rate_attr} volume="{}">{}</prosody></speak>"#,
        ssml::volume_db(volume),
        ssml::escape_xml(text)
    )
}

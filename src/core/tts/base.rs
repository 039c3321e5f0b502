//! Core TTS provider contract.
//!
//! Every speech-synthesis backend implements [`TTSProvider`]. The dialog
//! processor only ever talks to a `Box<dyn TTSProvider>`: it calls
//! [`TTSProvider::synthesize`], reads the default voices through
//! [`TTSProvider::voice_profile`] and, when it wants more, asks for one of the
//! optional feature traits through the `as_*` accessors.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::capabilities::TTSCapabilities;
use super::features::{
    AudioEffectsSynthesis, CustomVoiceSynthesis, SsmlSynthesis, StreamingSynthesis,
    VolumeControlSynthesis,
};

/// Boxed error used as the cause of an [`TTSError::ApiError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// Options accepted by [`TTSProvider::configure`] and by provider constructors.
///
/// Keys are plain field names (`api_key`, `va_voice`, `region`, ...). Values are
/// scalars; `null` means "not set".
pub type ProviderOptions = Map<String, Value>;

/// Error taxonomy shared by all providers.
#[derive(Debug, Error)]
pub enum TTSError {
    /// Missing or invalid credential, voice id or other required parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A provider constructor failed while the factory was building it.
    #[error("Failed to create TTS provider '{provider}': {source}")]
    ProviderCreation {
        provider: String,
        #[source]
        source: Box<TTSError>,
    },

    /// Network failure, non-success response, malformed body or output write failure.
    #[error("{message}")]
    ApiError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The backend reported throttling. This is an API error as well.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// Seconds the backend asked us to wait, when it said so.
        retry_after: Option<u64>,
    },
}

impl TTSError {
    /// API error without an underlying cause.
    pub fn api(message: impl Into<String>) -> Self {
        Self::ApiError {
            message: message.into(),
            source: None,
        }
    }

    /// API error wrapping the underlying cause.
    pub fn api_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ApiError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::ProviderCreation { .. }
        )
    }

    /// True for every call-time failure, rate limiting included.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::ApiError { .. } | Self::RateLimited { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// The two speaking roles of a vision clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeakerRole {
    /// The interactive virtual agent ("IVA" lines).
    VirtualAgent,
    /// The person calling in ("Caller" lines).
    Caller,
}

impl std::fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VirtualAgent => write!(f, "va"),
            Self::Caller => write!(f, "caller"),
        }
    }
}

/// Default voice and locale for one speaking role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceProfile {
    pub voice: String,
    pub locale: String,
}

impl VoiceProfile {
    pub fn new(voice: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            locale: locale.into(),
        }
    }
}

/// Operations every TTS provider supports.
///
/// Optional features are separate traits (see [`super::features`]); a provider
/// that implements one overrides the matching `as_*` accessor so callers can
/// discover it from a trait object.
#[async_trait]
pub trait TTSProvider: Send + Sync {
    /// Constant provider identifier ("google", "azure", "aws", "elevenlabs").
    fn name(&self) -> &'static str;

    /// Capabilities built at construction. Never performs I/O.
    fn capabilities(&self) -> &TTSCapabilities;

    /// Update the recognised fields present in `options`.
    ///
    /// Unknown keys are ignored. When credentials or connection parameters
    /// change, the vendor client is recreated.
    fn configure(&mut self, options: &ProviderOptions) -> TTSResult<()>;

    /// Default voice and locale for a speaking role.
    fn voice_profile(&self, role: SpeakerRole) -> VoiceProfile;

    /// Synthesize `text` and return the audio in the provider's native format.
    ///
    /// When `output_file` is given the same bytes are also written there.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        locale: &str,
        rate: f64,
        output_file: Option<&Path>,
    ) -> TTSResult<Bytes>;

    fn as_streaming(&self) -> Option<&dyn StreamingSynthesis> {
        None
    }

    fn as_ssml(&self) -> Option<&dyn SsmlSynthesis> {
        None
    }

    fn as_custom_voice(&self) -> Option<&dyn CustomVoiceSynthesis> {
        None
    }

    fn as_audio_effects(&self) -> Option<&dyn AudioEffectsSynthesis> {
        None
    }

    fn as_volume_control(&self) -> Option<&dyn VolumeControlSynthesis> {
        None
    }
}

/// Boxed provider as handed out by the factory.
pub type BoxedTTS = Box<dyn TTSProvider>;

/// Persist synthesized audio, mapping I/O failures to the API error kind.
pub(crate) async fn write_output(path: &Path, audio: &[u8]) -> TTSResult<()> {
    tokio::fs::write(path, audio).await.map_err(|e| {
        TTSError::api_with_source(
            format!("Failed to write audio file {}: {e}", path.display()),
            e,
        )
    })?;

    debug!(path = %path.display(), bytes = audio.len(), "Wrote audio file");
    Ok(())
}

/// Read an option as a string. Scalars are rendered, `null` and nested values are skipped.
pub(crate) fn option_string(options: &ProviderOptions, key: &str) -> Option<String> {
    match options.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build a typed provider configuration from resolved options.
///
/// `null` entries are dropped first so serde defaults apply to them, unknown keys
/// are ignored.
pub(crate) fn options_into_config<T>(provider: &str, options: ProviderOptions) -> TTSResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let cleaned: Map<String, Value> = options
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect();

    serde_json::from_value(Value::Object(cleaned)).map_err(|e| {
        TTSError::InvalidConfiguration(format!("Invalid {provider} TTS configuration: {e}"))
    })
}

/// Apply the recognised keys of `options` on top of `current`.
///
/// Keys that are not fields of `T` and `null` values are ignored. The result
/// is re-validated by deserialization, so a value of the wrong type is a
/// configuration error and `current` is left untouched.
pub(crate) fn apply_options<T>(provider: &str, current: &T, options: &ProviderOptions) -> TTSResult<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let invalid =
        |e: serde_json::Error| TTSError::InvalidConfiguration(format!("Invalid {provider} TTS configuration: {e}"));

    let mut value = serde_json::to_value(current).map_err(invalid)?;
    if let Value::Object(fields) = &mut value {
        for (key, option) in options {
            if option.is_null() {
                continue;
            }
            if let Some(field) = fields.get_mut(key) {
                *field = option.clone();
            }
        }
    }

    serde_json::from_value(value).map_err(invalid)
}

/// Treat empty strings as missing, the way required credentials are checked.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[test]
    fn test_error_kinds() {
        let config = TTSError::InvalidConfiguration("missing key".into());
        assert!(config.is_configuration_error());
        assert!(!config.is_api_error());

        let wrapped = TTSError::ProviderCreation {
            provider: "google".into(),
            source: Box::new(config),
        };
        assert!(wrapped.is_configuration_error());
        assert!(wrapped.to_string().contains("google"));
        assert!(wrapped.to_string().contains("missing key"));

        let api = TTSError::api("boom");
        assert!(api.is_api_error());
        assert!(!api.is_rate_limited());

        let limited = TTSError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(60),
        };
        assert!(limited.is_api_error());
        assert!(limited.is_rate_limited());
        assert!(!limited.is_configuration_error());
    }

    #[test]
    fn test_api_error_keeps_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = TTSError::api_with_source("Failed to write audio file", io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_option_string() {
        let options = json!({
            "api_key": "k",
            "rate": 16000,
            "flag": true,
            "missing": null,
            "nested": {"a": 1}
        });
        let options = options.as_object().unwrap();

        assert_eq!(option_string(options, "api_key").as_deref(), Some("k"));
        assert_eq!(option_string(options, "rate").as_deref(), Some("16000"));
        assert_eq!(option_string(options, "flag").as_deref(), Some("true"));
        assert_eq!(option_string(options, "missing"), None);
        assert_eq!(option_string(options, "nested"), None);
        assert_eq!(option_string(options, "absent"), None);
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        api_key: Option<String>,
        voice: String,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                api_key: None,
                voice: "default-voice".into(),
            }
        }
    }

    #[test]
    fn test_options_into_config_drops_nulls() {
        let options = json!({"api_key": "k", "voice": null, "unknown": 1});
        let sample: Sample =
            options_into_config("sample", options.as_object().unwrap().clone()).unwrap();

        assert_eq!(sample.api_key.as_deref(), Some("k"));
        assert_eq!(sample.voice, "default-voice");
    }

    #[test]
    fn test_options_into_config_type_mismatch() {
        let options = json!({"voice": ["not", "a", "string"]});
        let result: TTSResult<Sample> =
            options_into_config("sample", options.as_object().unwrap().clone());

        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_apply_options_updates_known_fields_only() {
        let current = Sample {
            api_key: Some("old".into()),
            voice: "v1".into(),
        };
        let options = json!({"voice": "v2", "api_key": null, "region": "ignored"});

        let updated = apply_options("sample", &current, options.as_object().unwrap()).unwrap();
        assert_eq!(updated.api_key.as_deref(), Some("old"));
        assert_eq!(updated.voice, "v2");
    }

    #[test]
    fn test_apply_options_sets_optional_field() {
        let current = Sample::default();
        let options = json!({"api_key": "new"});

        let updated = apply_options("sample", &current, options.as_object().unwrap()).unwrap();
        assert_eq!(updated.api_key.as_deref(), Some("new"));
    }

    #[test]
    fn test_apply_options_type_mismatch() {
        let options = json!({"voice": 12});
        let result = apply_options("sample", &Sample::default(), options.as_object().unwrap());
        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(&Some("x".into())), Some("x"));
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&None), None);
    }
}

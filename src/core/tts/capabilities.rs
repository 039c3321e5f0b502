//! Provider capability descriptor.
//!
//! A [`TTSCapabilities`] value is built once by each provider and lets callers
//! probe features at runtime instead of branching on the provider name.

use serde::Serialize;

/// Feature flags and limits of one provider.
///
/// `None` for a numeric limit means the limit is undocumented or unbounded,
/// never zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TTSCapabilities {
    pub supports_streaming: bool,
    pub supports_ssml: bool,
    pub supports_custom_voices: bool,
    pub supported_audio_formats: Vec<String>,
    /// Maximum characters per request
    pub max_text_length: Option<usize>,
    pub max_requests_per_minute: Option<u32>,
    pub supports_pitch_control: bool,
    pub supports_rate_control: bool,
    pub supports_volume_control: bool,
    pub supports_phoneme_input: bool,
    /// Post-processing presets such as the telephony profile
    pub supports_audio_effects: bool,
    pub supports_multi_speaker: bool,
    pub requires_api_key: bool,
    pub supports_offline_mode: bool,
}

impl Default for TTSCapabilities {
    fn default() -> Self {
        Self {
            supports_streaming: false,
            supports_ssml: false,
            supports_custom_voices: false,
            supported_audio_formats: vec!["wav".to_string()],
            max_text_length: None,
            max_requests_per_minute: None,
            supports_pitch_control: true,
            supports_rate_control: true,
            supports_volume_control: false,
            supports_phoneme_input: false,
            supports_audio_effects: false,
            supports_multi_speaker: false,
            requires_api_key: true,
            supports_offline_mode: false,
        }
    }
}

impl TTSCapabilities {
    /// Look up a feature flag by name (case-insensitive).
    ///
    /// Unknown names return `false` so callers can probe features this
    /// descriptor does not know about yet.
    pub fn has_feature(&self, feature: &str) -> bool {
        match feature.to_lowercase().as_str() {
            "streaming" => self.supports_streaming,
            "ssml" => self.supports_ssml,
            "custom_voices" => self.supports_custom_voices,
            "pitch_control" => self.supports_pitch_control,
            "rate_control" => self.supports_rate_control,
            "volume_control" => self.supports_volume_control,
            "phoneme_input" => self.supports_phoneme_input,
            "audio_effects" => self.supports_audio_effects,
            "multi_speaker" => self.supports_multi_speaker,
            "offline_mode" => self.supports_offline_mode,
            _ => false,
        }
    }

    /// Whether `format` (e.g. "wav", "mp3") is listed as supported.
    pub fn supports_format(&self, format: &str) -> bool {
        self.supported_audio_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

impl std::fmt::Display for TTSCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut features = Vec::new();
        if self.supports_streaming {
            features.push("streaming");
        }
        if self.supports_ssml {
            features.push("SSML");
        }
        if self.supports_custom_voices {
            features.push("custom voices");
        }
        if self.supports_audio_effects {
            features.push("audio effects");
        }

        if features.is_empty() {
            write!(f, "TTSCapabilities(basic synthesis only)")
        } else {
            write!(f, "TTSCapabilities({})", features.join(", "))
        }
    }
}

/// Build a format list from string literals.
pub(crate) fn formats(list: &[&str]) -> Vec<String> {
    list.iter().map(|f| f.to_string()).collect()
}

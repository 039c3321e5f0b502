//! Text-to-speech provider layer.
//!
//! Every vendor integration implements [`TTSProvider`]. Optional behaviour
//! (streaming, SSML, custom voices, audio effects, volume) lives in separate
//! feature traits discovered through the provider's `as_*` accessors or
//! [`has_feature`]. Providers are built by name through [`TTSFactory`].

#[cfg(feature = "aws-polly")]
pub mod aws_polly;
#[cfg(feature = "azure")]
pub mod azure;
mod base;
mod capabilities;
#[cfg(feature = "elevenlabs")]
pub mod elevenlabs;
mod features;
#[cfg(feature = "google")]
pub mod google;
pub(crate) mod http;
mod registry;
pub mod ssml;

#[cfg(feature = "aws-polly")]
pub use aws_polly::{AwsPollyConfig, AwsPollyTTS, PollyEngine};
#[cfg(feature = "azure")]
pub use azure::{AzureTTS, AzureTTSConfig};
pub use base::{
    BoxError, BoxedTTS, ProviderOptions, SpeakerRole, TTSError, TTSProvider, TTSResult,
    VoiceProfile,
};
pub use capabilities::TTSCapabilities;
#[cfg(feature = "elevenlabs")]
pub use elevenlabs::{ElevenLabsConfig, ElevenLabsTTS};
pub use features::{
    AudioEffectsSynthesis, AudioStream, CustomVoice, CustomVoiceSynthesis, DEFAULT_CHUNK_SIZE,
    SsmlSynthesis, StreamingSynthesis, TTSFeature, VolumeControlSynthesis, has_feature,
    supported_features,
};
#[cfg(feature = "google")]
pub use google::{GoogleTTS, GoogleTTSConfig};
pub use registry::{ProviderConstructor, TTSFactory, create_tts_provider};

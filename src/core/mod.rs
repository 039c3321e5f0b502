pub mod tts;

pub use tts::{
    BoxedTTS, TTSCapabilities, TTSError, TTSFactory, TTSProvider, TTSResult, create_tts_provider,
};

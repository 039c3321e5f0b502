//! ElevenLabs Text-to-Speech provider module.
//!
//! Voices are addressed by account voice id rather than by name, so the
//! `voice` argument of every synthesis call is an id. The API picks the
//! language itself and has no speaking-rate control; `locale` and `rate` are
//! accepted and ignored. Audio comes back as MP3.

mod config;
mod provider;


pub use config::{
    DEFAULT_MODEL, DEFAULT_SIMILARITY_BOOST, DEFAULT_STABILITY, ELEVENLABS_API_URL,
    ElevenLabsConfig, MAX_TEXT_LENGTH,
};
pub use provider::ElevenLabsTTS;

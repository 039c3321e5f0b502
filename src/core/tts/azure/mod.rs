//! Azure Cognitive Services Text-to-Speech provider module.
//!
//! Uses the Speech service REST endpoint of the configured region. Every
//! request body is SSML: plain text is wrapped in `<speak><voice>` with the
//! speaking rate and volume expressed as prosody. Output is RIFF WAV,
//! 24 kHz 16-bit mono PCM by default.

mod config;
mod provider;


pub use config::{AzureTTSConfig, DEFAULT_OUTPUT_FORMAT, MAX_REQUESTS_PER_MINUTE};
pub use provider::AzureTTS;

pub mod config;
pub mod core;
pub mod dialog;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::TtsSettings;
pub use crate::core::*;
pub use dialog::{DialogError, DialogEvent, GeneratorOptions, SoundCue, VisionClipGenerator, parse_script};

//! Amazon Polly TTS provider module.
//!
//! Synthesis goes through the AWS SDK `SynthesizeSpeech` operation, which
//! handles request signing and the credential chain. Audio is requested as
//! 16 kHz signed 16-bit PCM; when the output path ends in `.wav` a canonical
//! WAV header is prepended so the clip can be concatenated with other WAVs.
//!
//! # Authentication
//!
//! AWS credentials can be provided via:
//! 1. `access_key_id` and `secret_access_key` in the `aws` config section
//! 2. Environment variables: `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
//! 3. AWS credentials file (`~/.aws/credentials`)
//! 4. IAM instance profile (for EC2/ECS/Lambda)
//!
//! Explicit keys are only used when both parts are present.
//!
//! # Features
//!
//! - SSML input, including rate and volume prosody
//! - Streaming of the SDK byte stream
//! - Engines: standard, neural (default), long-form, generative

mod config;
mod provider;


pub use config::{AwsPollyConfig, DEFAULT_SAMPLE_RATE, MAX_TEXT_LENGTH, PollyEngine};
pub use provider::AwsPollyTTS;

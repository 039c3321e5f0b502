//! Mock HTTP tests for providers built through the factory.
//!
//! Each test points a provider at a local wiremock server, so no credentials
//! or network access are needed.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test provider_mock_tests
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use serde_json::{Map, Value, json};
use serial_test::serial;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vision_clip::config::ENV_VAR_MAP;
use vision_clip::core::tts::{BoxedTTS, SpeakerRole, TTSError, create_tts_provider};

// ============================================================================
// Test Helpers
// ============================================================================

fn cleanup_env_vars() {
    for (_, var) in ENV_VAR_MAP {
        unsafe {
            std::env::remove_var(var);
        }
    }
}

fn overrides(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn elevenlabs_for(server: &MockServer) -> BoxedTTS {
    create_tts_provider(
        Some("elevenlabs"),
        None,
        overrides(json!({
            "elevenlabs.api_key": "xi-key",
            "elevenlabs.va_voice": "va-id",
            "elevenlabs.caller_voice": "caller-id",
            "elevenlabs.base_url": format!("{}/v1", server.uri()),
        })),
    )
    .unwrap()
}

// ============================================================================
// Google
// ============================================================================

#[tokio::test]
#[serial]
async fn test_google_synthesis_writes_decoded_audio() {
    cleanup_env_vars();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta1/text:synthesize"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"audioContent": BASE64.encode(b"audio data")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_tts_provider(
        Some("google"),
        None,
        overrides(json!({
            "google.api_key": "test-key",
            "google.endpoint": format!("{}/v1beta1/text:synthesize", server.uri()),
        })),
    )
    .unwrap();

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out.wav");
    let profile = provider.voice_profile(SpeakerRole::VirtualAgent);

    let audio = provider
        .synthesize("Hello", &profile.voice, &profile.locale, 1.0, Some(&out))
        .await
        .unwrap();

    assert_eq!(&audio[..], b"audio data");
    assert_eq!(std::fs::read(&out).unwrap(), b"audio data");
}

// ============================================================================
// Azure
// ============================================================================

#[tokio::test]
#[serial]
async fn test_azure_rate_markup_through_factory() {
    cleanup_env_vars();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("rate=\"150%\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_tts_provider(
        Some("azure"),
        None,
        overrides(json!({
            "azure.subscription_key": "k",
            "azure.endpoint": format!("{}/cognitiveservices/v1", server.uri()),
        })),
    )
    .unwrap();

    provider
        .synthesize("Faster", "en-US-JennyNeural", "en-US", 1.5, None)
        .await
        .unwrap();
}

// ============================================================================
// ElevenLabs
// ============================================================================

#[tokio::test]
#[serial]
async fn test_elevenlabs_rate_limit() {
    cleanup_env_vars();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/va-id"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let provider = elevenlabs_for(&server);
    let err = provider
        .synthesize("Hi", "va-id", "en-US", 1.0, None)
        .await
        .unwrap_err();

    assert!(matches!(err, TTSError::RateLimited { .. }));
    assert!(err.is_api_error());
    assert!(!err.is_configuration_error());
}

#[tokio::test]
#[serial]
async fn test_elevenlabs_stream_through_trait_object() {
    cleanup_env_vars();
    let server = MockServer::start().await;
    let audio = vec![7u8; 5000];

    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/caller-id/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio.clone()))
        .mount(&server)
        .await;

    let provider = elevenlabs_for(&server);
    let caller = provider.voice_profile(SpeakerRole::Caller);
    let streaming = provider.as_streaming().expect("elevenlabs streams");

    let chunks: Vec<_> = streaming
        .synthesize_stream("Hello", &caller.voice, &caller.locale, 1.0, 2048)
        .await
        .unwrap()
        .collect()
        .await;

    let mut total = 0;
    for chunk in chunks {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= 2048);
        total += chunk.len();
    }
    assert_eq!(total, audio.len());
}

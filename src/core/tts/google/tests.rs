//! Tests for the Google Cloud Text-to-Speech provider.

use super::*;
use crate::core::tts::{SpeakerRole, TTSError, TTSFeature, TTSProvider, has_feature, ssml};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn options(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn provider_for(server: &MockServer) -> GoogleTTS {
    GoogleTTS::from_options(options(json!({
        "api_key": "test-key",
        "endpoint": format!("{}/v1beta1/text:synthesize", server.uri()),
    })))
    .unwrap()
}

fn audio_response(audio: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"audioContent": BASE64.encode(audio)}))
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_missing_api_key_fails() {
    let result = GoogleTTS::from_options(Map::new());
    match result {
        Err(TTSError::InvalidConfiguration(msg)) => assert!(msg.contains("GOOGLE_API_KEY")),
        other => panic!("expected configuration error, got {:?}", other.err()),
    }
}

#[test]
fn test_empty_api_key_fails() {
    let result = GoogleTTS::from_options(options(json!({"api_key": ""})));
    assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
}

#[test]
fn test_defaults() {
    let provider = GoogleTTS::from_options(options(json!({"api_key": "k"}))).unwrap();

    assert_eq!(provider.name(), "google");
    assert_eq!(provider.config().endpoint, GOOGLE_TTS_URL);

    let va = provider.voice_profile(SpeakerRole::VirtualAgent);
    assert_eq!(va.voice, "en-US-Journey-O");
    assert_eq!(va.locale, "en-US");
    assert_eq!(
        provider.voice_profile(SpeakerRole::Caller).voice,
        "en-US-Journey-D"
    );
}

#[test]
fn test_capabilities_match_features() {
    let provider = GoogleTTS::from_options(options(json!({"api_key": "k"}))).unwrap();
    let caps = provider.capabilities();

    assert!(!caps.supports_streaming);
    assert!(caps.supports_audio_effects);
    assert_eq!(caps.max_text_length, Some(MAX_TEXT_LENGTH));

    for feature in TTSFeature::ALL {
        assert_eq!(
            caps.has_feature(feature.as_str()),
            has_feature(&provider, feature),
            "mismatch for {feature}"
        );
    }
    assert!(!has_feature(&provider, TTSFeature::Streaming));
}

#[test]
fn test_effects_profiles() {
    let provider = GoogleTTS::from_options(options(json!({"api_key": "k"}))).unwrap();
    let profiles = provider.as_audio_effects().unwrap().list_effects_profiles();

    assert_eq!(profiles.len(), 8);
    assert_eq!(profiles[0], DEFAULT_EFFECTS_PROFILE);
    assert!(profiles.contains(&"large-automotive-class-device".to_string()));
}

#[test]
fn test_configure() {
    let mut provider = GoogleTTS::from_options(options(json!({"api_key": "k"}))).unwrap();

    provider
        .configure(&options(json!({"va_voice": "en-GB-Neural2-A", "va_locale": "en-GB", "bogus": 1})))
        .unwrap();
    let va = provider.voice_profile(SpeakerRole::VirtualAgent);
    assert_eq!(va.voice, "en-GB-Neural2-A");
    assert_eq!(va.locale, "en-GB");

    let result = provider.configure(&options(json!({"api_key": "", "caller_voice": "x"})));
    assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    assert_eq!(provider.config().api_key.as_deref(), Some("k"));
    assert_eq!(provider.voice_profile(SpeakerRole::Caller).voice, "en-US-Journey-D");
}

// =============================================================================
// Synthesis against a mocked endpoint
// =============================================================================

#[tokio::test]
async fn test_synthesize_decodes_and_writes_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta1/text:synthesize"))
        .and(query_param("alt", "json"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "audioConfig": {
                "audioEncoding": "LINEAR16",
                "speakingRate": 1.0,
                "effectsProfileId": ["telephony-class-application"],
            },
            "input": {"text": "Hello there"},
            "voice": {"languageCode": "en-US", "name": "en-US-Journey-O"},
        })))
        .respond_with(audio_response(b"audio data"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out.wav");

    let audio = provider
        .synthesize("Hello there", "en-US-Journey-O", "en-US", 1.0, Some(&out))
        .await
        .unwrap();

    assert_eq!(&audio[..], b"audio data");
    assert_eq!(std::fs::read(&out).unwrap(), b"audio data");
}

#[tokio::test]
async fn test_rate_is_native() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "audioConfig": {"speakingRate": 1.5},
            "input": {"text": "Fast"},
        })))
        .respond_with(audio_response(b"x"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    provider
        .synthesize("Fast", "en-US-Journey-O", "en-US", 1.5, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ssml_input() {
    let server = MockServer::start().await;
    let markup = "<speak>Hello <break time=\"1s\"/></speak>";

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"input": {"ssml": markup}})))
        .respond_with(audio_response(b"ssml audio"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let audio = provider
        .as_ssml()
        .unwrap()
        .synthesize_ssml(markup, "en-US-Journey-O", "en-US", None)
        .await
        .unwrap();
    assert_eq!(&audio[..], b"ssml audio");
}

#[tokio::test]
async fn test_effects_profile_selection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(audio_response(b"fx"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let effects = provider.as_audio_effects().unwrap();

    effects
        .synthesize_with_effects("a", "v", "en-US", 1.0, Some("headphone-class-device"), None)
        .await
        .unwrap();
    effects
        .synthesize_with_effects("b", "v", "en-US", 1.0, None, None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        first["audioConfig"]["effectsProfileId"],
        json!(["headphone-class-device"])
    );

    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert!(second["audioConfig"].get("effectsProfileId").is_none());
}

#[tokio::test]
async fn test_volume_gain() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "audioConfig": {"volumeGainDb": ssml::volume_gain_db(2.0)},
        })))
        .respond_with(audio_response(b"loud"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    provider
        .as_volume_control()
        .unwrap()
        .synthesize_with_volume("Hi", "v", "en-US", 1.0, 2.0, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_keeps_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .synthesize("Hi", "v", "en-US", 1.0, None)
        .await
        .unwrap_err();

    assert!(err.is_api_error());
    assert!(!err.is_rate_limited());
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn test_rate_limited_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .synthesize("Hi", "v", "en-US", 1.0, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TTSError::RateLimited {
            retry_after: Some(12),
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .synthesize("Hi", "v", "en-US", 1.0, None)
        .await
        .unwrap_err();

    assert!(err.is_api_error());
    assert!(err.to_string().contains("Failed to parse Google TTS API response"));
}

#[tokio::test]
async fn test_output_write_failure_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(audio_response(b"audio"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("missing-dir").join("out.wav");

    let err = provider
        .synthesize("Hi", "v", "en-US", 1.0, Some(&out))
        .await
        .unwrap_err();
    assert!(err.is_api_error());
}

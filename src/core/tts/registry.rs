//! Provider registry.
//!
//! [`TTSFactory`] maps provider names to constructors. Construction goes
//! through the layered configuration in [`crate::config`]: the factory resolves
//! the settings, picks the provider section and hands it to the constructor.
//!
//! ```rust,ignore
//! let factory = TTSFactory::with_builtin_providers();
//! let provider = factory.create_provider(Some("google"), None, overrides)?;
//! let audio = provider.synthesize("Hello", "en-US-Journey-O", "en-US", 1.0, None).await?;
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::base::{BoxedTTS, ProviderOptions, TTSError, TTSResult};
use crate::config::TtsSettings;

/// Constructor stored in the registry
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderOptions) -> TTSResult<BoxedTTS> + Send + Sync>;

/// Override keys that steer resolution and never reach a provider.
const RESERVED_KEYS: [&str; 2] = ["provider", "config_file"];

/// Name to constructor registry for TTS providers.
pub struct TTSFactory {
    providers: RwLock<BTreeMap<String, ProviderConstructor>>,
}

impl TTSFactory {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry holding every provider compiled into the crate.
    pub fn with_builtin_providers() -> Self {
        let factory = Self::new();
        register_builtin_providers(&factory);
        factory
    }

    /// Register a constructor under `name`.
    ///
    /// Fails when the name is taken; use [`Self::unregister_provider`] first to
    /// replace an entry.
    pub fn register_provider<F>(&self, name: &str, constructor: F) -> TTSResult<()>
    where
        F: Fn(ProviderOptions) -> TTSResult<BoxedTTS> + Send + Sync + 'static,
    {
        let mut providers = self.providers.write();
        if providers.contains_key(name) {
            return Err(TTSError::InvalidConfiguration(format!(
                "Provider '{name}' is already registered"
            )));
        }

        providers.insert(name.to_string(), Arc::new(constructor));
        debug!(provider = name, "Registered TTS provider");
        Ok(())
    }

    /// Remove `name`; unknown names are ignored.
    pub fn unregister_provider(&self, name: &str) {
        if self.providers.write().remove(name).is_some() {
            debug!(provider = name, "Unregistered TTS provider");
        }
    }

    /// Registered names in sorted order.
    pub fn list_providers(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.providers.read().contains_key(name)
    }

    /// Resolve configuration and build a provider.
    ///
    /// # Arguments
    /// * `provider` - Provider name; falls back to the resolved `provider` key
    /// * `config_file` - Optional YAML configuration file
    /// * `overrides` - Highest-precedence values. Dotted keys address any
    ///   section; flat scalar keys are also passed to the selected provider.
    ///
    /// # Errors
    /// * [`TTSError::InvalidConfiguration`] if the provider is not registered
    /// * [`TTSError::ProviderCreation`] if its constructor fails
    pub fn create_provider(
        &self,
        provider: Option<&str>,
        config_file: Option<&Path>,
        overrides: Map<String, Value>,
    ) -> TTSResult<BoxedTTS> {
        let flat = flat_overrides(&overrides);
        let settings = TtsSettings::new(config_file, overrides);

        let name = provider
            .map(str::to_string)
            .unwrap_or_else(|| settings.provider_name());

        let constructor = self.providers.read().get(&name).cloned();
        let Some(constructor) = constructor else {
            let available = self.list_providers().join(", ");
            warn!(provider = %name, available = %available, "Unknown TTS provider requested");
            return Err(TTSError::InvalidConfiguration(format!(
                "TTS provider '{name}' is not registered. Available providers: {available}"
            )));
        };

        let mut options = settings.provider_config(&name);
        options.extend(flat);

        let instance = constructor(options).map_err(|source| TTSError::ProviderCreation {
            provider: name.clone(),
            source: Box::new(source),
        })?;

        info!(provider = %name, "Created TTS provider");
        Ok(instance)
    }
}

impl Default for TTSFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TTSFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TTSFactory")
            .field("providers", &self.list_providers())
            .finish()
    }
}

/// Build a provider with a fresh registry of the built-in providers.
pub fn create_tts_provider(
    provider: Option<&str>,
    config_file: Option<&Path>,
    overrides: Map<String, Value>,
) -> TTSResult<BoxedTTS> {
    TTSFactory::with_builtin_providers().create_provider(provider, config_file, overrides)
}

/// Flat, non-reserved, non-null scalar overrides.
fn flat_overrides(overrides: &Map<String, Value>) -> Map<String, Value> {
    overrides
        .iter()
        .filter(|(key, value)| {
            !key.contains('.')
                && !RESERVED_KEYS.contains(&key.as_str())
                && !value.is_null()
                && !value.is_object()
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn register_builtin_providers(factory: &TTSFactory) {
    let mut results: Vec<(&str, TTSResult<()>)> = Vec::new();

    #[cfg(feature = "google")]
    results.push((
        "google",
        factory.register_provider("google", |options| {
            Ok(Box::new(super::google::GoogleTTS::from_options(options)?) as BoxedTTS)
        }),
    ));

    #[cfg(feature = "azure")]
    results.push((
        "azure",
        factory.register_provider("azure", |options| {
            Ok(Box::new(super::azure::AzureTTS::from_options(options)?) as BoxedTTS)
        }),
    ));

    #[cfg(feature = "elevenlabs")]
    results.push((
        "elevenlabs",
        factory.register_provider("elevenlabs", |options| {
            Ok(Box::new(super::elevenlabs::ElevenLabsTTS::from_options(options)?) as BoxedTTS)
        }),
    ));

    #[cfg(feature = "aws-polly")]
    results.push((
        "aws",
        factory.register_provider("aws", |options| {
            Ok(Box::new(super::aws_polly::AwsPollyTTS::from_options(options)?) as BoxedTTS)
        }),
    ));

    for (name, result) in results {
        if let Err(e) = result {
            warn!(provider = name, error = %e, "Failed to register built-in TTS provider");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::{SpeakerRole, TTSCapabilities, TTSProvider, VoiceProfile};
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::path::Path;

    struct EchoProvider {
        options: ProviderOptions,
        capabilities: TTSCapabilities,
    }

    #[async_trait]
    impl TTSProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn capabilities(&self) -> &TTSCapabilities {
            &self.capabilities
        }

        fn configure(&mut self, options: &ProviderOptions) -> TTSResult<()> {
            self.options.extend(options.clone());
            Ok(())
        }

        fn voice_profile(&self, _role: SpeakerRole) -> VoiceProfile {
            let voice = self
                .options
                .get("va_voice")
                .and_then(Value::as_str)
                .unwrap_or("none");
            VoiceProfile::new(voice, "en-US")
        }

        async fn synthesize(
            &self,
            text: &str,
            _voice: &str,
            _locale: &str,
            _rate: f64,
            _output_file: Option<&Path>,
        ) -> TTSResult<Bytes> {
            Ok(Bytes::copy_from_slice(text.as_bytes()))
        }
    }

    fn echo_constructor(options: ProviderOptions) -> TTSResult<BoxedTTS> {
        Ok(Box::new(EchoProvider {
            options,
            capabilities: TTSCapabilities::default(),
        }))
    }

    #[test]
    fn test_register_and_list_sorted() {
        let factory = TTSFactory::new();
        factory.register_provider("zeta", echo_constructor).unwrap();
        factory.register_provider("alpha", echo_constructor).unwrap();

        assert_eq!(factory.list_providers(), vec!["alpha", "zeta"]);
        assert!(factory.is_registered("alpha"));
        assert!(!factory.is_registered("beta"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let factory = TTSFactory::new();
        factory.register_provider("echo", echo_constructor).unwrap();

        let err = factory
            .register_provider("echo", echo_constructor)
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("already registered"));

        factory.unregister_provider("echo");
        assert!(!factory.is_registered("echo"));
        factory.register_provider("echo", echo_constructor).unwrap();

        // unknown names are a no-op
        factory.unregister_provider("missing");
    }

    #[test]
    fn test_flat_overrides_filter() {
        let overrides = json!({
            "provider": "echo",
            "config_file": "x.yaml",
            "google.api_key": "k",
            "va_voice": "flat",
            "caller_voice": null,
            "echo": {"va_voice": "nested"},
        });
        let flat = flat_overrides(overrides.as_object().unwrap());

        assert_eq!(flat.len(), 1);
        assert_eq!(flat["va_voice"], json!("flat"));
    }

    #[test]
    fn test_constructor_error_is_wrapped() {
        let factory = TTSFactory::new();
        factory
            .register_provider("broken", |_options| {
                Err(TTSError::InvalidConfiguration("missing api key".to_string()))
            })
            .unwrap();

        let result = factory.create_provider(Some("broken"), None, Map::new());
        match result {
            Err(err @ TTSError::ProviderCreation { .. }) => {
                assert!(err.is_configuration_error());
                let message = err.to_string();
                assert!(message.contains("broken"));
                assert!(message.contains("missing api key"));
            }
            Err(other) => panic!("expected ProviderCreation, got {other}"),
            Ok(_) => panic!("expected ProviderCreation"),
        }
    }

    #[test]
    fn test_unknown_provider_lists_available() {
        let factory = TTSFactory::new();
        factory.register_provider("echo", echo_constructor).unwrap();
        factory.register_provider("alpha", echo_constructor).unwrap();

        let result = factory.create_provider(Some("nope"), None, Map::new());
        let message = match result {
            Err(err) => {
                assert!(err.is_configuration_error());
                err.to_string()
            }
            Ok(_) => panic!("expected an unknown provider error"),
        };
        assert!(message.contains("'nope' is not registered"));
        assert!(message.contains("alpha, echo"));
    }

    #[test]
    fn test_builtin_providers_registered() {
        let factory = TTSFactory::with_builtin_providers();
        let names = factory.list_providers();

        #[cfg(feature = "google")]
        assert!(names.contains(&"google".to_string()));
        #[cfg(feature = "azure")]
        assert!(names.contains(&"azure".to_string()));
        #[cfg(feature = "elevenlabs")]
        assert!(names.contains(&"elevenlabs".to_string()));
        #[cfg(feature = "aws-polly")]
        assert!(names.contains(&"aws".to_string()));

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}

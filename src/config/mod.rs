//! Layered TTS configuration.
//!
//! Four layers are deep-merged, lowest precedence first:
//!
//! 1. built-in defaults ([`defaults`])
//! 2. an optional YAML file ([`YamlLayer`])
//! 3. environment variables ([`ENV_VAR_MAP`])
//! 4. explicit overrides passed by the caller
//!
//! A `null` in a higher layer never hides a value below it. Any other value,
//! the empty string included, replaces it.

mod yaml;

pub use yaml::YamlLayer;

use once_cell::sync::OnceCell;
use serde_json::{Map, Value, json};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider used when neither the caller nor any layer names one.
pub const DEFAULT_PROVIDER: &str = "google";

/// Dotted configuration key to environment variable.
pub const ENV_VAR_MAP: &[(&str, &str)] = &[
    ("provider", "TTS_PROVIDER"),
    // Google
    ("google.api_key", "GOOGLE_API_KEY"),
    ("google.va_voice", "VA_VOICE"),
    ("google.va_locale", "VA_LOCALE"),
    ("google.caller_voice", "CALLER_VOICE"),
    ("google.caller_locale", "CALLER_LOCALE"),
    // Azure
    ("azure.subscription_key", "AZURE_SUBSCRIPTION_KEY"),
    ("azure.region", "AZURE_REGION"),
    ("azure.va_voice", "AZURE_VA_VOICE"),
    ("azure.caller_voice", "AZURE_CALLER_VOICE"),
    // ElevenLabs
    ("elevenlabs.api_key", "ELEVENLABS_API_KEY"),
    ("elevenlabs.va_voice", "ELEVENLABS_VA_VOICE"),
    ("elevenlabs.caller_voice", "ELEVENLABS_CALLER_VOICE"),
    ("elevenlabs.model", "ELEVENLABS_MODEL"),
    // AWS Polly
    ("aws.access_key_id", "AWS_ACCESS_KEY_ID"),
    ("aws.secret_access_key", "AWS_SECRET_ACCESS_KEY"),
    ("aws.region", "AWS_REGION"),
    ("aws.va_voice", "AWS_VA_VOICE"),
    ("aws.caller_voice", "AWS_CALLER_VOICE"),
];

/// Built-in defaults, the lowest layer.
pub fn defaults() -> Value {
    json!({
        "provider": DEFAULT_PROVIDER,
        "google": {
            "api_key": null,
            "va_voice": "en-US-Journey-O",
            "va_locale": "en-US",
            "caller_voice": "en-US-Journey-D",
            "caller_locale": "en-US",
        },
        "azure": {
            "subscription_key": null,
            "region": "eastus",
            "va_voice": "en-US-JennyNeural",
            "va_locale": "en-US",
            "caller_voice": "en-US-GuyNeural",
            "caller_locale": "en-US",
        },
        "elevenlabs": {
            "api_key": null,
            "va_voice": null,
            "caller_voice": null,
            "model": "eleven_monolingual_v1",
        },
        "aws": {
            "access_key_id": null,
            "secret_access_key": null,
            "region": "us-east-1",
            "va_voice": "Joanna",
            "caller_voice": "Matthew",
            "va_locale": "en-US",
            "caller_locale": "en-US",
        },
    })
}

/// Resolved TTS configuration.
///
/// The merged tree is built on first read and cached for the life of the
/// value, so environment changes after that point are not observed.
#[derive(Debug, Default)]
pub struct TtsSettings {
    config_file: Option<PathBuf>,
    overrides: Map<String, Value>,
    merged: OnceCell<Value>,
}

impl TtsSettings {
    /// Create a resolver.
    ///
    /// # Arguments
    /// * `config_file` - Optional YAML file; missing files are skipped
    /// * `overrides` - Highest-precedence values. Keys may be dotted
    ///   (`"google.api_key"`) or nested mappings.
    pub fn new(config_file: Option<&Path>, overrides: Map<String, Value>) -> Self {
        Self {
            config_file: config_file.map(Path::to_path_buf),
            overrides: expand_dotted(overrides),
            merged: OnceCell::new(),
        }
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    fn tree(&self) -> &Value {
        self.merged.get_or_init(|| self.build())
    }

    fn build(&self) -> Value {
        let mut config = defaults();

        if let Some(path) = &self.config_file {
            deep_merge(&mut config, Value::Object(YamlLayer::load_or_empty(path)));
        }

        deep_merge(&mut config, Value::Object(env_layer()));
        deep_merge(&mut config, Value::Object(self.overrides.clone()));

        let provider = config
            .get("provider")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROVIDER);
        debug!(
            config_file = ?self.config_file,
            provider = provider,
            "Resolved TTS configuration"
        );

        config
    }

    /// Value at a dotted key. Absent and `null` both read as `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = self.tree();
        for segment in key.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        (!current.is_null()).then_some(current)
    }

    /// Value at a dotted key, or `default` when absent or `null`.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Scalar at a dotted key rendered as a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Name of the configured provider.
    pub fn provider_name(&self) -> String {
        self.get_str("provider")
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    /// The full section for one provider, empty when there is none.
    pub fn provider_config(&self, provider: &str) -> Map<String, Value> {
        self.tree()
            .get(provider)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the whole merged tree.
    pub fn to_value(&self) -> Value {
        self.tree().clone()
    }
}

/// Read the environment table into a nested layer.
fn env_layer() -> Map<String, Value> {
    let mut layer = Map::new();
    for (key, var) in ENV_VAR_MAP {
        if let Ok(value) = env::var(var) {
            insert_dotted(&mut layer, key, Value::String(value));
        }
    }
    layer
}

/// Deep-merge `overlay` into `base`.
///
/// Mappings on both sides are merged key by key. Otherwise the overlay wins,
/// unless it is `null`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                if value.is_object() {
                    if let Some(existing) = base_map.get_mut(&key) {
                        if existing.is_object() {
                            deep_merge(existing, value);
                            continue;
                        }
                    }
                }
                base_map.insert(key, value);
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

/// Expand `"a.b": v` entries into `{"a": {"b": v}}`.
///
/// Nested mappings and plain keys pass through; expanded entries are merged
/// into whatever already sits at their parent key.
pub fn expand_dotted(map: Map<String, Value>) -> Map<String, Value> {
    let mut expanded = Map::new();
    let mut dotted = Vec::new();

    for (key, value) in map {
        if key.contains('.') {
            dotted.push((key, value));
        } else {
            expanded.insert(key, value);
        }
    }

    for (key, value) in dotted {
        insert_dotted(&mut expanded, &key, value);
    }

    expanded
}

fn insert_dotted(map: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments = key.split('.').peekable();
    let mut current = map;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(next) => next,
            _ => return,
        };
    }
}

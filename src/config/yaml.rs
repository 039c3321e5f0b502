use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

/// YAML configuration file layer
///
/// The file holds a top-level `provider` key and one mapping per provider.
/// Values are kept untyped; each provider deserializes its own section.
///
/// # Example YAML structure
/// ```yaml
/// provider: elevenlabs
///
/// google:
///   api_key: "your-google-key"
///   va_voice: "en-US-Journey-O"
///
/// elevenlabs:
///   api_key: "your-elevenlabs-key"
///   va_voice: "21m00Tcm4TlvDq8ikWAM"
///   caller_voice: "AZnzlk1XvdvUeBnXmlld"
///   model: "eleven_monolingual_v1"
///
/// aws:
///   region: "us-west-2"
///   va_voice: "Joanna"
///   engine: "neural"
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YamlLayer {
    pub values: Map<String, Value>,
}

impl YamlLayer {
    /// Load and parse a YAML configuration file.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - The document is not a mapping
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        Self::parse(&contents)
    }

    /// Parse YAML text. An empty document is an empty layer.
    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: Value = serde_yaml::from_str(contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        match document {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(format!(
                "Failed to parse YAML config: expected a mapping at the top level, found {}",
                value_kind(&other)
            )
            .into()),
        }
    }

    /// Load the file layer the resolver merges.
    ///
    /// A missing or unreadable file contributes nothing. A file that exists but
    /// does not parse to a mapping is reported with a warning and contributes
    /// nothing either.
    pub fn load_or_empty(path: &Path) -> Map<String, Value> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Config file not loaded");
                return Map::new();
            }
        };

        match Self::parse(&contents) {
            Ok(layer) => {
                debug!(path = %path.display(), keys = layer.values.len(), "Loaded config file");
                layer.values
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config file, ignoring it");
                Map::new()
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

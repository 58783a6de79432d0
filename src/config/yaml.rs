use std::path::Path;

use serde::Deserialize;

use super::{ConfigError, SpeechConfig};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Environment
/// variables override any values specified here.
///
/// # Example YAML structure
/// ```yaml
/// tencent:
///   app_id: "1250000000"
///   secret_id: "AKID..."
///   secret_key: "..."
///   tts_url: "https://tts.cloud.tencent.com/stream"
///   asr_url: "wss://asr.cloud.tencent.com/asr/v2"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct YamlConfig {
    #[serde(default)]
    pub tencent: Option<TencentYamlConfig>,
}

/// `tencent:` section
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct TencentYamlConfig {
    /// Accepts either a string or a number in the file.
    #[serde(default, deserialize_with = "string_or_number")]
    pub app_id: Option<String>,
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
    pub tts_url: Option<String>,
    pub asr_url: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

impl SpeechConfig {
    /// Load configuration from a YAML file with environment overrides
    ///
    /// No env file is read here; only variables already present in the
    /// process environment override the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = YamlConfig::from_file(path)?;
        Self::from_lookup(|key| std::env::var(key).ok(), yaml.tencent.as_ref())
    }
}

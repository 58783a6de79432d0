//! Configuration for the Tencent speech clients
//!
//! Credentials come from environment variables, an env file such as
//! `.env.tencent`, or a YAML file. Priority: process environment > env file
//! or YAML values. Everything is resolved into an explicit [`SpeechConfig`]
//! that is passed to the clients; nothing reads the environment later.
//!
//! # Modules
//! - `env`: environment variable and env file loading
//! - `yaml`: YAML configuration file loading
//! - `utils`: parsing helpers shared by the loaders
//!
//! # Example
//! ```rust,no_run
//! use cloud_speech::config::SpeechConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from `.env.tencent`, letting real environment variables win
//! let config = SpeechConfig::from_env_file(".env.tencent")?;
//!
//! // Or load from YAML with environment overrides
//! let config = SpeechConfig::from_file("speech.yaml")?;
//! println!("App id {}", config.credential.app_id);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

mod env;
pub(crate) mod utils;
mod yaml;

pub use env::{
    DEFAULT_ENV_FILE, ENV_APP_ID, ENV_ASR_URL, ENV_SECRET_ID, ENV_SECRET_KEY, ENV_TTS_URL,
};
pub use yaml::{TencentYamlConfig, YamlConfig};

use crate::core::providers::tencent::TencentCredential;
use crate::core::stt::TencentAsrConfig;
use crate::core::tts::TencentTTSConfig;
use utils::non_empty;

/// Configuration errors. All of them are raised before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Resolved configuration for the Tencent speech clients.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub credential: TencentCredential,
    /// Override for the streaming TTS endpoint.
    pub tts_url: Option<String>,
    /// Override for the real-time ASR endpoint (without the app id segment).
    pub asr_url: Option<String>,
}

impl SpeechConfig {
    /// Resolve the configuration from a key lookup, falling back to YAML
    /// values for keys the lookup does not provide.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F, yaml: Option<&TencentYamlConfig>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |key: &str, fallback: Option<&String>| -> Option<String> {
            non_empty(lookup(key)).or_else(|| non_empty(fallback.cloned()))
        };

        let app_id = resolve(ENV_APP_ID, yaml.and_then(|y| y.app_id.as_ref()))
            .ok_or(ConfigError::Missing(ENV_APP_ID))?;
        let secret_id = resolve(ENV_SECRET_ID, yaml.and_then(|y| y.secret_id.as_ref()))
            .ok_or(ConfigError::Missing(ENV_SECRET_ID))?;
        let secret_key = resolve(ENV_SECRET_KEY, yaml.and_then(|y| y.secret_key.as_ref()))
            .ok_or(ConfigError::Missing(ENV_SECRET_KEY))?;

        let app_id = app_id.trim().to_string();
        match app_id.parse::<i64>() {
            Ok(value) if value > 0 => {}
            _ => {
                return Err(ConfigError::Invalid {
                    key: ENV_APP_ID,
                    reason: format!("expected a positive integer, got {app_id:?}"),
                });
            }
        }

        let tts_url = resolve(ENV_TTS_URL, yaml.and_then(|y| y.tts_url.as_ref()));
        let asr_url = resolve(ENV_ASR_URL, yaml.and_then(|y| y.asr_url.as_ref()));
        for (key, url) in [(ENV_TTS_URL, &tts_url), (ENV_ASR_URL, &asr_url)] {
            if let Some(url) = url {
                url::Url::parse(url).map_err(|e| ConfigError::Invalid {
                    key,
                    reason: format!("{url:?} is not a valid URL: {e}"),
                })?;
            }
        }

        Ok(Self {
            credential: TencentCredential::new(app_id, secret_id.trim(), secret_key.trim()),
            tts_url,
            asr_url,
        })
    }

    /// Shared handle to the credential for the clients.
    pub fn credential(&self) -> Arc<TencentCredential> {
        Arc::new(self.credential.clone())
    }

    /// TTS settings with the endpoint override applied.
    pub fn tts_config(&self) -> TencentTTSConfig {
        match &self.tts_url {
            Some(url) => TencentTTSConfig::default().with_url(url.as_str()),
            None => TencentTTSConfig::default(),
        }
    }

    /// ASR transport settings with the endpoint override applied.
    pub fn asr_config(&self) -> TencentAsrConfig {
        match &self.asr_url {
            Some(url) => TencentAsrConfig::default().with_base_url(url.as_str()),
            None => TencentAsrConfig::default(),
        }
    }
}

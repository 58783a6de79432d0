use std::collections::HashMap;
use std::env;
use std::path::Path;

use tracing::debug;

use super::{ConfigError, SpeechConfig};

/// Application id (integer) of the speech service.
pub const ENV_APP_ID: &str = "TENCENT_SPEECH_APPID";
pub const ENV_SECRET_ID: &str = "TENCENT_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "TENCENT_SECRET_KEY";
/// Optional streaming TTS endpoint override.
pub const ENV_TTS_URL: &str = "TENCENT_TTS_URL";
/// Optional real-time ASR endpoint override.
pub const ENV_ASR_URL: &str = "TENCENT_ASR_URL";

/// Env file read by [`SpeechConfig::from_env`] when present.
pub const DEFAULT_ENV_FILE: &str = ".env.tencent";

fn process_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl SpeechConfig {
    /// Load configuration from environment variables
    ///
    /// Also loads `.env.tencent` from the working directory if it exists,
    /// without overriding variables that are already set.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::from_filename(DEFAULT_ENV_FILE).is_ok() {
            debug!("Loaded environment from {}", DEFAULT_ENV_FILE);
        }
        Self::from_lookup(process_var, None)
    }

    /// Load configuration from an env file
    ///
    /// The file is parsed without touching the process environment. Variables
    /// that are set in the process environment take precedence over the file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if a
    /// required setting is missing or malformed.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let entries = dotenvy::from_path_iter(path).map_err(|e| match e {
            dotenvy::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => ConfigError::EnvFile(other),
        })?;

        let mut values = HashMap::new();
        for entry in entries {
            let (key, value) = entry?;
            values.insert(key, value);
        }
        debug!("Read {} entries from {}", values.len(), path.display());

        Self::from_lookup(
            |key| process_var(key).or_else(|| values.get(key).cloned()),
            None,
        )
    }
}

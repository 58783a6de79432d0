//! Tencent streaming TTS request configuration.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::core::providers::tencent::{RequestParameters, TencentCredential};
use crate::core::tts::base::{TTSError, TTSResult};

// =============================================================================
// Constants
// =============================================================================

/// Tencent streaming TTS endpoint.
pub const TENCENT_TTS_URL: &str = "https://tts.cloud.tencent.com/stream";

/// Request action understood by the streaming endpoint.
pub const TTS_ACTION: &str = "TextToStreamAudio";

/// Default voice.
pub const DEFAULT_VOICE_TYPE: i64 = 1009;

/// Sample rates the endpoint can produce.
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [8000, 16000];

// =============================================================================
// Configuration
// =============================================================================

/// Synthesis parameters for one Tencent TTS provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TencentTTSConfig {
    pub url: String,
    pub voice_type: i64,
    /// Loudness, 0 to 10.
    pub volume: i64,
    /// Speaking rate, -2 (slowest) to 2 (fastest).
    pub speed: i64,
    pub sample_rate: u32,
    pub codec: String,
    pub model_type: i64,
    /// 1 Mandarin, 2 English.
    pub primary_language: i64,
    pub project_id: i64,
    pub session_id: String,
    /// Lifetime of a signature, in seconds.
    pub expiry_secs: u64,
    #[serde(with = "crate::config::utils::duration_secs")]
    pub request_timeout: Duration,
}

impl Default for TencentTTSConfig {
    fn default() -> Self {
        Self {
            url: TENCENT_TTS_URL.to_string(),
            voice_type: DEFAULT_VOICE_TYPE,
            volume: 5,
            speed: 0,
            sample_rate: 16000,
            codec: "pcm".to_string(),
            model_type: 0,
            primary_language: 1,
            project_id: 0,
            session_id: "12345678".to_string(),
            expiry_secs: 3600,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl TencentTTSConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_voice_type(mut self, voice_type: i64) -> Self {
        self.voice_type = voice_type;
        self
    }

    /// Check ranges the service enforces.
    pub fn validate(&self) -> TTSResult<()> {
        if !(0..=10).contains(&self.volume) {
            return Err(TTSError::InvalidConfiguration(format!(
                "volume must be between 0 and 10, got {}",
                self.volume
            )));
        }
        if !(-2..=2).contains(&self.speed) {
            return Err(TTSError::InvalidConfiguration(format!(
                "speed must be between -2 and 2, got {}",
                self.speed
            )));
        }
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(TTSError::InvalidConfiguration(format!(
                "sample rate {} is not supported, expected one of {:?}",
                self.sample_rate, SUPPORTED_SAMPLE_RATES
            )));
        }
        if self.codec != "pcm" {
            return Err(TTSError::InvalidConfiguration(format!(
                "codec {} is not supported, only pcm can be decoded",
                self.codec
            )));
        }
        Ok(())
    }

    /// The signed request body for `text` issued at `now`.
    pub fn build_parameters(
        &self,
        credential: &TencentCredential,
        text: &str,
        now: SystemTime,
    ) -> TTSResult<RequestParameters> {
        let app_id = credential.app_id_number().ok_or_else(|| {
            TTSError::InvalidConfiguration(format!(
                "app id must be an integer, got {:?}",
                credential.app_id
            ))
        })?;

        Ok(RequestParameters::new()
            .with("Action", TTS_ACTION)
            .with("AppId", app_id)
            .with("Codec", self.codec.as_str())
            .with("Expired", now + Duration::from_secs(self.expiry_secs))
            .with("ModelType", self.model_type)
            .with("PrimaryLanguage", self.primary_language)
            .with("ProjectId", self.project_id)
            .with("SampleRate", self.sample_rate)
            .with("SecretId", credential.secret_id.as_str())
            .with("SessionId", self.session_id.as_str())
            .with("Speed", self.speed)
            .with("Text", text)
            .with("Timestamp", now)
            .with("VoiceType", self.voice_type)
            .with("Volume", self.volume))
    }
}

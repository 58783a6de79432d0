//! Tencent real-time ASR endpoint configuration and URL signing.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::core::providers::tencent::{RequestParameters, Signer, TencentCredential, signing_target};
use crate::core::stt::base::{RecognitionRequest, STTError};

// =============================================================================
// Constants
// =============================================================================

/// Default real-time ASR WebSocket endpoint. The app id is appended as the
/// last path segment.
pub const DEFAULT_ASR_URL: &str = "wss://asr.cloud.tencent.com/asr/v2";

/// Lifetime of a signed URL, in seconds.
pub const DEFAULT_SIGNATURE_EXPIRY_SECS: u64 = 86400;

// =============================================================================
// Configuration
// =============================================================================

/// Transport settings for the Tencent real-time ASR service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TencentAsrConfig {
    /// Endpoint without the app id segment.
    pub base_url: String,
    /// Time allowed for the WebSocket connect.
    #[serde(with = "crate::config::utils::duration_secs")]
    pub connect_timeout: Duration,
    /// Time allowed for the handshake frame after connecting.
    #[serde(with = "crate::config::utils::duration_secs")]
    pub handshake_timeout: Duration,
    /// Idle limit between inbound frames once streaming.
    #[serde(with = "crate::config::utils::duration_secs")]
    pub message_timeout: Duration,
    pub signature_expiry_secs: u64,
    /// Capacity of the outbound audio queue.
    pub command_buffer: usize,
}

impl Default for TencentAsrConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ASR_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
            message_timeout: Duration::from_secs(60),
            signature_expiry_secs: DEFAULT_SIGNATURE_EXPIRY_SECS,
            command_buffer: 64,
        }
    }
}

impl TencentAsrConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query parameters covered by the signature.
    pub fn build_parameters(
        &self,
        credential: &TencentCredential,
        request: &RecognitionRequest,
        now: SystemTime,
        nonce: u32,
    ) -> RequestParameters {
        let mut params = RequestParameters::new()
            .with("secretid", credential.secret_id.as_str())
            .with("timestamp", now)
            .with("expired", now + Duration::from_secs(self.signature_expiry_secs))
            .with("nonce", nonce)
            .with("engine_model_type", request.engine_model_type.as_str())
            .with("voice_id", request.voice_id.as_str())
            .with("voice_format", request.voice_format.code())
            .with("needvad", i64::from(request.need_vad))
            .with("filter_dirty", request.filter_dirty)
            .with("filter_modal", request.filter_modal)
            .with("filter_punc", request.filter_punc)
            .with("convert_num_mode", request.convert_num_mode)
            .with("word_info", request.word_info);

        if let Some(hotword_id) = &request.hotword_id {
            params.insert("hotword_id", hotword_id.as_str());
        }
        if let Some(silence) = request.vad_silence_time {
            params.insert("vad_silence_time", silence);
        }
        params
    }

    /// Build the signed WebSocket URL for one session.
    ///
    /// The signature covers `host/path?query` with an empty method and is
    /// appended URL-encoded as the final `signature` parameter.
    pub fn build_url(
        &self,
        credential: &TencentCredential,
        request: &RecognitionRequest,
        now: SystemTime,
        nonce: u32,
    ) -> Result<String, STTError> {
        if credential.app_id.trim().is_empty() {
            return Err(STTError::ConfigurationError(
                "app id is required".to_string(),
            ));
        }

        let endpoint = format!("{}/{}", self.base_url.trim_end_matches('/'), credential.app_id);
        let parsed = url::Url::parse(&endpoint).map_err(|e| {
            STTError::ConfigurationError(format!("Invalid ASR endpoint {endpoint}: {e}"))
        })?;
        let target = signing_target(&parsed).ok_or_else(|| {
            STTError::ConfigurationError(format!("ASR endpoint has no host: {endpoint}"))
        })?;

        let params = self.build_parameters(credential, request, now, nonce);
        let signature = Signer::new(credential.secret_key.as_str()).sign("", &target, &params);

        Ok(format!(
            "{}://{}?{}&signature={}",
            parsed.scheme(),
            target,
            params.to_url_query(),
            signature.url_encoded()
        ))
    }
}

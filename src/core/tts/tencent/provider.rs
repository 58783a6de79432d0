//! Tencent streaming TTS provider.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://tts.cloud.tencent.com/stream`
//! - Body: JSON parameter map (see [`TencentTTSConfig::build_parameters`])
//! - Auth: `Authorization` header carrying the base64 HMAC-SHA1 signature of
//!   `POST` + `host/path` + `?` + sorted `key=value` pairs
//! - Output: raw little-endian 16-bit PCM, mono
//!
//! Errors come back with a 2xx status and a JSON body instead of audio, so
//! every body is inspected before it is decoded.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use serde::Deserialize;
use tracing::{debug, error, info};

use super::config::TencentTTSConfig;
use crate::core::audio::AudioSampleBuffer;
use crate::core::providers::tencent::{RequestParameters, Signature, Signer, TencentCredential, signing_target};
use crate::core::tts::base::{TTSError, TTSResult};

/// Marker the service places in error bodies.
const ERROR_MARKER: &[u8] = b"Error";

// =============================================================================
// Signed Request
// =============================================================================

/// A request body together with the signature that authorizes it.
///
/// Bound to one attempt: the body carries a timestamp and an expiry.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: String,
    pub body: RequestParameters,
    pub authorization: Signature,
}

// =============================================================================
// Error Body
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "Response")]
    response: ErrorResponse,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "Error")]
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// Decide whether a response body is audio or a service error, and decode it.
///
/// Checked in order: transport status, a structured `Response.Error` object,
/// then the bare `Error` marker anywhere in the body. Only a body that passes
/// all three is decoded as PCM16LE.
pub fn validate_response(
    status: u16,
    body: &[u8],
    sample_rate: u32,
) -> TTSResult<AudioSampleBuffer> {
    if !(200..300).contains(&status) {
        return Err(TTSError::ServiceError {
            code: status.to_string(),
            message: String::from_utf8_lossy(body).into_owned(),
        });
    }

    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        return Err(TTSError::ServiceError {
            code: envelope.response.error.code,
            message: envelope.response.error.message,
        });
    }

    if body.windows(ERROR_MARKER.len()).any(|w| w == ERROR_MARKER) {
        return Err(TTSError::ServiceError {
            code: "Error".to_string(),
            message: String::from_utf8_lossy(body).into_owned(),
        });
    }

    Ok(AudioSampleBuffer::from_pcm16le(body, 1, sample_rate)?)
}

// =============================================================================
// Tencent TTS Provider
// =============================================================================

/// Tencent streaming TTS client.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cloud_speech::core::providers::tencent::TencentCredential;
/// use cloud_speech::core::tts::{TencentTTS, TencentTTSConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let credential = Arc::new(TencentCredential::new("1250000000", "secret-id", "secret-key"));
/// let tts = TencentTTS::new(credential, TencentTTSConfig::default())?;
/// tts.synthesize_to_file("Hello World!", "tencent_tts.wav").await?;
/// # Ok(())
/// # }
/// ```
pub struct TencentTTS {
    config: TencentTTSConfig,
    credential: Arc<TencentCredential>,
    client: reqwest::Client,
    /// Target (`host[:port]/path`) covered by the signature.
    signing_target: String,
    request_counter: AtomicU64,
}

impl TencentTTS {
    pub fn new(credential: Arc<TencentCredential>, config: TencentTTSConfig) -> TTSResult<Self> {
        config.validate()?;

        let url = url::Url::parse(&config.url).map_err(|e| {
            TTSError::InvalidConfiguration(format!("Invalid TTS endpoint {}: {e}", config.url))
        })?;
        let signing_target = signing_target(&url).ok_or_else(|| {
            TTSError::InvalidConfiguration(format!("TTS endpoint has no host: {}", config.url))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                TTSError::ConnectionFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            credential,
            client,
            signing_target,
            request_counter: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &TencentTTSConfig {
        &self.config
    }

    /// Build and sign the request for `text` at `now`.
    ///
    /// Length limits are left to the service, which reports overlong text as
    /// a `ServiceError`.
    pub fn build_request(&self, text: &str, now: SystemTime) -> TTSResult<SignedRequest> {
        if text.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "text to synthesize is empty".to_string(),
            ));
        }

        let body = self.config.build_parameters(&self.credential, text, now)?;
        let authorization = Signer::new(self.credential.secret_key.as_str()).sign(
            "POST",
            &self.signing_target,
            &body,
        );

        Ok(SignedRequest {
            url: self.config.url.clone(),
            body,
            authorization,
        })
    }

    /// Synthesize `text` and decode the returned PCM.
    pub async fn synthesize(&self, text: &str) -> TTSResult<AudioSampleBuffer> {
        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let request = self.build_request(text, SystemTime::now())?;

        debug!(
            request_id = request_id,
            text_len = text.len(),
            voice_type = self.config.voice_type,
            "Synthesizing text with Tencent TTS"
        );

        let response = self
            .client
            .post(&request.url)
            .header("Authorization", request.authorization.as_str())
            .header("Content-Type", "application/json")
            .json(&request.body)
            .send()
            .await
            .map_err(|e| {
                error!(request_id = request_id, error = %e, "Tencent TTS request failed");
                classify_request_error(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!(request_id = request_id, error = %e, "Failed to read Tencent TTS response");
            classify_request_error(e)
        })?;

        let audio = validate_response(status.as_u16(), &body, self.config.sample_rate)
            .inspect_err(|e| {
                error!(request_id = request_id, status = %status, error = %e, "Tencent TTS returned an error");
            })?;

        debug!(
            request_id = request_id,
            audio_bytes = body.len(),
            duration_ms = audio.duration_ms(),
            "Successfully synthesized audio"
        );
        Ok(audio)
    }

    /// Synthesize `text` and write it as a WAV file at `path`.
    ///
    /// Returns the number of frames written. The file is written on the
    /// blocking thread pool.
    pub async fn synthesize_to_file(&self, text: &str, path: impl AsRef<Path>) -> TTSResult<usize> {
        let path = path.as_ref();
        let audio = self.synthesize(text).await?;
        let frames = audio.frames();

        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || audio.save_wav(target))
            .await
            .map_err(|e| TTSError::AudioEncoding(format!("WAV writer task failed: {e}")))??;
        info!("Saved {} frames of synthesized audio to {}", frames, path.display());
        Ok(frames)
    }
}

fn classify_request_error(error: reqwest::Error) -> TTSError {
    if error.is_timeout() {
        TTSError::TimeoutError(format!("Request timed out: {error}"))
    } else if error.is_connect() {
        TTSError::ConnectionFailed(format!("Failed to connect to Tencent TTS: {error}"))
    } else {
        TTSError::NetworkError(format!("Request failed: {error}"))
    }
}

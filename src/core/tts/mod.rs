//! Text-to-speech synthesis.

mod base;
pub mod tencent;

pub use base::{TTSError, TTSResult};
pub use tencent::{SignedRequest, TENCENT_TTS_URL, TencentTTS, TencentTTSConfig, validate_response};

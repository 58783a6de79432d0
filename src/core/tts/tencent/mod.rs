//! Tencent Cloud streaming text-to-speech.
//!
//! One signed HTTP POST per utterance. The response body is raw 16-bit PCM
//! which is decoded into an [`AudioSampleBuffer`](crate::core::audio::AudioSampleBuffer)
//! and can be saved as a WAV file.
//!
//! # Configuration
//!
//! ```bash
//! export TENCENT_SPEECH_APPID="1250000000"
//! export TENCENT_SECRET_ID="AKID..."
//! export TENCENT_SECRET_KEY="..."
//! export TENCENT_TTS_URL="https://tts.cloud.tencent.com/stream"  # Optional
//! ```

mod config;
mod provider;


pub use config::{
    DEFAULT_VOICE_TYPE, SUPPORTED_SAMPLE_RATES, TENCENT_TTS_URL, TTS_ACTION,
    TencentTTSConfig,
};
pub use provider::{SignedRequest, TencentTTS, validate_response};

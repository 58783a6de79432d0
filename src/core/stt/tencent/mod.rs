//! Tencent Cloud real-time speech recognition.
//!
//! Audio is streamed over a WebSocket whose URL carries the request
//! parameters and an HMAC-SHA1 signature. Results arrive as JSON frames, one
//! per sentence slice.
//!
//! # Configuration
//!
//! ```bash
//! export TENCENT_SPEECH_APPID="1250000000"
//! export TENCENT_SECRET_ID="AKID..."
//! export TENCENT_SECRET_KEY="..."
//! export TENCENT_ASR_URL="wss://asr.cloud.tencent.com/asr/v2"  # Optional
//! ```
//!
//! # Engine Models
//!
//! | Model | Audio |
//! |-------|-------|
//! | `16k_zh` | 16 kHz Mandarin (default) |
//! | `16k_en` | 16 kHz English |
//! | `8k_zh` | 8 kHz telephone Mandarin |

mod client;
mod config;
pub mod messages;


pub use client::TencentAsrTransport;
pub use config::{DEFAULT_ASR_URL, DEFAULT_SIGNATURE_EXPIRY_SECS, TencentAsrConfig};
pub use messages::{EndMessage, RecognitionResponse, ResultPayload, WordPayload};

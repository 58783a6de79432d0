//! Streaming speech recognition.

mod base;
pub mod session;
pub mod tencent;

pub use base::{
    DEFAULT_ENGINE_MODEL, RecognitionEvent, RecognitionListener, RecognitionRequest,
    RecognitionResult, STTError, SessionState, SliceType, VoiceFormat, WordInfo,
};
pub use session::{
    RecognitionSession, RecognitionTransport, TransportChannel, TransportCommand,
    TransportFrame, stream_audio,
};
pub use tencent::{TencentAsrConfig, TencentAsrTransport};

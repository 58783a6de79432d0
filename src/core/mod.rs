pub mod audio;
pub mod providers;
pub mod stt;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioSampleBuffer, read_wav, read_wav_file};

pub use providers::tencent::{Signer, TencentCredential};

pub use stt::{
    RecognitionEvent, RecognitionListener, RecognitionRequest, RecognitionSession, STTError,
    SessionState, TencentAsrTransport, VoiceFormat, stream_audio,
};

pub use tts::{TTSError, TTSResult, TencentTTS, TencentTTSConfig};

//! Shared types for streaming speech recognition.
//!
//! A recognition session reports everything it learns from the service as a
//! [`RecognitionEvent`] delivered to a caller-supplied
//! [`RecognitionListener`]. The listener is invoked synchronously on the
//! session's dispatch task, one event at a time, in the order the transport
//! received the underlying frames.

use serde::{Deserialize, Serialize};

/// Error types for STT operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Invalid session state: {0}")]
    InvalidState(String),
    #[error("Service error {code}: {message}")]
    ServiceError { code: i64, message: String },
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),
}

// =============================================================================
// Audio format
// =============================================================================

/// Audio container/codec of the stream pushed to the recognizer.
///
/// The discriminants are the vendor's `voice_format` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceFormat {
    #[default]
    Pcm,
    Speex,
    Silk,
    Mp3,
    Opus,
    Wav,
    M4a,
    Aac,
}

impl VoiceFormat {
    /// Numeric `voice_format` code sent on the wire.
    pub fn code(&self) -> i64 {
        match self {
            VoiceFormat::Pcm => 1,
            VoiceFormat::Speex => 4,
            VoiceFormat::Silk => 6,
            VoiceFormat::Mp3 => 8,
            VoiceFormat::Opus => 10,
            VoiceFormat::Wav => 12,
            VoiceFormat::M4a => 14,
            VoiceFormat::Aac => 16,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceFormat::Pcm => "pcm",
            VoiceFormat::Speex => "speex",
            VoiceFormat::Silk => "silk",
            VoiceFormat::Mp3 => "mp3",
            VoiceFormat::Opus => "opus",
            VoiceFormat::Wav => "wav",
            VoiceFormat::M4a => "m4a",
            VoiceFormat::Aac => "aac",
        }
    }
}

impl std::fmt::Display for VoiceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VoiceFormat {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pcm" | "linear16" => Ok(VoiceFormat::Pcm),
            "speex" => Ok(VoiceFormat::Speex),
            "silk" => Ok(VoiceFormat::Silk),
            "mp3" => Ok(VoiceFormat::Mp3),
            "opus" => Ok(VoiceFormat::Opus),
            "wav" => Ok(VoiceFormat::Wav),
            "m4a" => Ok(VoiceFormat::M4a),
            "aac" => Ok(VoiceFormat::Aac),
            _ => Err(STTError::InvalidAudioFormat(format!(
                "Unsupported voice format: {s}. Supported formats: pcm, speex, silk, mp3, opus, wav, m4a, aac"
            ))),
        }
    }
}

// =============================================================================
// Recognition request
// =============================================================================

/// Default engine model: 16 kHz Mandarin.
pub const DEFAULT_ENGINE_MODEL: &str = "16k_zh";

/// Parameters of one recognition session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionRequest {
    /// Engine/model identifier, e.g. `16k_zh` or `16k_en`.
    pub engine_model_type: String,
    pub voice_format: VoiceFormat,
    /// Client-chosen id for this stream, echoed back by the service.
    pub voice_id: String,
    /// Let the service segment sentences on silence.
    pub need_vad: bool,
    /// 0 keeps profanity, 1 filters it, 2 replaces it with `*`.
    pub filter_dirty: i64,
    /// 0 keeps modal particles, 1 partially filters, 2 filters strictly.
    pub filter_modal: i64,
    /// 0 keeps the sentence-final full stop, 1 filters it.
    pub filter_punc: i64,
    /// 1 converts spoken numbers to digits.
    pub convert_num_mode: i64,
    /// 0 no word list, 1 words without punctuation, 2 words with punctuation.
    pub word_info: i64,
    pub hotword_id: Option<String>,
    /// Silence in milliseconds that ends a sentence when VAD is on.
    pub vad_silence_time: Option<u32>,
}

impl Default for RecognitionRequest {
    fn default() -> Self {
        Self {
            engine_model_type: DEFAULT_ENGINE_MODEL.to_string(),
            voice_format: VoiceFormat::Pcm,
            voice_id: uuid::Uuid::new_v4().to_string(),
            need_vad: true,
            filter_dirty: 0,
            filter_modal: 0,
            filter_punc: 0,
            convert_num_mode: 1,
            word_info: 0,
            hotword_id: None,
            vad_silence_time: None,
        }
    }
}

impl RecognitionRequest {
    pub fn new(engine_model_type: impl Into<String>, voice_format: VoiceFormat) -> Self {
        Self {
            engine_model_type: engine_model_type.into(),
            voice_format,
            ..Default::default()
        }
    }

    /// Validate the request before any network activity.
    pub fn validate(&self) -> Result<(), STTError> {
        if self.engine_model_type.trim().is_empty() {
            return Err(STTError::ConfigurationError(
                "engine_model_type is required".to_string(),
            ));
        }
        if self.voice_id.trim().is_empty() {
            return Err(STTError::ConfigurationError(
                "voice_id is required".to_string(),
            ));
        }
        if let Some(silence) = self.vad_silence_time {
            if !(240..=2000).contains(&silence) {
                return Err(STTError::ConfigurationError(format!(
                    "vad_silence_time must be between 240 and 2000 ms, got {silence}"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Recognition results and events
// =============================================================================

/// Position of a result within its sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    /// First result of a new sentence.
    Begin,
    /// Intermediate hypothesis for the current sentence.
    Changing,
    /// Final text of the sentence.
    End,
}

impl SliceType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SliceType::Begin),
            1 => Some(SliceType::Changing),
            2 => Some(SliceType::End),
            _ => None,
        }
    }
}

/// Word-level detail of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct WordInfo {
    pub word: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub stable: bool,
}

/// One recognition hypothesis for a sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Sentence index within the stream.
    pub index: i64,
    pub text: String,
    pub slice_type: SliceType,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub words: Vec<WordInfo>,
}

/// Event delivered to a [`RecognitionListener`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The service accepted the stream.
    SessionStarted { voice_id: String },
    SentenceBegin(RecognitionResult),
    ResultChanged(RecognitionResult),
    /// Final text of one sentence.
    SentenceEnd(RecognitionResult),
    /// The service has processed the whole stream.
    RecognitionComplete,
    /// The stream failed. No further events follow.
    Failed(STTError),
}

impl RecognitionEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecognitionEvent::SessionStarted { .. } => "session_started",
            RecognitionEvent::SentenceBegin(_) => "sentence_begin",
            RecognitionEvent::ResultChanged(_) => "result_changed",
            RecognitionEvent::SentenceEnd(_) => "sentence_end",
            RecognitionEvent::RecognitionComplete => "recognition_complete",
            RecognitionEvent::Failed(_) => "failed",
        }
    }

    /// Sentence text carried by result events.
    pub fn text(&self) -> Option<&str> {
        match self {
            RecognitionEvent::SentenceBegin(r)
            | RecognitionEvent::ResultChanged(r)
            | RecognitionEvent::SentenceEnd(r) => Some(r.text.as_str()),
            _ => None,
        }
    }
}

/// Receives recognition events.
///
/// Called on the session's dispatch task with the session state lock held;
/// implementations must return promptly and must not call back into the
/// session. No particular thread identity is guaranteed.
pub trait RecognitionListener: Send + Sync {
    fn on_event(&self, event: RecognitionEvent);
}

impl<F> RecognitionListener for F
where
    F: Fn(RecognitionEvent) + Send + Sync,
{
    fn on_event(&self, event: RecognitionEvent) {
        self(event)
    }
}

/// Lifecycle state of a recognition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet connected.
    Configured,
    /// Connected and accepting audio.
    Active,
    /// The transport reported an error. Resources are held until stop.
    Failed,
    /// Stopped and released. Cannot be restarted.
    Closed,
}

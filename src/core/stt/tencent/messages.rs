//! Tencent real-time ASR WebSocket message types.
//!
//! Every server frame is a JSON object of the same shape:
//!
//! ```json
//! {
//!   "code": 0,
//!   "message": "success",
//!   "voice_id": "c1d2...",
//!   "message_id": "c1d2..._11_0",
//!   "result": {
//!     "slice_type": 2,
//!     "index": 0,
//!     "start_time": 0,
//!     "end_time": 1240,
//!     "voice_text_str": "hello world",
//!     "word_size": 0,
//!     "word_list": []
//!   },
//!   "final": 0
//! }
//! ```
//!
//! The first frame after connecting carries no `result` and acknowledges the
//! handshake. A non-zero `code` reports a failure.

use serde::{Deserialize, Serialize};

use crate::core::stt::base::{
    RecognitionEvent, RecognitionResult, STTError, SliceType, WordInfo,
};

// =============================================================================
// Server to client
// =============================================================================

/// A frame received from the recognition service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultPayload>,
    /// 1 once the whole stream has been recognized.
    #[serde(default, rename = "final")]
    pub final_flag: i64,
}

/// Recognition payload of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub slice_type: i64,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub voice_text_str: String,
    #[serde(default)]
    pub word_size: i64,
    #[serde(default)]
    pub word_list: Vec<WordPayload>,
}

/// Word-level entry of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordPayload {
    pub word: String,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub stable_flag: i64,
}

impl RecognitionResponse {
    /// Parse a JSON text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Handshake acknowledgement.
    pub fn handshake(voice_id: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            voice_id: voice_id.into(),
            message_id: String::new(),
            result: None,
            final_flag: 0,
        }
    }

    /// Frame carrying one result slice.
    pub fn slice(
        voice_id: impl Into<String>,
        index: i64,
        slice_type: i64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            result: Some(ResultPayload {
                slice_type,
                index,
                start_time: 0,
                end_time: 0,
                voice_text_str: text.into(),
                word_size: 0,
                word_list: Vec::new(),
            }),
            ..Self::handshake(voice_id)
        }
    }

    /// Frame marking the end of recognition.
    pub fn completed(voice_id: impl Into<String>) -> Self {
        Self {
            final_flag: 1,
            ..Self::handshake(voice_id)
        }
    }

    /// Frame reporting a service error.
    pub fn failure(voice_id: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            ..Self::handshake(voice_id)
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub fn is_final(&self) -> bool {
        self.final_flag == 1
    }

    /// The result payload as a [`RecognitionResult`], if it has a known slice type.
    pub fn to_result(&self) -> Option<RecognitionResult> {
        let payload = self.result.as_ref()?;
        let slice_type = SliceType::from_code(payload.slice_type)?;
        Some(RecognitionResult {
            index: payload.index,
            text: payload.voice_text_str.clone(),
            slice_type,
            start_time_ms: payload.start_time,
            end_time_ms: payload.end_time,
            words: payload
                .word_list
                .iter()
                .map(|w| WordInfo {
                    word: w.word.clone(),
                    start_time_ms: w.start_time,
                    end_time_ms: w.end_time,
                    stable: w.stable_flag == 1,
                })
                .collect(),
        })
    }

    /// Translate the frame into listener events, in delivery order.
    ///
    /// A failed frame produces only `Failed`. Otherwise the result slice (if
    /// any) comes first and `RecognitionComplete` last.
    pub fn into_events(self) -> Vec<RecognitionEvent> {
        if !self.is_success() {
            return vec![RecognitionEvent::Failed(STTError::ServiceError {
                code: self.code,
                message: self.message,
            })];
        }

        let mut events = Vec::with_capacity(2);
        if let Some(result) = self.to_result() {
            events.push(match result.slice_type {
                SliceType::Begin => RecognitionEvent::SentenceBegin(result),
                SliceType::Changing => RecognitionEvent::ResultChanged(result),
                SliceType::End => RecognitionEvent::SentenceEnd(result),
            });
        }
        if self.is_final() {
            events.push(RecognitionEvent::RecognitionComplete);
        }
        events
    }
}

// =============================================================================
// Client to server
// =============================================================================

/// Text frame signalling the end of the audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndMessage {
    #[serde(rename = "type")]
    pub kind: String,
}

impl EndMessage {
    pub fn new() -> Self {
        Self {
            kind: "end".to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "type": self.kind }).to_string()
    }
}

impl Default for EndMessage {
    fn default() -> Self {
        Self::new()
    }
}

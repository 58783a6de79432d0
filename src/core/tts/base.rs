use crate::core::audio::AudioError;

/// Error types for TTS operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The service answered but the body reports an error.
    #[error("Service error {code}: {message}")]
    ServiceError { code: String, message: String },

    /// The body could not be decoded as PCM16LE.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Audio encoding failed: {0}")]
    AudioEncoding(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

impl From<AudioError> for TTSError {
    fn from(error: AudioError) -> Self {
        match error {
            AudioError::MalformedPayload(message) => TTSError::MalformedPayload(message),
            other => TTSError::AudioEncoding(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_mapping() {
        let malformed: TTSError = AudioError::MalformedPayload("odd length".to_string()).into();
        assert_eq!(malformed, TTSError::MalformedPayload("odd length".to_string()));

        let io: TTSError =
            AudioError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(io, TTSError::AudioEncoding(_)));
    }

    #[test]
    fn test_service_error_display() {
        let error = TTSError::ServiceError {
            code: "AuthFailure.SignatureFailure".to_string(),
            message: "signature mismatch".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Service error AuthFailure.SignatureFailure: signature mismatch"
        );
    }
}

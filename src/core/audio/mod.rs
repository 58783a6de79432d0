//! Audio sample buffers and the WAV container adapter.
//!
//! Synthesized speech arrives as raw little-endian 16-bit PCM. It is decoded
//! into an [`AudioSampleBuffer`] and then written out as a RIFF/WAVE file so
//! that ordinary audio tools can play it back.

mod wav;

pub use wav::{read_wav, read_wav_file};

/// Errors raised while decoding or encoding audio.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("WAV encoding error: {0}")]
    Encoding(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signed 16-bit PCM samples with their stream metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSampleBuffer {
    /// Interleaved samples.
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioSampleBuffer {
    pub fn new(samples: Vec<i16>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            bits_per_sample: 16,
        }
    }

    /// Decode little-endian 16-bit PCM.
    ///
    /// The payload is consumed in 2-byte strides. A trailing odd byte is
    /// rejected instead of being dropped.
    pub fn from_pcm16le(data: &[u8], channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        if data.len() % 2 != 0 {
            return Err(AudioError::MalformedPayload(format!(
                "PCM16 payload length {} is not a multiple of 2",
                data.len()
            )));
        }
        if channels == 0 {
            return Err(AudioError::UnsupportedFormat(
                "channel count must be at least 1".to_string(),
            ));
        }

        let samples = data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self::new(samples, channels, sample_rate))
    }

    /// Encode the samples back to little-endian 16-bit PCM.
    pub fn to_pcm16le(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        data
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Playback duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

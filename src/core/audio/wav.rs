//! WAV container encoding and decoding with `hound`.
//!
//! `hound` writes the RIFF header up front and patches the data length when
//! the writer is finalized or flushed. A write that fails part way still
//! flushes the sink with a header covering the samples that made it out.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::{AudioError, AudioSampleBuffer};

impl AudioSampleBuffer {
    fn wav_spec(&self) -> Result<hound::WavSpec, AudioError> {
        if self.bits_per_sample != 16 {
            return Err(AudioError::UnsupportedFormat(format!(
                "only 16-bit samples can be encoded, buffer declares {} bits",
                self.bits_per_sample
            )));
        }
        if self.channels == 0 {
            return Err(AudioError::UnsupportedFormat(
                "channel count must be at least 1".to_string(),
            ));
        }
        Ok(hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        })
    }

    /// Write the buffer as a WAV container into `sink`.
    ///
    /// On a write error the header is patched to the samples already written
    /// and the sink is flushed before the error is returned.
    pub fn write_wav<W: Write + Seek>(self, sink: W) -> Result<(), AudioError> {
        let mut writer = hound::WavWriter::new(sink, self.wav_spec()?)?;

        let written = self
            .samples
            .iter()
            .try_for_each(|sample| writer.write_sample(*sample));
        if let Err(e) = written {
            if let Err(flush_err) = writer.flush() {
                warn!("Failed to flush WAV sink after write error: {}", flush_err);
            }
            return Err(e.into());
        }

        writer.finalize()?;
        Ok(())
    }

    /// Encode the buffer as an in-memory WAV file.
    pub fn to_wav_bytes(self) -> Result<Vec<u8>, AudioError> {
        let mut bytes = Vec::new();
        self.write_wav(Cursor::new(&mut bytes))?;
        Ok(bytes)
    }

    /// Write the buffer to a WAV file at `path`, creating or truncating it.
    ///
    /// This does blocking file I/O.
    pub fn save_wav(self, path: impl AsRef<Path>) -> Result<(), AudioError> {
        let path = path.as_ref();
        let frames = self.frames();
        self.wav_spec()?;
        let file = File::create(path)?;
        self.write_wav(BufWriter::new(file))?;
        debug!("Wrote {} frames to {}", frames, path.display());
        Ok(())
    }
}

/// Decode a 16-bit integer PCM WAV stream.
pub fn read_wav<R: Read>(reader: R) -> Result<AudioSampleBuffer, AudioError> {
    let reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::UnsupportedFormat(format!(
            "expected 16-bit integer PCM, found {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AudioSampleBuffer::new(samples, spec.channels, spec.sample_rate))
}

/// Decode a 16-bit integer PCM WAV file.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<AudioSampleBuffer, AudioError> {
    let file = File::open(path)?;
    read_wav(BufReader::new(file))
}

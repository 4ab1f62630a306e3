use super::types::DecodeError;

/// Decoded, de-interleaved audio. Immutable once built; replaced, never edited.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
    /// Cached duration in seconds
    duration_secs: f64,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample sequences.
    ///
    /// Every channel must hold the same number of frames and there must be at
    /// least one frame.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, DecodeError> {
        if sample_rate == 0 || channels.is_empty() {
            return Err(DecodeError::InvalidFormat {
                sample_rate,
                channels: channels.len() as u16,
            });
        }

        let frame_count = channels[0].len();
        if channels.iter().any(|ch| ch.len() != frame_count) {
            return Err(DecodeError::TruncatedAudio {
                len: channels.iter().map(Vec::len).sum(),
                frame_size: channels.len(),
            });
        }
        if frame_count == 0 {
            return Err(DecodeError::EmptyAudio);
        }

        Ok(Self {
            sample_rate,
            duration_secs: frame_count as f64 / sample_rate as f64,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Samples of one channel, or `None` if the index is out of range
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }
}

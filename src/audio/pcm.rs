// src/audio/pcm.rs
// Raw 16-bit little-endian PCM -> normalized per-channel f32

use super::buffer::AudioBuffer;
use super::codec::decode_base64;
use super::types::DecodeError;

const BYTES_PER_SAMPLE: usize = 2;
const I16_SCALE: f32 = 1.0 / 32768.0;

/// Interpret `bytes` as interleaved signed 16-bit little-endian PCM.
///
/// Samples are divided by 32768, so `i16::MIN` maps to exactly -1.0 and
/// `i16::MAX` to just under +1.0.
pub fn decode_pcm(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioBuffer, DecodeError> {
    if sample_rate == 0 || channels == 0 {
        return Err(DecodeError::InvalidFormat {
            sample_rate,
            channels,
        });
    }

    let channel_count = channels as usize;
    let frame_size = BYTES_PER_SAMPLE * channel_count;
    if bytes.len() % frame_size != 0 {
        return Err(DecodeError::TruncatedAudio {
            len: bytes.len(),
            frame_size,
        });
    }

    let frame_count = bytes.len() / frame_size;
    if frame_count == 0 {
        return Err(DecodeError::EmptyAudio);
    }

    let mut planes: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frame_count))
        .collect();

    for (index, pair) in bytes.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        planes[index % channel_count].push(sample as f32 * I16_SCALE);
    }

    AudioBuffer::new(sample_rate, planes)
}

/// Base64 payload straight to an `AudioBuffer`.
pub fn decode_pcm_base64(input: &str, sample_rate: u32, channels: u16) -> Result<AudioBuffer, DecodeError> {
    let bytes = decode_base64(input)?;
    decode_pcm(&bytes, sample_rate, channels)
}

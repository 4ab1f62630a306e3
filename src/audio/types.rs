// src/audio/types.rs
// Audio error definitions

use thiserror::Error;

/// Errors produced while turning a base64 payload into an `AudioBuffer`
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid base64 encoding: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Truncated audio: {len} bytes is not a multiple of the {frame_size}-byte frame")]
    TruncatedAudio { len: usize, frame_size: usize },

    #[error("Audio payload contains no frames")]
    EmptyAudio,

    #[error("Invalid audio format: sample_rate={sample_rate}, channels={channels}")]
    InvalidFormat { sample_rate: u32, channels: u16 },
}

/// Errors raised by an `AudioOutput` implementation
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    #[error("Audio output stream error: {0}")]
    Stream(String),
}

// src/audio/mod.rs
// Audio module - base64/PCM decoding and output capability

pub mod buffer;
pub mod codec;
pub mod cpal_output;
pub mod output;
pub mod pcm;
mod types;

pub use buffer::AudioBuffer;
pub use codec::decode_base64;
pub use cpal_output::CpalOutput;
pub use output::{AudioOutput, OutputHandle};
pub use pcm::{decode_pcm, decode_pcm_base64};
pub use types::{DecodeError, OutputError};

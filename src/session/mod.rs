// src/session/mod.rs
// Session module - one reader view over playback, speech and preferences

pub mod controller;
pub mod preferences;
pub mod store;

pub use controller::SessionController;
pub use preferences::Preferences;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

use crate::audio::DecodeError;
use crate::playback::PlaybackError;
use crate::tts::TtsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Audio decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Speech generation failed: {0}")]
    UpstreamGenerationFailed(#[from] TtsError),

    #[error("Failed to save preferences: {0}")]
    Store(#[from] StoreError),

    #[error("No text to read")]
    NoText,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Unknown tone: {0}")]
    UnknownTone(String),
}

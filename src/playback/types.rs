use super::state::PlaybackState;
use crate::audio::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No audio buffer loaded")]
    NoBufferLoaded,

    #[error("Output unavailable: {0}")]
    OutputUnavailable(#[from] OutputError),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PlaybackState,
    },

    #[error("A load is already in progress")]
    LoadInProgress,

    #[error("Invalid playback rate: {0}")]
    InvalidRate(f64),

    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),
}

// src/playback/mod.rs
// Playback scheduling: anchor-based position, state machine, progress polling

pub mod clock;
pub mod events;
pub mod scheduler;
pub mod state;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{PlayerEvent, ProgressEvent};
pub use scheduler::{PlaybackScheduler, PollOutcome, PollToken};
pub use state::{PlaybackState, SeekTarget};
pub use types::PlaybackError;

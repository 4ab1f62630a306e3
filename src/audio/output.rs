// src/audio/output.rs
// Output capability consumed by the playback scheduler

use std::sync::Arc;

use super::buffer::AudioBuffer;
use super::types::OutputError;

/// Something that can hand out playback voices (a sound card, a test double).
///
/// The scheduler keeps at most one handle alive and always releases the old
/// one before acquiring the next.
pub trait AudioOutput {
    /// Acquire a voice able to play buffers of the given shape
    fn acquire(&mut self, sample_rate: u32, channels: u16) -> Result<Box<dyn OutputHandle>, OutputError>;

    /// Return a voice; it must be silent once this returns
    fn release(&mut self, handle: Box<dyn OutputHandle>);

    /// Adapter name for logs
    fn name(&self) -> &str;
}

/// One playing voice.
pub trait OutputHandle {
    /// Begin rendering `buffer` from `offset_secs` (buffer time) at `rate`
    fn start(&mut self, buffer: Arc<AudioBuffer>, offset_secs: f64, rate: f64) -> Result<(), OutputError>;

    /// Silence the voice; idempotent
    fn stop(&mut self);

    /// Linear gain in [0.0, 1.0], applied immediately
    fn set_gain(&mut self, gain: f32);

    /// Change playback speed without restarting
    fn set_rate(&mut self, rate: f64);
}

use std::fmt;

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Failed,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where a seek should land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Fraction of the duration, 0.0..=1.0
    Fraction(f64),
    /// Absolute position in buffer seconds
    Seconds(f64),
}

impl SeekTarget {
    /// Resolve to seconds, clamped to `[0, duration]`
    pub fn resolve(self, duration: f64) -> f64 {
        let secs = match self {
            SeekTarget::Fraction(fraction) => fraction * duration,
            SeekTarget::Seconds(secs) => secs,
        };
        clamp_position(secs, duration)
    }
}

/// Clamp a position to `[0, duration]`; NaN lands on 0
pub(crate) fn clamp_position(secs: f64, duration: f64) -> f64 {
    if secs.is_nan() {
        return 0.0;
    }
    secs.clamp(0.0, duration.max(0.0))
}

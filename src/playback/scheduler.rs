use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::events::{PlayerEvent, ProgressEvent};
use super::state::{clamp_position, PlaybackState, SeekTarget};
use super::types::PlaybackError;
use crate::audio::{AudioBuffer, AudioOutput, OutputHandle};

/// Positions this close to the end count as the end when resuming
const END_EPSILON_SECS: f64 = 1e-9;

/// Right to run one progress poll. Only the token of the current playback run
/// is honoured; every run change invalidates the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollToken {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still playing; poll again later with this token
    Reschedule(PollToken),
    /// This poll observed the end of the buffer; the loop is over
    Ended,
    /// The token belongs to a superseded run; nothing was touched
    Stale,
}

/// Owns the loaded buffer, the output voice and the playback anchor.
///
/// While playing, the position is always
/// `anchor_offset + (now - anchor_wall_time) * rate`; otherwise it is frozen
/// at `anchor_offset`. All mutation happens on one thread through the methods
/// below.
pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    clock: Box<dyn Clock>,
    handle: Option<Box<dyn OutputHandle>>,
    buffer: Option<Arc<AudioBuffer>>,
    state: PlaybackState,
    rate: f64,
    volume: f32,
    anchor_wall_time: f64,
    anchor_offset: f64,
    generation: u64,
    pending_poll: Option<PollToken>,
    subscribers: Vec<mpsc::UnboundedSender<PlayerEvent>>,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn AudioOutput>, clock: Box<dyn Clock>) -> Self {
        Self {
            output,
            clock,
            handle: None,
            buffer: None,
            state: PlaybackState::Idle,
            rate: 1.0,
            volume: 1.0,
            anchor_wall_time: 0.0,
            anchor_offset: 0.0,
            generation: 0,
            pending_poll: None,
            subscribers: Vec::new(),
        }
    }

    /// Register an observer; dropped receivers are pruned on the next event
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_deref()
    }

    pub fn duration(&self) -> Option<f64> {
        self.buffer.as_ref().map(|b| b.duration_secs())
    }

    /// Token for the poll the driver should run next, if playback is live
    pub fn pending_poll(&self) -> Option<PollToken> {
        self.pending_poll
    }

    /// Current logical position in buffer seconds, clamped to the buffer
    pub fn position(&self) -> f64 {
        clamp_position(self.raw_position(), self.duration().unwrap_or(0.0))
    }

    fn raw_position(&self) -> f64 {
        if self.state == PlaybackState::Playing {
            self.anchor_offset + (self.clock.now() - self.anchor_wall_time) * self.rate
        } else {
            self.anchor_offset
        }
    }

    /// Enter `Loading`: stop any playback and wait for `complete_loading`.
    pub fn begin_loading(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Loading {
            return Err(PlaybackError::LoadInProgress);
        }
        self.stop_run();
        info!("Playback {} -> loading", self.state);
        self.state = PlaybackState::Loading;
        Ok(())
    }

    /// Install the buffer fetched during `Loading` and start playing it.
    pub fn complete_loading(&mut self, buffer: AudioBuffer) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Loading {
            return Err(PlaybackError::InvalidState {
                operation: "complete loading",
                state: self.state,
            });
        }

        let duration_secs = buffer.duration_secs();
        info!(
            "Buffer loaded: {:.2}s, {}Hz x{}",
            duration_secs,
            buffer.sample_rate(),
            buffer.channel_count()
        );

        // Replacing the Arc drops our reference to the previous buffer
        self.buffer = Some(Arc::new(buffer));
        self.anchor_offset = 0.0;
        self.state = PlaybackState::Ready;
        self.emit(PlayerEvent::AudioReady { duration_secs });

        self.start_run(0.0)
    }

    /// Swap in a new buffer and auto-play it from the start.
    pub fn load(&mut self, buffer: AudioBuffer) -> Result<(), PlaybackError> {
        self.begin_loading()?;
        self.complete_loading(buffer)
    }

    /// Move to `Failed`, silencing output. The last good buffer is kept.
    pub fn fail(&mut self, report: PlayerEvent) {
        self.stop_run();
        warn!("Playback {} -> failed: {:?}", self.state, report);
        self.state = PlaybackState::Failed;
        self.emit(report);
    }

    pub fn play(&mut self, offset_secs: f64) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Idle => Err(PlaybackError::NoBufferLoaded),
            PlaybackState::Loading | PlaybackState::Failed => Err(PlaybackError::InvalidState {
                operation: "play",
                state: self.state,
            }),
            PlaybackState::Ready
            | PlaybackState::Playing
            | PlaybackState::Paused
            | PlaybackState::Ended => {
                let duration = self.duration().ok_or(PlaybackError::NoBufferLoaded)?;
                self.start_run(clamp_position(offset_secs, duration))
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Playing => {
                self.anchor_offset = self.position();
                self.stop_run();
                self.state = PlaybackState::Paused;
                debug!("Paused at {:.3}s", self.anchor_offset);
                self.emit_progress();
                Ok(())
            }
            PlaybackState::Paused | PlaybackState::Ready | PlaybackState::Ended => Ok(()),
            PlaybackState::Idle => Err(PlaybackError::NoBufferLoaded),
            PlaybackState::Loading | PlaybackState::Failed => Err(PlaybackError::InvalidState {
                operation: "pause",
                state: self.state,
            }),
        }
    }

    /// Pause when playing, otherwise resume. After the end, resumes from the
    /// start unless a seek moved the position back.
    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Ended => {
                let duration = self.duration().ok_or(PlaybackError::NoBufferLoaded)?;
                let offset = if self.anchor_offset >= duration - END_EPSILON_SECS {
                    0.0
                } else {
                    self.anchor_offset
                };
                self.play(offset)
            }
            _ => self.play(self.anchor_offset),
        }
    }

    pub fn seek(&mut self, target: SeekTarget) -> Result<(), PlaybackError> {
        if matches!(self.state, PlaybackState::Loading | PlaybackState::Failed) {
            return Err(PlaybackError::InvalidState {
                operation: "seek",
                state: self.state,
            });
        }
        let duration = self.duration().ok_or(PlaybackError::NoBufferLoaded)?;
        let offset = target.resolve(duration);
        debug!("Seek to {:.3}s ({})", offset, self.state);

        if self.state == PlaybackState::Playing {
            self.start_run(offset)
        } else {
            self.anchor_offset = offset;
            self.emit_progress();
            Ok(())
        }
    }

    pub fn skip(&mut self, delta_secs: f64) -> Result<(), PlaybackError> {
        let target = self.position() + delta_secs;
        self.seek(SeekTarget::Seconds(target))
    }

    pub fn set_rate(&mut self, rate: f64) -> Result<(), PlaybackError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlaybackError::InvalidRate(rate));
        }

        if self.state == PlaybackState::Playing {
            // Re-anchor under the old rate first, or elapsed time gets rescaled
            self.anchor_offset = self.raw_position();
            self.anchor_wall_time = self.clock.now();
        }
        self.rate = rate;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_rate(rate);
        }
        debug!("Rate set to {:.2}x", rate);
        Ok(())
    }

    /// Finite values are clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError> {
        if !volume.is_finite() {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(handle) = self.handle.as_mut() {
            handle.set_gain(self.volume);
        }
        Ok(())
    }

    /// One tick of the progress loop.
    pub fn poll(&mut self, token: PollToken) -> PollOutcome {
        if self.pending_poll != Some(token) || self.state != PlaybackState::Playing {
            return PollOutcome::Stale;
        }

        let duration = self.duration().unwrap_or(0.0);
        if self.raw_position() >= duration {
            self.stop_run();
            self.anchor_offset = duration;
            self.state = PlaybackState::Ended;
            info!("Playback ended at {:.2}s", duration);
            self.emit(PlayerEvent::Progress(ProgressEvent {
                position_secs: duration,
                progress_percent: 100.0,
                is_playing: false,
                is_ended: true,
            }));
            return PollOutcome::Ended;
        }

        self.emit_progress();
        PollOutcome::Reschedule(token)
    }

    /// Release the voice, cancel polling and forget the buffer. Idempotent.
    pub fn teardown(&mut self) {
        self.stop_run();
        if self.state != PlaybackState::Idle {
            info!("Playback {} -> idle (teardown)", self.state);
        }
        self.buffer = None;
        self.anchor_offset = 0.0;
        self.state = PlaybackState::Idle;
    }

    fn start_run(&mut self, offset_secs: f64) -> Result<(), PlaybackError> {
        let buffer = self.buffer.clone().ok_or(PlaybackError::NoBufferLoaded)?;
        self.stop_run();

        let mut handle = match self
            .output
            .acquire(buffer.sample_rate(), buffer.channel_count())
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("Output '{}' unavailable: {}", self.output.name(), e);
                self.fail(PlayerEvent::PlaybackFailed(e.to_string()));
                return Err(e.into());
            }
        };

        handle.set_gain(self.volume);
        if let Err(e) = handle.start(buffer, offset_secs, self.rate) {
            error!("Output '{}' failed to start: {}", self.output.name(), e);
            self.output.release(handle);
            self.fail(PlayerEvent::PlaybackFailed(e.to_string()));
            return Err(e.into());
        }

        self.handle = Some(handle);
        self.anchor_offset = offset_secs;
        self.anchor_wall_time = self.clock.now();
        self.generation += 1;
        self.pending_poll = Some(PollToken {
            generation: self.generation,
        });
        self.state = PlaybackState::Playing;
        debug!(
            "Run {} started at {:.3}s, rate {:.2}x",
            self.generation, offset_secs, self.rate
        );
        self.emit_progress();
        Ok(())
    }

    /// Invalidate the poll token and give the voice back to the output
    fn stop_run(&mut self) {
        self.generation += 1;
        self.pending_poll = None;
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
            self.output.release(handle);
        }
    }

    fn emit_progress(&mut self) {
        let position_secs = self.position();
        let progress_percent = match self.duration() {
            Some(d) if d > 0.0 => (position_secs / d * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        };
        self.emit(PlayerEvent::Progress(ProgressEvent {
            position_secs,
            progress_percent,
            is_playing: self.state == PlaybackState::Playing,
            is_ended: self.state == PlaybackState::Ended,
        }));
    }

    fn emit(&mut self, event: PlayerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.stop_run();
    }
}

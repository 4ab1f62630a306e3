use tokio::sync::mpsc;
use uuid::Uuid;

use super::preferences::Preferences;
use super::store::KeyValueStore;
use super::SessionError;
use crate::audio::{decode_pcm_base64, AudioBuffer, AudioOutput, DecodeError};
use crate::playback::{
    Clock, PlaybackScheduler, PlaybackState, PlayerEvent, PollOutcome, PollToken, SeekTarget,
};
use crate::tts::catalog::{is_known_tone, is_known_voice, normalize_tone, normalize_voice};
use crate::tts::{SpeechAdapter, SpeechAudio, SpeechRequest, TtsError};

/// One reader view: the source text, the speech provider, persisted
/// preferences and the playback scheduler they drive.
pub struct SessionController {
    id: String,
    scheduler: PlaybackScheduler,
    speech: Box<dyn SpeechAdapter>,
    store: Box<dyn KeyValueStore>,
    preferences: Preferences,
    text: Option<String>,
}

impl SessionController {
    pub fn new(
        output: Box<dyn AudioOutput>,
        clock: Box<dyn Clock>,
        store: Box<dyn KeyValueStore>,
        speech: Box<dyn SpeechAdapter>,
    ) -> Self {
        let preferences = Preferences::load(store.as_ref());
        let mut scheduler = PlaybackScheduler::new(output, clock);
        if let Err(e) = scheduler.set_volume(preferences.volume) {
            tracing::warn!("Ignoring stored volume: {}", e);
        }
        if let Err(e) = scheduler.set_rate(preferences.rate) {
            tracing::warn!("Ignoring stored rate: {}", e);
        }

        let id = Uuid::new_v4().to_string();
        tracing::info!(
            "Session {} started: provider={}, voice={}, tone={:?}, rate={:.2}x, volume={:.2}",
            id,
            speech.name(),
            preferences.voice,
            preferences.tone,
            preferences.rate,
            preferences.volume
        );

        Self {
            id,
            scheduler,
            speech,
            store,
            preferences,
            text: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        self.scheduler.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn position(&self) -> f64 {
        self.scheduler.position()
    }

    pub fn duration(&self) -> Option<f64> {
        self.scheduler.duration()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Read `text` aloud with the current voice and tone.
    pub async fn speak(&mut self, text: &str) -> Result<(), SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::UpstreamGenerationFailed(TtsError::EmptyText));
        }
        self.text = Some(trimmed.to_string());
        self.generate_and_load().await
    }

    /// Re-synthesize the current text with the current voice and tone,
    /// keeping rate and volume.
    pub async fn regenerate(&mut self) -> Result<(), SessionError> {
        if self.text.is_none() {
            return Err(SessionError::NoText);
        }
        tracing::info!(
            "Session {}: regenerating with voice={}, tone={:?}",
            self.id,
            self.preferences.voice,
            self.preferences.tone
        );
        self.generate_and_load().await
    }

    /// Decode and play a payload produced elsewhere.
    pub fn load_audio(&mut self, audio: &SpeechAudio) -> Result<(), SessionError> {
        self.scheduler.begin_loading()?;
        self.install(audio)
    }

    /// Decode without touching the session
    pub fn decode_audio(&self, audio: &SpeechAudio) -> Result<AudioBuffer, DecodeError> {
        decode_pcm_base64(&audio.audio_b64, audio.sample_rate, audio.channels)
    }

    pub fn play(&mut self, offset_secs: f64) -> Result<(), SessionError> {
        Ok(self.scheduler.play(offset_secs)?)
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        Ok(self.scheduler.pause()?)
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), SessionError> {
        Ok(self.scheduler.toggle()?)
    }

    pub fn seek(&mut self, target: SeekTarget) -> Result<(), SessionError> {
        Ok(self.scheduler.seek(target)?)
    }

    pub fn skip(&mut self, delta_secs: f64) -> Result<(), SessionError> {
        Ok(self.scheduler.skip(delta_secs)?)
    }

    pub fn set_rate(&mut self, rate: f64) -> Result<(), SessionError> {
        self.scheduler.set_rate(rate)?;
        self.preferences.rate = rate;
        self.preferences.save_rate(self.store.as_mut())?;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), SessionError> {
        self.scheduler.set_volume(volume)?;
        self.preferences.volume = self.scheduler.volume();
        self.preferences.save_volume(self.store.as_mut())?;
        Ok(())
    }

    /// Choose the voice for the next `speak`/`regenerate`
    pub fn set_voice(&mut self, voice: &str) -> Result<(), SessionError> {
        if !is_known_voice(voice) {
            return Err(SessionError::UnknownVoice(voice.to_string()));
        }
        self.preferences.voice = normalize_voice(voice);
        self.preferences.save_voice(self.store.as_mut())?;
        Ok(())
    }

    /// Choose the tone for the next `speak`/`regenerate`; empty clears it
    pub fn set_tone(&mut self, tone: &str) -> Result<(), SessionError> {
        if !is_known_tone(tone) {
            return Err(SessionError::UnknownTone(tone.to_string()));
        }
        self.preferences.tone = normalize_tone(tone);
        self.preferences.save_tone(self.store.as_mut())?;
        Ok(())
    }

    pub fn pending_poll(&self) -> Option<PollToken> {
        self.scheduler.pending_poll()
    }

    pub fn poll(&mut self, token: PollToken) -> PollOutcome {
        self.scheduler.poll(token)
    }

    /// Run the currently scheduled poll, if any. Returns whether polling
    /// should continue.
    pub fn tick(&mut self) -> bool {
        match self.scheduler.pending_poll() {
            Some(token) => matches!(self.scheduler.poll(token), PollOutcome::Reschedule(_)),
            None => false,
        }
    }

    /// Stop output, cancel polling and drop the buffer. Safe to repeat.
    pub fn teardown(&mut self) {
        self.scheduler.teardown();
        self.text = None;
    }

    async fn generate_and_load(&mut self) -> Result<(), SessionError> {
        let text = self.text.clone().ok_or(SessionError::NoText)?;
        self.scheduler.begin_loading()?;

        let request = SpeechRequest {
            text,
            voice: self.preferences.voice.clone(),
            tone: self.preferences.tone.clone(),
        };

        match self.speech.synthesize(&request).await {
            Ok(audio) => self.install(&audio),
            Err(e) => {
                tracing::error!("Session {}: {} failed: {}", self.id, self.speech.name(), e);
                self.scheduler
                    .fail(PlayerEvent::GenerationFailed(e.to_string()));
                Err(SessionError::UpstreamGenerationFailed(e))
            }
        }
    }

    /// Finish a load started with `begin_loading`
    fn install(&mut self, audio: &SpeechAudio) -> Result<(), SessionError> {
        match self.decode_audio(audio) {
            Ok(buffer) => {
                self.scheduler.complete_loading(buffer)?;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Session {}: decode failed: {}", self.id, e);
                self.scheduler.fail(PlayerEvent::DecodeFailed(e.to_string()));
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::testing::{MockLog, MockOutput};
    use crate::playback::{ManualClock, PlaybackError};
    use crate::session::preferences::{KEY_RATE, KEY_TONE, KEY_VOICE, KEY_VOLUME};
    use crate::session::store::MemoryStore;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine as _;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    /// Replays canned results and records every request
    struct ScriptedSpeech {
        results: Mutex<VecDeque<Result<SpeechAudio, TtsError>>>,
        requests: Arc<Mutex<Vec<SpeechRequest>>>,
    }

    #[async_trait]
    impl SpeechAdapter for ScriptedSpeech {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, TtsError> {
            self.requests.lock().unwrap().push(request.clone());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TtsError::NoAudio))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// `secs` of mono silence at 100 Hz
    fn speech(secs: usize) -> SpeechAudio {
        SpeechAudio {
            audio_b64: BASE64_STANDARD.encode(vec![0u8; 2 * 100 * secs]),
            sample_rate: 100,
            channels: 1,
        }
    }

    struct Fixture {
        controller: SessionController,
        clock: ManualClock,
        log: Rc<RefCell<MockLog>>,
        requests: Arc<Mutex<Vec<SpeechRequest>>>,
    }

    fn fixture(store: MemoryStore, results: Vec<Result<SpeechAudio, TtsError>>) -> Fixture {
        let clock = ManualClock::new();
        let output = MockOutput::new();
        let log = output.log();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let adapter = ScriptedSpeech {
            results: Mutex::new(results.into_iter().collect()),
            requests: requests.clone(),
        };
        let controller = SessionController::new(
            Box::new(output),
            Box::new(clock.clone()),
            Box::new(store),
            Box::new(adapter),
        );
        Fixture {
            controller,
            clock,
            log,
            requests,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PlayerEvent>) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_speak_uses_stored_preferences() {
        let store = MemoryStore::new()
            .with(KEY_VOLUME, "0.3")
            .with(KEY_RATE, "1.5")
            .with(KEY_VOICE, "puck")
            .with(KEY_TONE, "cheerfully");
        let mut f = fixture(store, vec![Ok(speech(4))]);
        let mut rx = f.controller.subscribe();

        f.controller.speak("  Hello world ").await.unwrap();

        assert_eq!(f.controller.state(), PlaybackState::Playing);
        assert_eq!(f.controller.duration(), Some(4.0));
        assert_eq!(f.controller.text(), Some("Hello world"));

        let requests = f.requests.lock().unwrap();
        assert_eq!(requests[0].voice, "Puck");
        assert_eq!(requests[0].tone, "cheerfully");
        assert_eq!(requests[0].text, "Hello world");

        let log = f.log.borrow();
        assert_eq!(log.gains, vec![0.3]);
        assert_eq!(log.starts, vec![(0.0, 1.5)]);

        assert!(drain(&mut rx).contains(&PlayerEvent::AudioReady { duration_secs: 4.0 }));
    }

    #[tokio::test]
    async fn test_speak_rejects_blank_text() {
        let mut f = fixture(MemoryStore::new(), vec![]);
        assert!(matches!(
            f.controller.speak("  ").await,
            Err(SessionError::UpstreamGenerationFailed(TtsError::EmptyText))
        ));
        assert_eq!(f.controller.state(), PlaybackState::Idle);
        assert!(f.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_swaps_buffer_and_keeps_rate_and_volume() {
        let mut f = fixture(MemoryStore::new(), vec![Ok(speech(4)), Ok(speech(6))]);
        f.controller.speak("Some text").await.unwrap();
        f.controller.set_rate(2.0).unwrap();
        f.controller.set_volume(0.5).unwrap();
        f.controller.set_voice("Charon").unwrap();
        f.controller.set_tone("sadly").unwrap();
        f.clock.advance(1.0);

        f.controller.regenerate().await.unwrap();

        assert_eq!(f.controller.state(), PlaybackState::Playing);
        assert_eq!(f.controller.duration(), Some(6.0));
        assert_eq!(f.controller.position(), 0.0);

        let requests = f.requests.lock().unwrap();
        assert_eq!(requests[1].voice, "Charon");
        assert_eq!(requests[1].tone, "sadly");
        assert_eq!(requests[1].text, "Some text");

        let log = f.log.borrow();
        assert_eq!(log.starts.last(), Some(&(0.0, 2.0)));
        assert_eq!(log.gains.last(), Some(&0.5));
        assert_eq!(log.live, 1);
        assert_eq!(log.max_live, 1);
    }

    #[tokio::test]
    async fn test_regenerate_without_text() {
        let mut f = fixture(MemoryStore::new(), vec![]);
        assert!(matches!(f.controller.regenerate().await, Err(SessionError::NoText)));
    }

    #[tokio::test]
    async fn test_upstream_failure_fails_session_and_keeps_buffer() {
        let mut f = fixture(
            MemoryStore::new(),
            vec![Ok(speech(4)), Err(TtsError::RateLimitError), Ok(speech(2))],
        );
        let mut rx = f.controller.subscribe();
        f.controller.speak("Some text").await.unwrap();
        drain(&mut rx);

        let err = f.controller.regenerate().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::UpstreamGenerationFailed(TtsError::RateLimitError)
        ));
        assert_eq!(f.controller.state(), PlaybackState::Failed);
        assert_eq!(f.controller.duration(), Some(4.0));
        assert_eq!(f.log.borrow().live, 0);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PlayerEvent::GenerationFailed(_))));

        // no implicit recovery
        assert!(f.controller.play(0.0).is_err());

        f.controller.regenerate().await.unwrap();
        assert_eq!(f.controller.state(), PlaybackState::Playing);
        assert_eq!(f.controller.duration(), Some(2.0));
    }

    #[tokio::test]
    async fn test_corrupt_payload_fails_load_attempt() {
        let mut f = fixture(MemoryStore::new(), vec![Ok(speech(4))]);
        let mut rx = f.controller.subscribe();
        f.controller.speak("Some text").await.unwrap();
        drain(&mut rx);

        let bad = SpeechAudio {
            audio_b64: "%%%".to_string(),
            sample_rate: 24000,
            channels: 1,
        };
        let err = f.controller.load_audio(&bad).unwrap_err();
        assert!(matches!(err, SessionError::Decode(DecodeError::InvalidEncoding(_))));
        assert_eq!(f.controller.state(), PlaybackState::Failed);
        assert_eq!(f.controller.duration(), Some(4.0));
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PlayerEvent::DecodeFailed(_))));

        f.controller.load_audio(&speech(3)).unwrap();
        assert_eq!(f.controller.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_decode_preview_leaves_playback_alone() {
        let mut f = fixture(MemoryStore::new(), vec![Ok(speech(4))]);
        f.controller.speak("Some text").await.unwrap();
        f.clock.advance(1.0);
        f.controller.pause().unwrap();

        let bad = SpeechAudio {
            audio_b64: "AAA".to_string(),
            sample_rate: 100,
            channels: 1,
        };
        assert!(f.controller.decode_audio(&bad).is_err());
        assert_eq!(f.controller.state(), PlaybackState::Paused);
        assert_eq!(f.controller.position(), 1.0);
        assert_eq!(f.controller.duration(), Some(4.0));
    }

    #[test]
    fn test_truncated_payload_reports_truncation() {
        let mut f = fixture(MemoryStore::new(), vec![]);
        let odd = SpeechAudio {
            audio_b64: BASE64_STANDARD.encode([0u8; 5]),
            sample_rate: 100,
            channels: 1,
        };
        let err = f.controller.load_audio(&odd).unwrap_err();
        assert!(matches!(err, SessionError::Decode(DecodeError::TruncatedAudio { .. })));
        assert_eq!(f.controller.state(), PlaybackState::Failed);
    }

    #[test]
    fn test_setters_write_through() {
        let mut f = fixture(MemoryStore::new(), vec![]);
        f.controller.set_rate(0.75).unwrap();
        f.controller.set_volume(2.0).unwrap();
        f.controller.set_voice("fenrir").unwrap();
        f.controller.set_tone("").unwrap();

        let store = f.controller.store();
        assert_eq!(store.get(KEY_RATE).as_deref(), Some("0.75"));
        assert_eq!(store.get(KEY_VOLUME).as_deref(), Some("1"));
        assert_eq!(store.get(KEY_VOICE).as_deref(), Some("Fenrir"));
        assert_eq!(store.get(KEY_TONE).as_deref(), Some(""));

        assert!(matches!(
            f.controller.set_voice("Nobody"),
            Err(SessionError::UnknownVoice(_))
        ));
        assert!(matches!(
            f.controller.set_tone("angrily"),
            Err(SessionError::UnknownTone(_))
        ));
        assert!(f.controller.set_rate(0.0).is_err());
        assert_eq!(f.controller.preferences().rate, 0.75);
    }

    #[test]
    fn test_nan_volume_is_reported_not_stored() {
        let mut f = fixture(MemoryStore::new().with(KEY_VOLUME, "0.4"), vec![]);

        let err = f.controller.set_volume(f32::NAN).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Playback(PlaybackError::InvalidVolume(v)) if v.is_nan()
        ));
        assert_eq!(f.controller.preferences().volume, 0.4);
        assert_eq!(f.controller.store().get(KEY_VOLUME).as_deref(), Some("0.4"));
    }

    #[tokio::test]
    async fn test_regenerate_invalidates_pending_poll() {
        let mut f = fixture(MemoryStore::new(), vec![Ok(speech(4)), Ok(speech(4))]);
        let mut rx = f.controller.subscribe();
        f.controller.speak("Some text").await.unwrap();
        let stale = f.controller.pending_poll().unwrap();
        f.clock.advance(2.0);

        f.controller.regenerate().await.unwrap();
        let fresh = f.controller.pending_poll().unwrap();
        assert_ne!(stale, fresh);
        drain(&mut rx);

        f.clock.advance(3.0);
        assert_eq!(f.controller.poll(stale), PollOutcome::Stale);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(f.controller.poll(fresh), PollOutcome::Reschedule(fresh));
    }

    #[test]
    fn test_tick_drives_to_end() {
        let mut f = fixture(MemoryStore::new(), vec![]);
        f.controller.load_audio(&speech(2)).unwrap();

        f.clock.advance(1.0);
        assert!(f.controller.tick());
        f.clock.advance(1.5);
        assert!(!f.controller.tick());
        assert_eq!(f.controller.state(), PlaybackState::Ended);
        assert!(!f.controller.tick());
    }

    #[test]
    fn test_teardown_twice() {
        let mut f = fixture(MemoryStore::new(), vec![]);
        f.controller.load_audio(&speech(2)).unwrap();

        f.controller.teardown();
        f.controller.teardown();

        assert_eq!(f.controller.state(), PlaybackState::Idle);
        assert_eq!(f.log.borrow().live, 0);
        assert!(f.controller.text().is_none());
    }
}

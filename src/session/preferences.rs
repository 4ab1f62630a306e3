use super::store::{KeyValueStore, StoreError};
use crate::tts::catalog::{normalize_tone, normalize_voice, DEFAULT_RATE, DEFAULT_TONE, DEFAULT_VOICE};

pub const KEY_VOLUME: &str = "reader_volume";
pub const KEY_RATE: &str = "reader_speed";
pub const KEY_VOICE: &str = "reader_voice";
pub const KEY_TONE: &str = "reader_tone";

/// Playback and voice choices remembered between sessions
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub volume: f32,
    pub rate: f64,
    pub voice: String,
    pub tone: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            volume: 1.0,
            rate: DEFAULT_RATE,
            voice: DEFAULT_VOICE.to_string(),
            tone: DEFAULT_TONE.to_string(),
        }
    }
}

impl Preferences {
    /// Read every key once, falling back to defaults for anything missing or invalid
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();

        let volume = store
            .get(KEY_VOLUME)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(defaults.volume);

        let rate = store
            .get(KEY_RATE)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(defaults.rate);

        let voice = store
            .get(KEY_VOICE)
            .map(|v| normalize_voice(&v))
            .unwrap_or(defaults.voice);

        let tone = store
            .get(KEY_TONE)
            .map(|t| normalize_tone(&t))
            .unwrap_or(defaults.tone);

        Self {
            volume,
            rate,
            voice,
            tone,
        }
    }

    pub fn save_volume(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(KEY_VOLUME, &self.volume.to_string())
    }

    pub fn save_rate(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(KEY_RATE, &self.rate.to_string())
    }

    pub fn save_voice(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(KEY_VOICE, &self.voice)
    }

    pub fn save_tone(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(KEY_TONE, &self.tone)
    }
}

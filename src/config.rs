use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::tts::DEFAULT_MODEL;

pub const DEFAULT_PREFS_PATH: &str = "reader-prefs.json";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 16;
const MIN_POLL_INTERVAL_MS: u64 = 1;
const MAX_POLL_INTERVAL_MS: u64 = 1000;

/// Runtime settings for the reader binary
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub api_key: Option<String>,
    pub tts_model: String,
    pub prefs_path: PathBuf,
    pub poll_interval: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            tts_model: DEFAULT_MODEL.to_string(),
            prefs_path: PathBuf::from(DEFAULT_PREFS_PATH),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ReaderConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let poll_ms = match non_empty("READER_POLL_INTERVAL_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) => ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
                Err(_) => {
                    tracing::warn!("Invalid READER_POLL_INTERVAL_MS={:?}, using default", raw);
                    DEFAULT_POLL_INTERVAL_MS
                }
            },
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        Self {
            api_key: non_empty("GEMINI_API_KEY"),
            tts_model: non_empty("READER_TTS_MODEL").unwrap_or(defaults.tts_model),
            prefs_path: non_empty("READER_PREFS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.prefs_path),
            poll_interval: Duration::from_millis(poll_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ReaderConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ReaderConfig::default());
        assert!(config.api_key.is_none());
        assert_eq!(config.poll_interval, Duration::from_millis(16));
    }

    #[test]
    fn test_reads_overrides() {
        let config = ReaderConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", " secret "),
            ("READER_TTS_MODEL", "gemini-2.5-pro-preview-tts"),
            ("READER_PREFS_PATH", "/tmp/prefs.json"),
            ("READER_POLL_INTERVAL_MS", "50"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.tts_model, "gemini-2.5-pro-preview-tts");
        assert_eq!(config.prefs_path, PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_poll_interval_clamped_or_defaulted() {
        let zero = ReaderConfig::from_lookup(lookup(&[("READER_POLL_INTERVAL_MS", "0")]));
        assert_eq!(zero.poll_interval, Duration::from_millis(1));

        let huge = ReaderConfig::from_lookup(lookup(&[("READER_POLL_INTERVAL_MS", "60000")]));
        assert_eq!(huge.poll_interval, Duration::from_millis(1000));

        let junk = ReaderConfig::from_lookup(lookup(&[("READER_POLL_INTERVAL_MS", "fast")]));
        assert_eq!(junk.poll_interval, Duration::from_millis(16));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = ReaderConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "  "),
            ("READER_TTS_MODEL", ""),
        ]));
        assert!(config.api_key.is_none());
        assert_eq!(config.tts_model, DEFAULT_MODEL);
    }
}

// src/tts/types.rs
// Speech generation types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to say and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// Prebuilt voice id (e.g., "Kore")
    pub voice: String,
    /// Delivery hint (e.g., "cheerfully"); empty for none
    pub tone: String,
}

impl SpeechRequest {
    /// Prompt sent to the model: the tone, when set, is spoken as an instruction
    pub fn prompt(&self) -> String {
        let tone = self.tone.trim();
        if tone.is_empty() {
            self.text.clone()
        } else {
            format!("Say {}: {}", tone, self.text)
        }
    }
}

/// Raw 16-bit PCM returned by a provider, still base64-encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechAudio {
    pub audio_b64: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    TimeoutError,

    #[error("Authentication failed")]
    AuthenticationError,

    #[error("Rate limit exceeded")]
    RateLimitError,

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("No audio data returned")]
    NoAudio,

    #[error("Nothing to read: text is empty")]
    EmptyText,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tone: &str) -> SpeechRequest {
        SpeechRequest {
            text: "Hello there".to_string(),
            voice: "Kore".to_string(),
            tone: tone.to_string(),
        }
    }

    #[test]
    fn test_prompt_without_tone_is_bare_text() {
        assert_eq!(request("").prompt(), "Hello there");
        assert_eq!(request("  ").prompt(), "Hello there");
    }

    #[test]
    fn test_prompt_with_tone() {
        assert_eq!(request("cheerfully").prompt(), "Say cheerfully: Hello there");
    }
}

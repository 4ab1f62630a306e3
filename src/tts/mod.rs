// src/tts/mod.rs
// TTS Module - speech generation adapters

pub mod catalog;
mod gemini;
mod types;

pub use gemini::{GeminiSpeechAdapter, DEFAULT_MODEL};
pub use types::{SpeechAudio, SpeechRequest, TtsError};

use async_trait::async_trait;

/// Text-to-speech provider
#[async_trait]
pub trait SpeechAdapter: Send + Sync {
    /// Turn text into base64 PCM plus its format
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, TtsError>;

    /// Get provider name
    fn name(&self) -> &str;
}

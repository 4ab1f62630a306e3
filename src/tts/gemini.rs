// src/tts/gemini.rs
// Google Gemini text-to-speech adapter

use super::{SpeechAdapter, SpeechAudio, SpeechRequest, TtsError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TIMEOUT_SECS: u64 = 20;
const DEFAULT_SAMPLE_RATE: u32 = 24000;
const DEFAULT_CHANNELS: u16 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    speech_config: SpeechConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

pub struct GeminiSpeechAdapter {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiSpeechAdapter {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        tracing::info!("Gemini TTS adapter initialized (model={})", model);

        Self {
            client,
            api_key,
            model,
        }
    }

    fn build_request(request: &SpeechRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt(),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: request.voice.clone(),
                        },
                    },
                },
            },
        }
    }

    fn extract_audio(response: GeminiResponse) -> Result<SpeechAudio, TtsError> {
        let inline = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data))
            .filter(|d| !d.data.is_empty())
            .ok_or(TtsError::NoAudio)?;

        Ok(SpeechAudio {
            sample_rate: parse_sample_rate(&inline.mime_type).unwrap_or(DEFAULT_SAMPLE_RATE),
            channels: DEFAULT_CHANNELS,
            audio_b64: inline.data,
        })
    }
}

/// `audio/L16;codec=pcm;rate=24000` -> 24000
fn parse_sample_rate(mime_type: &str) -> Option<u32> {
    static RATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = RATE_RE.get_or_init(|| Regex::new(r"(?i)rate=(\d+)").expect("valid rate regex"));
    re.captures(mime_type)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|rate| *rate > 0)
}

#[async_trait]
impl SpeechAdapter for GeminiSpeechAdapter {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, TtsError> {
        if request.text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        tracing::info!(
            "Gemini TTS: synthesizing {} chars (voice={}, tone={:?})",
            request.text.len(),
            request.voice,
            request.tone
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::TimeoutError
                } else {
                    TtsError::NetworkError(format!("Gemini: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => TtsError::AuthenticationError,
                429 => TtsError::RateLimitError,
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    TtsError::ProviderError(format!("Gemini {}: {}", status, body))
                }
            });
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .map_err(|e| TtsError::ProviderError(format!("Gemini parse: {}", e)))?;

        let audio = Self::extract_audio(gemini)?;
        tracing::info!(
            "Gemini TTS success: {} base64 chars at {}Hz",
            audio.audio_b64.len(),
            audio.sample_rate
        );
        Ok(audio)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// Voices, tones and speeds offered to the reader

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRate {
    pub value: f64,
    pub label: &'static str,
}

pub const VOICES: &[Voice] = &[
    Voice { id: "Kore", name: "Kore (female)" },
    Voice { id: "Puck", name: "Puck (male)" },
    Voice { id: "Zephyr", name: "Zephyr (female, soft)" },
    Voice { id: "Charon", name: "Charon (male, deep)" },
    Voice { id: "Fenrir", name: "Fenrir (male)" },
];

pub const TONES: &[Tone] = &[
    Tone { value: "", label: "None" },
    Tone { value: "cheerfully", label: "Cheerful" },
    Tone { value: "sadly", label: "Sad" },
    Tone { value: "informatively", label: "Informative" },
    Tone { value: "excitedly", label: "Excited" },
];

pub const PLAYBACK_RATES: &[PlaybackRate] = &[
    PlaybackRate { value: 0.5, label: "0.5x" },
    PlaybackRate { value: 0.75, label: "0.75x" },
    PlaybackRate { value: 1.0, label: "1.0x" },
    PlaybackRate { value: 1.5, label: "1.5x" },
    PlaybackRate { value: 2.0, label: "2.0x" },
];

pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_TONE: &str = "";
pub const DEFAULT_RATE: f64 = 1.0;

/// Known voice id, matched case-insensitively, or the default
pub fn normalize_voice(input: &str) -> String {
    let trimmed = input.trim();
    VOICES
        .iter()
        .find(|v| v.id.eq_ignore_ascii_case(trimmed))
        .map(|v| v.id)
        .unwrap_or(DEFAULT_VOICE)
        .to_string()
}

/// Known tone, matched case-insensitively, or no tone
pub fn normalize_tone(input: &str) -> String {
    let trimmed = input.trim();
    TONES
        .iter()
        .find(|t| t.value.eq_ignore_ascii_case(trimmed))
        .map(|t| t.value)
        .unwrap_or(DEFAULT_TONE)
        .to_string()
}

pub fn is_known_voice(input: &str) -> bool {
    VOICES.iter().any(|v| v.id.eq_ignore_ascii_case(input.trim()))
}

pub fn is_known_tone(input: &str) -> bool {
    TONES.iter().any(|t| t.value.eq_ignore_ascii_case(input.trim()))
}

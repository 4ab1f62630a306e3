// src/commands.rs
// Terminal player commands - one line of stdin per command

use crate::playback::SeekTarget;
use crate::session::{SessionController, SessionError};
use crate::tts::catalog::{PLAYBACK_RATES, TONES, VOICES};

pub const SKIP_SECS: f64 = 10.0;

pub const HELP: &str = "commands: p (play/pause), s <pct> (seek), f/b (skip ±10s), \
r <rate>, v <volume 0-1>, voice <name>, tone <tone>, g (regenerate), q (quit)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePlay,
    SeekPercent(f64),
    Forward,
    Back,
    Rate(f64),
    Volume(f32),
    Voice(String),
    Tone(String),
    Regenerate,
    Help,
    Quit,
}

/// Voices, tones and rates the reader offers, one line each
pub fn choices() -> String {
    let voices: Vec<String> = VOICES
        .iter()
        .map(|v| format!("{} [{}]", v.id, v.name))
        .collect();
    let tones: Vec<String> = TONES
        .iter()
        .map(|t| {
            if t.value.is_empty() {
                format!("\"\" [{}]", t.label)
            } else {
                format!("{} [{}]", t.value, t.label)
            }
        })
        .collect();
    let rates: Vec<&str> = PLAYBACK_RATES.iter().map(|r| r.label).collect();

    format!(
        "voices: {}\ntones: {}\nrates: {}",
        voices.join(", "),
        tones.join(", "),
        rates.join(", ")
    )
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, arg) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let number = |what: &str| {
        arg.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("{} expects a number, got {:?}", what, arg))
    };

    match head.to_ascii_lowercase().as_str() {
        "p" | "play" | "pause" => Ok(Command::TogglePlay),
        "s" | "seek" => Ok(Command::SeekPercent(number("seek")?)),
        "f" => Ok(Command::Forward),
        "b" => Ok(Command::Back),
        "r" | "rate" => Ok(Command::Rate(number("rate")?)),
        "v" | "volume" => Ok(Command::Volume(number("volume")? as f32)),
        "voice" if !arg.is_empty() => Ok(Command::Voice(arg.to_string())),
        "voice" => Err("voice expects a name".to_string()),
        "tone" => Ok(Command::Tone(arg.to_string())),
        "g" | "regenerate" => Ok(Command::Regenerate),
        "h" | "help" | "?" => Ok(Command::Help),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command {:?}", other)),
    }
}

/// Apply a command to the session. `Ok(false)` means quit.
pub async fn execute(controller: &mut SessionController, command: Command) -> Result<bool, SessionError> {
    match command {
        Command::TogglePlay => controller.toggle_play_pause()?,
        Command::SeekPercent(pct) => controller.seek(SeekTarget::Fraction(pct / 100.0))?,
        Command::Forward => controller.skip(SKIP_SECS)?,
        Command::Back => controller.skip(-SKIP_SECS)?,
        Command::Rate(rate) => controller.set_rate(rate)?,
        Command::Volume(volume) => controller.set_volume(volume)?,
        Command::Voice(voice) => {
            controller.set_voice(&voice)?;
            tracing::info!("Voice set to {}; press g to regenerate", controller.preferences().voice);
        }
        Command::Tone(tone) => {
            controller.set_tone(&tone)?;
            tracing::info!("Tone set to {:?}; press g to regenerate", controller.preferences().tone);
        }
        Command::Regenerate => controller.regenerate().await?,
        Command::Help => tracing::info!("{}\n{}", HELP, choices()),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

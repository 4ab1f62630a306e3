pub mod audio;
pub mod commands;
pub mod config;
pub mod playback;
pub mod session;
pub mod tts;

use audio::CpalOutput;
use commands::{execute, parse_command, HELP};
use config::ReaderConfig;
use playback::{PlayerEvent, PollOutcome, PollToken, SystemClock};
use session::{JsonFileStore, SessionController};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tts::GeminiSpeechAdapter;

/// Progress is logged at most once per whole second of audio
struct ProgressLog {
    last_second: Option<u64>,
}

impl ProgressLog {
    fn new() -> Self {
        Self { last_second: None }
    }

    fn record(&mut self, event: &PlayerEvent) {
        if tracing::enabled!(tracing::Level::TRACE) {
            if let Ok(json) = serde_json::to_string(event) {
                tracing::trace!(target: "text_reader::events", "{}", json);
            }
        }
        match event {
            PlayerEvent::Progress(p) => {
                let second = p.position_secs.max(0.0) as u64;
                if p.is_ended {
                    tracing::info!("Finished ({:.1}s)", p.position_secs);
                    self.last_second = None;
                } else if self.last_second != Some(second) || !p.is_playing {
                    tracing::info!(
                        "{} {:>6.1}s {:>5.1}%",
                        if p.is_playing { "▶" } else { "⏸" },
                        p.position_secs,
                        p.progress_percent
                    );
                    self.last_second = Some(second);
                }
            }
            PlayerEvent::AudioReady { duration_secs } => {
                tracing::info!("Audio ready: {:.2}s", duration_secs);
                self.last_second = None;
            }
            PlayerEvent::DecodeFailed(msg) => tracing::error!("Could not decode audio: {}", msg),
            PlayerEvent::PlaybackFailed(msg) => tracing::error!("Playback failed: {}", msg),
            PlayerEvent::GenerationFailed(msg) => tracing::error!("Speech generation failed: {}", msg),
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Drive one session until `q` or until stdin closes and playback stops
async fn drive(
    mut controller: SessionController,
    mut events: mpsc::UnboundedReceiver<PlayerEvent>,
    poll_interval: Duration,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut progress = ProgressLog::new();
    let mut token: Option<PollToken> = controller.pending_poll();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick(), if token.is_some() => {
                if let Some(current) = token {
                    token = match controller.poll(current) {
                        PollOutcome::Reschedule(next) => Some(next),
                        PollOutcome::Ended | PollOutcome::Stale => None,
                    };
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match parse_command(&line) {
                        Ok(command) => match execute(&mut controller, command).await {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => tracing::warn!("{}", e),
                        },
                        Err(e) => tracing::warn!("{} ({})", e, HELP),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                }
                token = controller.pending_poll();
            }
            Some(event) = events.recv() => progress.record(&event),
        }

        if !stdin_open && token.is_none() {
            break;
        }
    }

    while let Ok(event) = events.try_recv() {
        progress.record(&event);
    }
    controller.teardown();
    tracing::info!("Session {} closed", controller.id());
}

pub fn run() {
    init_tracing();
    let config = ReaderConfig::from_env();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        eprintln!("usage: text-reader <text to read>");
        eprintln!("{}", HELP);
        std::process::exit(2);
    }

    let Some(api_key) = config.api_key.clone() else {
        tracing::error!("GEMINI_API_KEY is not set (environment or .env)");
        std::process::exit(1);
    };

    let store = match JsonFileStore::load_or_create(&config.prefs_path) {
        Ok(store) => {
            tracing::debug!("Preferences file: {:?}", store.path());
            store
        }
        Err(e) => {
            tracing::error!("Failed to open preferences at {:?}: {}", config.prefs_path, e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let mut controller = SessionController::new(
            Box::new(CpalOutput::new()),
            Box::new(SystemClock::new()),
            Box::new(store),
            Box::new(GeminiSpeechAdapter::new(api_key, Some(config.tts_model.clone()))),
        );
        let events = controller.subscribe();

        tracing::info!("{}", HELP);
        if let Err(e) = controller.speak(&text).await {
            tracing::error!("{}", e);
        }

        drive(controller, events, config.poll_interval).await;
    });
}

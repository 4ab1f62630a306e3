use serde::Serialize;

/// Position report emitted on every poll tick and after position changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(rename = "positionSeconds")]
    pub position_secs: f64,
    pub progress_percent: f64,
    pub is_playing: bool,
    pub is_ended: bool,
}

/// Everything a session reports to its observers. Serializes as
/// `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PlayerEvent {
    Progress(ProgressEvent),
    AudioReady { duration_secs: f64 },
    DecodeFailed(String),
    PlaybackFailed(String),
    GenerationFailed(String),
}

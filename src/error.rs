// src/error.rs

use crate::widget::EntryId;

/// Failures talking to the question-answering backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API Error: {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cannot build endpoint URL: {0}")]
    InvalidUrl(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Failures reported by the host page's video element.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("no video player on the page")]
    Unavailable,

    #[error("page script failed: {0}")]
    Script(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Errors surfaced to the user when an event cannot be handled.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Could not get YouTube video ID. Please make sure you are on a video page.")]
    MissingVideoId,

    #[error("no marker {marker} on entry {entry}")]
    UnknownMarker { entry: EntryId, marker: usize },

    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// Rejected configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid backend URL `{url}`: {reason}")]
    BackendUrl { url: String, reason: String },

    #[error("minimum marker gap must be a finite, non-negative number of seconds (got {0})")]
    MinGap(f64),
}

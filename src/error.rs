use std::path::PathBuf;

use thiserror::Error;

/// Podteaser's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Podteaser's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
///
/// Severity policy:
/// - `Config` aborts the whole batch (detected once, before any track runs)
/// - `Decode`, `Render`, `InsufficientContent` and `Cancelled` are fatal for one track only
/// - `InvalidMarker` never surfaces from the resolver itself (bad markers are dropped with a
///   warning); it exists for callers that want to validate marker files strictly up front
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("invalid marker [{start:.2}, {end:.2}): {reason}")]
    InvalidMarker {
        start: f32,
        end: f32,
        reason: String,
    },

    #[error("insufficient admissible content: achieved {achieved:.1}s of {target:.1}s target")]
    InsufficientContent { achieved: f32, target: f32 },

    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("track processing was cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Message(err.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        Self::Message(err.to_string())
    }
}

//! The transcription-collaborator seam.
//!
//! The core never performs speech-to-text itself. Callers hand it a
//! [`Transcriber`] implementation (or nothing, when transcription is disabled)
//! and it consumes the timed segments that come back.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One transcript segment as produced by an external transcription engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptSegment {
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub text: String,
    /// Engine confidence in `[0.0, 1.0]`. Engines that don't report one
    /// should use `1.0`.
    pub confidence: f32,
}

/// A transcription collaborator.
///
/// Implementations receive the track's mono samples and return ordered timed
/// segments. Absence of a transcriber simply means the marker resolver produces
/// no transcript-derived annotations.
pub trait Transcriber {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<TranscriptSegment>>;
}

/// A transcriber backed by an already-produced transcript (e.g. a sidecar JSON
/// file), useful when transcription ran out-of-band.
pub struct StaticTranscript {
    segments: Vec<TranscriptSegment>,
}

impl StaticTranscript {
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        Self { segments }
    }

    /// Load segments from a JSON array of `TranscriptSegment` values.
    pub fn from_json(text: &str) -> Result<Self> {
        let segments: Vec<TranscriptSegment> = serde_json::from_str(text)?;
        Ok(Self::new(segments))
    }
}

impl Transcriber for StaticTranscript {
    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<Vec<TranscriptSegment>> {
        Ok(self.segments.clone())
    }
}

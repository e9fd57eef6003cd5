//! The decoded-track value type shared by every pipeline stage.

use std::path::PathBuf;

/// One decoded input recording.
///
/// Samples are mono `f32` in `[-1.0, 1.0]` at the source sample rate; the
/// original channel count is kept for reporting only. A `Track` is immutable
/// once decoded and owned exclusively by the pipeline run that loaded it.
#[derive(Debug, Clone)]
pub struct Track {
    /// Source path, used as the track's identifier in reports and logs.
    pub source: PathBuf,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before downmixing.
    pub channels: usize,
}

impl Track {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Convert a time in seconds to a clamped sample index.
    pub fn sample_at(&self, secs: f32) -> usize {
        let idx = (secs.max(0.0) * self.sample_rate as f32).round() as usize;
        idx.min(self.samples.len())
    }
}

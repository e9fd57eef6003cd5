//! Combine feature series and annotations into one interest curve.
//!
//! Each feature series is z-score normalized per track (cross-track
//! comparability is not needed here), then combined via the configured
//! weighted sum. Soft annotations add boosts proportional to their weight;
//! hard annotations force the curve to a strongly negative floor so the
//! selector never chooses time inside them.

use crate::config::ScoringWeights;
use crate::features::{ENERGY, FeatureSet, SPECTRAL_FLUX, SPEECH_DENSITY};
use crate::markers::{Annotation, AnnotationKind};

/// Floor value written into excluded frames. Any admissible window mean is
/// strictly greater than this, so excluded time can never win a selection.
pub const EXCLUDED: f32 = -1.0e3;

/// One scalar engagement estimate per analysis frame.
///
/// Shares the feature grid: frame `i` covers `[i * hop_secs, (i + 1) * hop_secs)`.
#[derive(Debug, Clone)]
pub struct InterestCurve {
    pub hop_secs: f32,
    pub values: Vec<f32>,
}

impl InterestCurve {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_excluded(&self, frame: usize) -> bool {
        self.values[frame] <= EXCLUDED
    }

    /// True when every non-excluded frame carries the same score, meaning the
    /// selector has nothing to rank by and must take its deterministic fallback.
    pub fn is_flat(&self) -> bool {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.values {
            if v <= EXCLUDED {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
        }
        // All-excluded curves count as flat; the selector reports them as
        // insufficient content either way.
        min > max || (max - min) < 1e-6
    }
}

/// Build the interest curve for one track.
pub fn score_track(
    features: &FeatureSet,
    annotations: &[Annotation],
    weights: &ScoringWeights,
    highlight_boost: f32,
) -> InterestCurve {
    let frames = features.frames;
    let hop = features.hop_secs;
    let mut values = vec![0.0f32; frames];

    for (name, series) in features.iter() {
        let weight = match name {
            ENERGY => weights.energy,
            SPECTRAL_FLUX => weights.spectral_flux,
            SPEECH_DENSITY => weights.speech_density,
            _ => continue,
        };
        if weight == 0.0 {
            continue;
        }
        let normalized = zscore(series);
        for (acc, v) in values.iter_mut().zip(normalized) {
            *acc += weight * v;
        }
    }

    for ann in annotations {
        let range = frame_range(ann, hop, frames);
        match ann.kind {
            AnnotationKind::Include | AnnotationKind::Highlight => {
                for v in &mut values[range] {
                    if *v > EXCLUDED {
                        *v += highlight_boost * ann.weight;
                    }
                }
            }
            AnnotationKind::Exclude | AnnotationKind::Intro | AnnotationKind::Outro => {
                for v in &mut values[range] {
                    *v = EXCLUDED;
                }
            }
        }
    }

    InterestCurve {
        hop_secs: hop,
        values,
    }
}

/// Frames whose hop-sized slice overlaps the annotation interval.
///
/// Exclusion mapping is conservative: a frame partially inside a hard zone is
/// treated as inside it.
fn frame_range(ann: &Annotation, hop_secs: f32, frames: usize) -> std::ops::Range<usize> {
    let first = (ann.start_seconds / hop_secs).floor().max(0.0) as usize;
    let last = (ann.end_seconds / hop_secs).ceil() as usize;
    first.min(frames)..last.min(frames)
}

/// Z-score normalize a series; a constant series maps to all zeros.
fn zscore(series: &[f32]) -> Vec<f32> {
    let n = series.len() as f32;
    let mean: f32 = series.iter().sum::<f32>() / n;
    let var: f32 = series.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = var.sqrt();
    if std < 1e-9 {
        return vec![0.0; series.len()];
    }
    series.iter().map(|v| (v - mean) / std).collect()
}

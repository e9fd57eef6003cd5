//! Splice selected segments into one continuous teaser waveform.
//!
//! Segments are emitted in their original chronological position within the
//! source track — not score order — to preserve narrative coherence. Each
//! splice boundary gets an equal-power crossfade, clipped to the shorter of
//! the two adjoining segments so the fade never reads outside segment bounds.
//!
//! Length invariant: rendered length = sum of segment lengths minus the sum
//! of the (n-1) crossfade overlaps, exactly.

use std::f32::consts::FRAC_PI_2;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::selector::Segment;
use crate::track::Track;

/// A rendered teaser: the chosen segments plus the spliced waveform.
///
/// Owns its audio buffer until written out. Segment scores are retained so the
/// summary combiner can re-rank this teaser's content without re-analysis.
#[derive(Debug, Clone)]
pub struct Teaser {
    pub source: PathBuf,
    pub segments: Vec<Segment>,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Teaser {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Render the chosen segments of a track into one teaser.
///
/// Fails with [`Error::Render`] when no segments survived selection.
pub fn render_teaser(track: &Track, segments: &[Segment], crossfade_secs: f32) -> Result<Teaser> {
    if segments.is_empty() {
        return Err(Error::Render(format!(
            "no segments to render for '{}'",
            track.source.display()
        )));
    }

    let mut ordered: Vec<Segment> = segments.to_vec();
    ordered.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

    let crossfade_samples = (crossfade_secs * track.sample_rate as f32) as usize;

    let mut out: Vec<f32> = Vec::new();
    let mut prev_len = 0usize;

    for seg in &ordered {
        let start = track.sample_at(seg.start_seconds);
        let end = track.sample_at(seg.end_seconds);
        let piece = &track.samples[start..end];

        if out.is_empty() {
            out.extend_from_slice(piece);
            prev_len = piece.len();
            continue;
        }

        let overlap = crossfade_samples.min(prev_len).min(piece.len());
        crossfade_append(&mut out, piece, overlap);
        prev_len = piece.len();
    }

    Ok(Teaser {
        source: track.source.clone(),
        segments: ordered,
        samples: out,
        sample_rate: track.sample_rate,
    })
}

/// Mix `next` onto the tail of `out` with an equal-power crossfade over
/// `overlap` samples, then append the remainder.
///
/// Gains follow the sin/cos quarter-cycle so combined power stays constant
/// through the transition.
pub(crate) fn crossfade_append(out: &mut Vec<f32>, next: &[f32], overlap: usize) {
    let tail_start = out.len() - overlap;
    for k in 0..overlap {
        let t = k as f32 / overlap as f32;
        let fade_out = (t * FRAC_PI_2).cos();
        let fade_in = (t * FRAC_PI_2).sin();
        out[tail_start + k] = out[tail_start + k] * fade_out + next[k] * fade_in;
    }
    out.extend_from_slice(&next[overlap..]);
}

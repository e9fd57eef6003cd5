//! Combine several per-track teasers into one cross-episode summary reel.
//!
//! The summary duration is allocated proportionally across input teasers
//! (equal share unless per-track weights are configured). From each teaser we
//! take its own highest-scoring contiguous sub-range of already-assembled
//! segments — the teaser already encodes relative segment quality, so no
//! re-analysis happens here — trimmed to the track's share, and concatenate
//! excerpts in batch order with the usual crossfade treatment.

use std::path::PathBuf;

use crate::assembler::{Teaser, crossfade_append};
use crate::config::SummaryConfig;
use crate::error::{Error, Result};
use crate::selector::Segment;

/// One excerpt taken from a teaser, in that teaser's own timeline.
#[derive(Debug, Clone)]
pub struct SummaryPart {
    pub source: PathBuf,
    pub excerpt_start_secs: f32,
    pub excerpt_end_secs: f32,
}

/// A rendered cross-episode reel.
#[derive(Debug, Clone)]
pub struct SummaryReel {
    pub parts: Vec<SummaryPart>,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SummaryReel {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Combine a batch's teasers into one summary reel.
///
/// Only meaningful for two or more teasers; fewer is a caller error. All
/// teasers must share one sample rate — nothing in the engine resamples.
pub fn combine_teasers(
    teasers: &[Teaser],
    config: &SummaryConfig,
    crossfade_secs: f32,
) -> Result<SummaryReel> {
    if teasers.len() < 2 {
        return Err(Error::Render(
            "summary reel requires at least two teasers".into(),
        ));
    }

    let sample_rate = teasers[0].sample_rate;
    if teasers.iter().any(|t| t.sample_rate != sample_rate) {
        return Err(Error::Render(
            "summary reel requires all teasers to share one sample rate".into(),
        ));
    }

    let shares = allocate_shares(teasers.len(), config)?;

    let mut parts = Vec::with_capacity(teasers.len());
    let mut samples: Vec<f32> = Vec::new();
    let crossfade_samples = (crossfade_secs * sample_rate as f32) as usize;
    let mut prev_len = 0usize;

    for (teaser, share) in teasers.iter().zip(shares) {
        let Some((start_secs, end_secs)) = best_sub_range(teaser, share, crossfade_secs) else {
            continue;
        };

        let start = (start_secs * sample_rate as f32) as usize;
        let end = ((end_secs * sample_rate as f32) as usize).min(teaser.samples.len());
        let piece = &teaser.samples[start..end];

        if samples.is_empty() {
            samples.extend_from_slice(piece);
        } else {
            let overlap = crossfade_samples.min(prev_len).min(piece.len());
            crossfade_append(&mut samples, piece, overlap);
        }
        prev_len = piece.len();

        parts.push(SummaryPart {
            source: teaser.source.clone(),
            excerpt_start_secs: start_secs,
            excerpt_end_secs: end_secs,
        });
    }

    if parts.len() < 2 {
        return Err(Error::Render(
            "summary reel could not draw excerpts from at least two teasers".into(),
        ));
    }

    Ok(SummaryReel {
        parts,
        samples,
        sample_rate,
    })
}

/// Split the summary duration across tracks, proportional to configured
/// weights (equal weights when none are given).
fn allocate_shares(count: usize, config: &SummaryConfig) -> Result<Vec<f32>> {
    let weights: Vec<f32> = match &config.track_weights {
        Some(w) => {
            if w.len() != count {
                return Err(Error::Config(format!(
                    "summary.track_weights has {} entries for {} teasers",
                    w.len(),
                    count
                )));
            }
            w.clone()
        }
        None => vec![1.0; count],
    };

    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Err(Error::Config(
            "summary.track_weights must sum to a positive value".into(),
        ));
    }

    Ok(weights
        .iter()
        .map(|w| config.duration_secs * (w / total))
        .collect())
}

/// Find the teaser's highest-scoring contiguous run of segments fitting the
/// share, returned as a range in the teaser's rendered timeline.
///
/// Two-pointer sweep over the assembled segments, maximizing score-weighted
/// duration under the share constraint; ties keep the earlier run. When even
/// the single best segment exceeds the share, it is trimmed from its start so
/// the track still contributes.
fn best_sub_range(teaser: &Teaser, share_secs: f32, crossfade_secs: f32) -> Option<(f32, f32)> {
    if share_secs <= 0.0 || teaser.segments.is_empty() {
        return None;
    }

    // Positions of each segment inside the rendered teaser, mirroring the
    // assembler's overlap arithmetic.
    let positions = rendered_positions(&teaser.segments, crossfade_secs);

    let mut best: Option<(usize, usize, f32)> = None; // (first, last, value)
    let mut first = 0usize;
    let mut acc_value = 0.0f32;

    for last in 0..teaser.segments.len() {
        acc_value += segment_value(&teaser.segments[last]);
        while run_duration(&positions, &teaser.segments, first, last) > share_secs && first < last {
            acc_value -= segment_value(&teaser.segments[first]);
            first += 1;
        }
        if run_duration(&positions, &teaser.segments, first, last) > share_secs {
            // Single segment still too long; it competes trimmed.
            let trimmed = segment_value(&teaser.segments[last])
                * (share_secs / teaser.segments[last].duration_secs());
            if best.is_none_or(|(_, _, v)| trimmed > v) {
                best = Some((last, last, trimmed));
            }
            acc_value -= segment_value(&teaser.segments[last]);
            first = last + 1;
            continue;
        }
        if best.is_none_or(|(_, _, v)| acc_value > v) {
            best = Some((first, last, acc_value));
        }
    }

    let (first, last, _) = best?;
    let start = positions[first];
    let end = positions[last] + teaser.segments[last].duration_secs();
    Some((start, start + (end - start).min(share_secs)))
}

/// Start of each segment inside the rendered teaser, accounting for the
/// crossfade overlap consumed at every splice.
fn rendered_positions(segments: &[Segment], crossfade_secs: f32) -> Vec<f32> {
    let mut positions = Vec::with_capacity(segments.len());
    let mut pos = 0.0f32;
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            let overlap = crossfade_secs
                .min(segments[i - 1].duration_secs())
                .min(seg.duration_secs());
            pos -= overlap;
        }
        positions.push(pos.max(0.0));
        pos += seg.duration_secs();
    }
    positions
}

fn run_duration(positions: &[f32], segments: &[Segment], first: usize, last: usize) -> f32 {
    positions[last] + segments[last].duration_secs() - positions[first]
}

/// Score-weighted duration, so a long good segment beats a short great one
/// when both fit.
fn segment_value(seg: &Segment) -> f32 {
    seg.score.max(0.0) * seg.duration_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teaser(name: &str, rate: u32, segments: Vec<Segment>) -> Teaser {
        // Rendered length mirrors the assembler's closed form with zero crossfade.
        let total: f32 = segments.iter().map(Segment::duration_secs).sum();
        Teaser {
            source: PathBuf::from(name),
            segments,
            samples: vec![0.25; (total * rate as f32) as usize],
            sample_rate: rate,
        }
    }

    fn segment(start: f32, end: f32, score: f32) -> Segment {
        Segment {
            start_seconds: start,
            end_seconds: end,
            score,
        }
    }

    fn summary_config(duration: f32) -> SummaryConfig {
        SummaryConfig {
            enabled: true,
            duration_secs: duration,
            track_weights: None,
        }
    }

    #[test]
    fn fewer_than_two_teasers_is_an_error() {
        let t = teaser("a.wav", 1_000, vec![segment(0.0, 10.0, 1.0)]);
        let err = combine_teasers(&[t], &summary_config(60.0), 0.0).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn equal_split_draws_half_from_each() -> anyhow::Result<()> {
        // 60 s and 90 s teasers, 60 s target: ~30 s from each.
        let a = teaser(
            "a.wav",
            1_000,
            vec![
                segment(0.0, 15.0, 2.0),
                segment(20.0, 35.0, 3.0),
                segment(40.0, 70.0, 1.0),
            ],
        );
        let b = teaser(
            "b.wav",
            1_000,
            vec![
                segment(0.0, 30.0, 1.0),
                segment(35.0, 65.0, 4.0),
                segment(70.0, 100.0, 2.0),
            ],
        );

        let reel = combine_teasers(&[a, b], &summary_config(60.0), 0.0)?;
        assert_eq!(reel.parts.len(), 2);
        for part in &reel.parts {
            let drawn = part.excerpt_end_secs - part.excerpt_start_secs;
            assert!((drawn - 30.0).abs() < 1.0, "drawn {drawn} from {part:?}");
        }
        assert!((reel.duration_secs() - 60.0).abs() < 1.0);
        Ok(())
    }

    #[test]
    fn excerpt_prefers_the_highest_scoring_run() -> anyhow::Result<()> {
        let a = teaser(
            "a.wav",
            1_000,
            vec![segment(0.0, 10.0, 0.1), segment(20.0, 30.0, 9.0)],
        );
        let b = teaser("b.wav", 1_000, vec![segment(0.0, 20.0, 1.0)]);

        let reel = combine_teasers(&[a, b], &summary_config(20.0), 0.0)?;
        // Track a's share is 10 s; its excerpt must be the second (strong)
        // segment, which sits at 10.0..20.0 in the rendered teaser.
        let part_a = &reel.parts[0];
        assert_eq!(part_a.excerpt_start_secs, 10.0);
        assert_eq!(part_a.excerpt_end_secs, 20.0);
        Ok(())
    }

    #[test]
    fn custom_weights_shift_allocation() -> anyhow::Result<()> {
        let config = SummaryConfig {
            enabled: true,
            duration_secs: 30.0,
            track_weights: Some(vec![2.0, 1.0]),
        };
        let a = teaser("a.wav", 1_000, vec![segment(0.0, 40.0, 1.0)]);
        let b = teaser("b.wav", 1_000, vec![segment(0.0, 40.0, 1.0)]);

        let reel = combine_teasers(&[a, b], &config, 0.0)?;
        let drawn_a = reel.parts[0].excerpt_end_secs - reel.parts[0].excerpt_start_secs;
        let drawn_b = reel.parts[1].excerpt_end_secs - reel.parts[1].excerpt_start_secs;
        assert!((drawn_a - 20.0).abs() < 0.5);
        assert!((drawn_b - 10.0).abs() < 0.5);
        Ok(())
    }

    #[test]
    fn mismatched_sample_rates_are_rejected() {
        let a = teaser("a.wav", 44_100, vec![segment(0.0, 10.0, 1.0)]);
        let b = teaser("b.wav", 48_000, vec![segment(0.0, 10.0, 1.0)]);
        let err = combine_teasers(&[a, b], &summary_config(30.0), 0.0).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn weight_count_mismatch_is_a_config_error() {
        let config = SummaryConfig {
            enabled: true,
            duration_secs: 30.0,
            track_weights: Some(vec![1.0]),
        };
        let a = teaser("a.wav", 1_000, vec![segment(0.0, 10.0, 1.0)]);
        let b = teaser("b.wav", 1_000, vec![segment(0.0, 10.0, 1.0)]);
        let err = combine_teasers(&[a, b], &config, 0.0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

//! Greedy, deterministic segment selection over an interest curve.
//!
//! The selector scores every candidate window of every admissible length by
//! integrating the curve (prefix sums), then repeatedly takes the
//! highest-scoring admissible window, consuming it plus a gap of padding
//! around it, until the remaining target budget drops below the minimum
//! segment length or candidates run out.
//!
//! Recovered conditions are modeled as [`SelectionOutcome`] variants rather
//! than raised-and-caught control flow:
//! - a flat curve falls back to the earliest admissible window
//! - a shortfall against the target is reported, not thrown
//!
//! Only a track with zero admissible windows at all produces
//! [`Error::InsufficientContent`].

use serde::Serialize;

use crate::config::TeaserConfig;
use crate::error::{Error, Result};
use crate::scoring::InterestCurve;

/// One chosen time window, with its mean interest score kept for diagnostics
/// and for the summary combiner's re-selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub score: f32,
}

impl Segment {
    pub fn duration_secs(&self) -> f32 {
        self.end_seconds - self.start_seconds
    }
}

/// How the selection ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionOutcome {
    /// Achieved duration is within one maximum segment length of the target.
    TargetMet,
    /// Candidates ran out materially below target; the teaser will be shorter.
    Shortfall { achieved: f32, target: f32 },
    /// The curve was flat (silent or clipped track); the deterministic
    /// earliest-window fallback was used instead of ranking.
    FlatFallback,
}

/// A time-ordered, pairwise-disjoint set of segments plus the outcome.
#[derive(Debug, Clone)]
pub struct Selection {
    pub segments: Vec<Segment>,
    pub outcome: SelectionOutcome,
}

impl Selection {
    pub fn total_duration_secs(&self) -> f32 {
        self.segments.iter().map(Segment::duration_secs).sum()
    }
}

/// Selection constraints, usually derived from [`TeaserConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SelectionParams {
    pub target_secs: f32,
    pub min_segment_secs: f32,
    pub max_segment_secs: f32,
    pub gap_secs: f32,
    /// Hard cap on how many segments one selection may return.
    pub max_segments: usize,
}

impl SelectionParams {
    pub fn from_config(config: &TeaserConfig) -> Self {
        Self {
            target_secs: config.teaser_duration_secs,
            min_segment_secs: config.min_segment_len_secs,
            max_segment_secs: config.max_segment_len_secs,
            gap_secs: config.segment_gap_secs,
            max_segments: (config.teaser_duration_secs / config.min_segment_len_secs).ceil()
                as usize,
        }
    }
}

/// Select a disjoint segment set from the interest curve.
///
/// Guarantees:
/// - segments are returned in source-time order
/// - no segment overlaps another, or comes within `gap_secs` of one
/// - no segment overlaps a frame carrying the exclusion floor
/// - identical input and parameters always produce the identical set
pub fn select_segments(curve: &InterestCurve, params: &SelectionParams) -> Result<Selection> {
    let hop = curve.hop_secs;
    let frames = curve.len();

    let min_frames = ((params.min_segment_secs / hop).ceil() as usize).max(1);
    let max_frames = ((params.max_segment_secs / hop).floor() as usize).max(min_frames);
    let gap_frames = (params.gap_secs / hop).ceil() as usize;
    let target_frames = (params.target_secs / hop).round() as usize;

    if curve.is_flat() {
        return flat_fallback(curve, params, min_frames, target_frames);
    }

    // Integral of the curve for O(1) window scoring.
    let mut prefix = vec![0.0f64; frames + 1];
    for (i, &v) in curve.values.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v as f64;
    }

    // Enumerate every admissible window once. Windows touching an excluded
    // frame are never candidates, which is what makes the exclusion guarantee
    // structural rather than checked after the fact.
    let mut next_excluded = vec![frames; frames + 1];
    for i in (0..frames).rev() {
        next_excluded[i] = if curve.is_excluded(i) {
            i
        } else {
            next_excluded[i + 1]
        };
    }

    struct Candidate {
        start: usize,
        len: usize,
        mean: f64,
    }

    let mut candidates = Vec::new();
    for start in 0..frames {
        let run_end = next_excluded[start];
        let longest = run_end.saturating_sub(start).min(max_frames);
        for len in min_frames..=longest {
            let mean = (prefix[start + len] - prefix[start]) / len as f64;
            candidates.push(Candidate { start, len, mean });
        }
    }

    if candidates.is_empty() {
        return Err(Error::InsufficientContent {
            achieved: 0.0,
            target: params.target_secs,
        });
    }

    // Deterministic order: best mean first, ties broken by earliest start,
    // then by longer window (greedy budget fill).
    candidates.sort_by(|a, b| {
        b.mean
            .total_cmp(&a.mean)
            .then(a.start.cmp(&b.start))
            .then(b.len.cmp(&a.len))
    });

    let mut consumed = vec![false; frames];
    let mut chosen: Vec<(usize, usize, f64)> = Vec::new();
    let mut remaining = target_frames as i64;

    for cand in &candidates {
        if remaining < min_frames as i64 || chosen.len() >= params.max_segments {
            break;
        }
        // The final pick may exceed the remaining budget by less than one
        // segment, but never start past it.
        if cand.len as i64 > remaining.max(min_frames as i64) {
            continue;
        }
        if consumed[cand.start..cand.start + cand.len].iter().any(|c| *c) {
            continue;
        }

        let pad_start = cand.start.saturating_sub(gap_frames);
        let pad_end = (cand.start + cand.len + gap_frames).min(frames);
        for slot in &mut consumed[pad_start..pad_end] {
            *slot = true;
        }

        chosen.push((cand.start, cand.len, cand.mean));
        remaining -= cand.len as i64;
    }

    if chosen.is_empty() {
        return Err(Error::InsufficientContent {
            achieved: 0.0,
            target: params.target_secs,
        });
    }

    chosen.sort_by_key(|(start, _, _)| *start);

    let segments: Vec<Segment> = chosen
        .into_iter()
        .map(|(start, len, mean)| Segment {
            start_seconds: start as f32 * hop,
            end_seconds: (start + len) as f32 * hop,
            score: mean as f32,
        })
        .collect();

    let achieved: f32 = segments.iter().map(Segment::duration_secs).sum();
    let outcome = if achieved >= params.target_secs - params.max_segment_secs {
        SelectionOutcome::TargetMet
    } else {
        SelectionOutcome::Shortfall {
            achieved,
            target: params.target_secs,
        }
    };

    Ok(Selection { segments, outcome })
}

/// Deterministic default for flat curves: the earliest admissible run,
/// trimmed to the target length.
///
/// The window may exceed the usual maximum segment length — it is one
/// continuous excerpt standing in for a whole teaser, not a ranked pick.
fn flat_fallback(
    curve: &InterestCurve,
    params: &SelectionParams,
    min_frames: usize,
    target_frames: usize,
) -> Result<Selection> {
    let frames = curve.len();
    let mut start = 0usize;

    while start < frames {
        if curve.is_excluded(start) {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < frames && !curve.is_excluded(end) {
            end += 1;
        }
        let run = end - start;
        if run >= min_frames {
            let len = run.min(target_frames.max(min_frames));
            return Ok(Selection {
                segments: vec![Segment {
                    start_seconds: start as f32 * curve.hop_secs,
                    end_seconds: (start + len) as f32 * curve.hop_secs,
                    score: 0.0,
                }],
                outcome: SelectionOutcome::FlatFallback,
            });
        }
        start = end;
    }

    Err(Error::InsufficientContent {
        achieved: 0.0,
        target: params.target_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::EXCLUDED;

    fn curve(values: Vec<f32>) -> InterestCurve {
        InterestCurve {
            hop_secs: 0.5,
            values,
        }
    }

    fn params(target: f32) -> SelectionParams {
        SelectionParams {
            target_secs: target,
            min_segment_secs: 2.0,
            max_segment_secs: 6.0,
            gap_secs: 1.0,
            max_segments: 32,
        }
    }

    /// A curve with a few obvious peaks over 120 frames (60 s at 0.5 s hop).
    fn peaked_curve() -> InterestCurve {
        let mut values = vec![0.1f32; 120];
        for (i, v) in values.iter_mut().enumerate() {
            // Peaks around frames 20, 60, 100.
            for peak in [20i32, 60, 100] {
                let d = (i as i32 - peak).abs() as f32;
                *v += (3.0 - d * 0.3).max(0.0);
            }
        }
        curve(values)
    }

    fn assert_disjoint_with_gap(segments: &[Segment], gap: f32) {
        for pair in segments.windows(2) {
            assert!(
                pair[1].start_seconds - pair[0].end_seconds >= gap - 1e-6,
                "segments too close: {pair:?}"
            );
        }
    }

    #[test]
    fn segments_are_disjoint_and_gapped() -> anyhow::Result<()> {
        let selection = select_segments(&peaked_curve(), &params(20.0))?;
        assert!(!selection.segments.is_empty());
        assert_disjoint_with_gap(&selection.segments, 1.0);
        Ok(())
    }

    #[test]
    fn segments_avoid_excluded_frames() -> anyhow::Result<()> {
        let mut c = peaked_curve();
        // Exclude the strongest peak region outright.
        for v in &mut c.values[50..75] {
            *v = EXCLUDED;
        }
        let selection = select_segments(&c, &params(20.0))?;
        for seg in &selection.segments {
            let first = (seg.start_seconds / 0.5) as usize;
            let last = (seg.end_seconds / 0.5) as usize;
            assert!(
                (first..last).all(|f| !c.is_excluded(f)),
                "segment {seg:?} touches excluded time"
            );
        }
        Ok(())
    }

    #[test]
    fn total_duration_never_exceeds_target_plus_one_segment() -> anyhow::Result<()> {
        let p = params(20.0);
        let selection = select_segments(&peaked_curve(), &p)?;
        assert!(selection.total_duration_secs() <= p.target_secs + p.max_segment_secs + 1e-3);
        Ok(())
    }

    #[test]
    fn selection_is_deterministic() -> anyhow::Result<()> {
        let a = select_segments(&peaked_curve(), &params(20.0))?;
        let b = select_segments(&peaked_curve(), &params(20.0))?;
        assert_eq!(a.segments, b.segments);
        Ok(())
    }

    #[test]
    fn best_peak_is_chosen_first() -> anyhow::Result<()> {
        // One dominant plateau; a small target should land exactly on it.
        let mut values = vec![0.0f32; 120];
        for v in &mut values[40..52] {
            *v = 5.0;
        }
        let selection = select_segments(&curve(values), &params(6.0))?;
        assert_eq!(selection.segments.len(), 1);
        let seg = &selection.segments[0];
        assert!(seg.start_seconds >= 19.0 && seg.end_seconds <= 27.0, "{seg:?}");
        Ok(())
    }

    #[test]
    fn flat_curve_falls_back_to_earliest_window_of_target_length() -> anyhow::Result<()> {
        // 1800 s flat track, 60 s target: one 60 s segment starting at 0.
        let c = curve(vec![0.0; 3600]);
        let p = SelectionParams {
            target_secs: 60.0,
            min_segment_secs: 10.0,
            max_segment_secs: 15.0,
            gap_secs: 1.0,
            max_segments: 8,
        };
        let selection = select_segments(&c, &p)?;
        assert_eq!(selection.outcome, SelectionOutcome::FlatFallback);
        assert_eq!(selection.segments.len(), 1);
        assert_eq!(selection.segments[0].start_seconds, 0.0);
        assert_eq!(selection.segments[0].end_seconds, 60.0);
        Ok(())
    }

    #[test]
    fn flat_fallback_skips_leading_exclusion() -> anyhow::Result<()> {
        let mut values = vec![0.0f32; 3600];
        for v in &mut values[..120] {
            *v = EXCLUDED;
        }
        let selection = select_segments(&curve(values), &params(10.0))?;
        assert_eq!(selection.outcome, SelectionOutcome::FlatFallback);
        assert_eq!(selection.segments[0].start_seconds, 60.0);
        Ok(())
    }

    #[test]
    fn fully_excluded_curve_is_insufficient_content() {
        let c = curve(vec![EXCLUDED; 240]);
        let err = select_segments(&c, &params(20.0)).unwrap_err();
        assert!(matches!(err, Error::InsufficientContent { .. }));
    }

    #[test]
    fn tight_exclusions_report_shortfall_not_failure() -> anyhow::Result<()> {
        // Only one small admissible island: 4 s of content against a 30 s target.
        let mut values = vec![EXCLUDED; 240];
        for (i, v) in values[100..108].iter_mut().enumerate() {
            *v = 1.0 + i as f32 * 0.1;
        }
        let selection = select_segments(&curve(values), &params(30.0))?;
        assert_eq!(selection.segments.len(), 1);
        match selection.outcome {
            SelectionOutcome::Shortfall { achieved, target } => {
                assert!(achieved < target);
            }
            other => panic!("expected shortfall, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn max_segments_caps_the_selection() -> anyhow::Result<()> {
        let mut p = params(40.0);
        p.max_segments = 2;
        let selection = select_segments(&peaked_curve(), &p)?;
        assert!(selection.segments.len() <= 2);
        Ok(())
    }

    #[test]
    fn more_admissible_content_never_shrinks_achieved_duration() -> anyhow::Result<()> {
        // Monotonicity: opening up excluded time can only help.
        let mut restricted = peaked_curve();
        for v in &mut restricted.values[80..120] {
            *v = EXCLUDED;
        }
        let open = peaked_curve();

        let p = params(30.0);
        let restricted_total = select_segments(&restricted, &p)?.total_duration_secs();
        let open_total = select_segments(&open, &p)?.total_duration_secs();
        assert!(open_total >= restricted_total - 1e-6);
        Ok(())
    }
}

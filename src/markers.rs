//! Marker resolution: caller-supplied content markers plus transcript cues
//! become one ordered, non-contradictory annotation timeline.
//!
//! Resolution rules:
//! - malformed markers (start >= end, or outside the track) are dropped with a
//!   warning rather than aborting the run
//! - hard exclusions (`exclude`, synthesized `intro`/`outro`) always win: soft
//!   annotations overlapping them are clipped to the non-excluded remainder
//! - transcript segments matching configured highlight keywords become
//!   `highlight` annotations, weighted by keyword relevance and transcript
//!   confidence

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::TeaserConfig;
use crate::transcript::TranscriptSegment;

/// A raw caller-supplied marker, typically loaded from a JSON markers file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContentMarker {
    pub kind: MarkerKind,
    pub start_seconds: f32,
    pub end_seconds: f32,
    #[serde(default = "default_marker_weight")]
    pub weight: f32,
}

fn default_marker_weight() -> f32 {
    1.0
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Include,
    Exclude,
    Highlight,
}

/// The kind of a resolved annotation.
///
/// `Exclude`, `Intro` and `Outro` are hard constraints; `Include` and
/// `Highlight` are soft score boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Include,
    Exclude,
    Intro,
    Outro,
    Highlight,
}

impl AnnotationKind {
    pub fn is_hard(self) -> bool {
        matches!(self, Self::Exclude | Self::Intro | Self::Outro)
    }
}

/// A typed, weighted time interval on the track timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub weight: f32,
}

/// Result of marker resolution, including how many inputs had to be dropped so
/// the batch report can surface it.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAnnotations {
    pub annotations: Vec<Annotation>,
    pub dropped_markers: usize,
}

/// Resolve raw markers and transcript cues into an ordered annotation set.
pub fn resolve_annotations(
    duration_secs: f32,
    markers: &[ContentMarker],
    transcript: &[TranscriptSegment],
    config: &TeaserConfig,
) -> ResolvedAnnotations {
    let mut dropped = 0usize;
    let mut hard = Vec::new();
    let mut soft = Vec::new();

    for marker in markers {
        if let Some(reason) = marker_problem(marker, duration_secs) {
            warn!(
                start = marker.start_seconds,
                end = marker.end_seconds,
                %reason,
                "dropping malformed content marker"
            );
            dropped += 1;
            continue;
        }

        match marker.kind {
            MarkerKind::Exclude => hard.push(Annotation {
                kind: AnnotationKind::Exclude,
                start_seconds: marker.start_seconds,
                end_seconds: marker.end_seconds,
                weight: 1.0,
            }),
            MarkerKind::Include => soft.push(Annotation {
                kind: AnnotationKind::Include,
                start_seconds: marker.start_seconds,
                end_seconds: marker.end_seconds,
                weight: marker.weight,
            }),
            MarkerKind::Highlight => soft.push(Annotation {
                kind: AnnotationKind::Highlight,
                start_seconds: marker.start_seconds,
                end_seconds: marker.end_seconds,
                weight: marker.weight,
            }),
        }
    }

    if config.exclude_intro_outro {
        let intro_end = config.intro_len_secs.min(duration_secs);
        if intro_end > 0.0 {
            hard.push(Annotation {
                kind: AnnotationKind::Intro,
                start_seconds: 0.0,
                end_seconds: intro_end,
                weight: 1.0,
            });
        }
        let outro_start = (duration_secs - config.outro_len_secs).max(0.0);
        if outro_start < duration_secs {
            hard.push(Annotation {
                kind: AnnotationKind::Outro,
                start_seconds: outro_start,
                end_seconds: duration_secs,
                weight: 1.0,
            });
        }
    }

    soft.extend(keyword_highlights(transcript, config));

    // Exclusions win: clip every soft annotation to its non-excluded remainder.
    let hard_intervals: Vec<(f32, f32)> = hard
        .iter()
        .map(|a| (a.start_seconds, a.end_seconds))
        .collect();

    let mut annotations = hard;
    for ann in soft {
        for (start, end) in subtract_intervals(ann.start_seconds, ann.end_seconds, &hard_intervals)
        {
            annotations.push(Annotation {
                kind: ann.kind,
                start_seconds: start,
                end_seconds: end,
                weight: ann.weight,
            });
        }
    }

    annotations.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

    ResolvedAnnotations {
        annotations,
        dropped_markers: dropped,
    }
}

fn marker_problem(marker: &ContentMarker, duration_secs: f32) -> Option<&'static str> {
    if marker.start_seconds >= marker.end_seconds {
        return Some("start is not before end");
    }
    if marker.start_seconds < 0.0 || marker.end_seconds > duration_secs {
        return Some("marker lies outside the track");
    }
    None
}

/// Transcript segments whose text matches a configured keyword become highlights.
///
/// Matching is a case-insensitive substring check; the highlight weight is
/// keyword relevance scaled by the segment's transcription confidence.
fn keyword_highlights(
    transcript: &[TranscriptSegment],
    config: &TeaserConfig,
) -> Vec<Annotation> {
    if config.highlight_keywords.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for seg in transcript {
        let text = seg.text.to_lowercase();
        let relevance: f32 = config
            .highlight_keywords
            .iter()
            .filter(|kw| text.contains(&kw.term.to_lowercase()))
            .map(|kw| kw.relevance)
            .sum();
        if relevance > 0.0 {
            out.push(Annotation {
                kind: AnnotationKind::Highlight,
                start_seconds: seg.start_seconds,
                end_seconds: seg.end_seconds,
                weight: relevance * seg.confidence,
            });
        }
    }
    out
}

/// Subtract a set of intervals from `[start, end)`, returning the remainders.
fn subtract_intervals(start: f32, end: f32, holes: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut pieces = vec![(start, end)];
    for &(hole_start, hole_end) in holes {
        let mut next = Vec::with_capacity(pieces.len() + 1);
        for (s, e) in pieces {
            if hole_end <= s || hole_start >= e {
                next.push((s, e));
                continue;
            }
            if hole_start > s {
                next.push((s, hole_start));
            }
            if hole_end < e {
                next.push((hole_end, e));
            }
        }
        pieces = next;
    }
    pieces.retain(|(s, e)| e - s > f32::EPSILON);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TeaserConfig {
        TeaserConfig::default()
    }

    fn marker(kind: MarkerKind, start: f32, end: f32) -> ContentMarker {
        ContentMarker {
            kind,
            start_seconds: start,
            end_seconds: end,
            weight: 1.0,
        }
    }

    #[test]
    fn malformed_markers_are_dropped_not_fatal() {
        let markers = vec![
            marker(MarkerKind::Include, 10.0, 5.0),   // inverted
            marker(MarkerKind::Exclude, -5.0, 10.0),  // before track start
            marker(MarkerKind::Exclude, 50.0, 200.0), // past track end
            marker(MarkerKind::Include, 20.0, 30.0),  // valid
        ];
        let resolved = resolve_annotations(100.0, &markers, &[], &config());
        assert_eq!(resolved.dropped_markers, 3);
        assert_eq!(resolved.annotations.len(), 1);
        assert_eq!(resolved.annotations[0].kind, AnnotationKind::Include);
    }

    #[test]
    fn include_inside_exclude_leaves_no_soft_coverage() {
        let markers = vec![
            marker(MarkerKind::Exclude, 10.0, 40.0),
            marker(MarkerKind::Include, 15.0, 30.0),
        ];
        let resolved = resolve_annotations(100.0, &markers, &[], &config());
        assert!(
            resolved
                .annotations
                .iter()
                .all(|a| a.kind != AnnotationKind::Include)
        );
    }

    #[test]
    fn include_straddling_exclude_is_split_in_two() {
        let markers = vec![
            marker(MarkerKind::Exclude, 20.0, 30.0),
            marker(MarkerKind::Include, 10.0, 40.0),
        ];
        let resolved = resolve_annotations(100.0, &markers, &[], &config());
        let includes: Vec<_> = resolved
            .annotations
            .iter()
            .filter(|a| a.kind == AnnotationKind::Include)
            .collect();
        assert_eq!(includes.len(), 2);
        assert_eq!(
            (includes[0].start_seconds, includes[0].end_seconds),
            (10.0, 20.0)
        );
        assert_eq!(
            (includes[1].start_seconds, includes[1].end_seconds),
            (30.0, 40.0)
        );
    }

    #[test]
    fn intro_outro_synthesized_only_when_configured() {
        let mut cfg = config();
        let resolved = resolve_annotations(300.0, &[], &[], &cfg);
        assert!(resolved.annotations.is_empty());

        cfg.exclude_intro_outro = true;
        let resolved = resolve_annotations(300.0, &[], &[], &cfg);
        assert_eq!(resolved.annotations.len(), 2);
        assert_eq!(resolved.annotations[0].kind, AnnotationKind::Intro);
        assert_eq!(resolved.annotations[0].end_seconds, cfg.intro_len_secs);
        assert_eq!(resolved.annotations[1].kind, AnnotationKind::Outro);
        assert_eq!(
            resolved.annotations[1].start_seconds,
            300.0 - cfg.outro_len_secs
        );
    }

    #[test]
    fn keyword_match_becomes_weighted_highlight() {
        let mut cfg = config();
        cfg.highlight_keywords = vec![crate::config::HighlightKeyword {
            term: "Amazing".into(),
            relevance: 2.0,
        }];
        let transcript = vec![TranscriptSegment {
            start_seconds: 12.0,
            end_seconds: 18.0,
            text: "that was truly amazing stuff".into(),
            confidence: 0.5,
        }];
        let resolved = resolve_annotations(100.0, &[], &transcript, &cfg);
        assert_eq!(resolved.annotations.len(), 1);
        let ann = &resolved.annotations[0];
        assert_eq!(ann.kind, AnnotationKind::Highlight);
        assert!((ann.weight - 1.0).abs() < 1e-6); // 2.0 relevance * 0.5 confidence
    }

    #[test]
    fn annotations_come_back_time_ordered() {
        let markers = vec![
            marker(MarkerKind::Include, 50.0, 60.0),
            marker(MarkerKind::Exclude, 5.0, 10.0),
            marker(MarkerKind::Highlight, 20.0, 25.0),
        ];
        let resolved = resolve_annotations(100.0, &markers, &[], &config());
        let starts: Vec<f32> = resolved
            .annotations
            .iter()
            .map(|a| a.start_seconds)
            .collect();
        let mut sorted = starts.clone();
        sorted.sort_by(f32::total_cmp);
        assert_eq!(starts, sorted);
    }
}

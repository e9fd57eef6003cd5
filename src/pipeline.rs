//! High-level wiring: per-track pipeline and the batch runner.
//!
//! We expose a single entry point (`TeaserPipeline`) that wires up
//! decode → transcript → features → markers → scoring → selection → assembly,
//! while keeping the lower-level pieces testable in their own modules.
//!
//! Batch runs fan tracks out over a worker pool bounded by the CPU count.
//! Tracks share nothing: each worker owns its track's samples and intermediate
//! series and drops them as soon as the next stage's output exists. The only
//! cross-track coordination is collecting finished teasers for the summary
//! combiner, which acts as the join point.
//!
//! Failure policy: one track's failure (or cancellation) never aborts its
//! siblings; only invalid configuration aborts before any track runs.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use tracing::{info, warn};

use crate::assembler::{Teaser, render_teaser};
use crate::config::TeaserConfig;
use crate::decoder::decode_track;
use crate::diagnostics::AnalysisSnapshot;
use crate::error::{Error, Result};
use crate::features::{AnalysisParams, extract_features};
use crate::markers::{ContentMarker, resolve_annotations};
use crate::scoring::score_track;
use crate::selector::{SelectionOutcome, SelectionParams, select_segments};
use crate::transcript::Transcriber;

/// A cooperative cancellation handle for one track.
///
/// Cloning shares the flag: keep one clone, submit the other with the track.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One track submitted to a batch run.
#[derive(Debug, Clone)]
pub struct BatchTrack {
    pub path: PathBuf,
    pub cancel: CancelFlag,
}

impl BatchTrack {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cancel: CancelFlag::new(),
        }
    }
}

/// The outcome of one successfully processed track.
#[derive(Debug)]
pub struct TrackReport {
    pub teaser: Teaser,
    pub outcome: SelectionOutcome,
    pub dropped_markers: usize,
    /// Present only when diagnostics were requested; otherwise the analysis
    /// series are dropped as soon as selection is done.
    pub snapshot: Option<AnalysisSnapshot>,
}

/// The outcome of a whole batch run.
pub struct BatchReport {
    /// Successful track reports, in batch submission order.
    pub reports: Vec<TrackReport>,
    /// Failed tracks with the error that stopped each one.
    pub failures: Vec<(PathBuf, Error)>,
    pub summary: Option<crate::summary::SummaryReel>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// The teaser-generation engine.
///
/// Construction validates the configuration once; afterwards the pipeline is
/// immutable and safe to share across worker threads. It holds no state
/// between runs.
pub struct TeaserPipeline {
    config: TeaserConfig,
    want_diagnostics: bool,
}

impl TeaserPipeline {
    pub fn new(config: TeaserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            want_diagnostics: false,
        })
    }

    /// Retain per-track analysis snapshots for the visualization collaborator.
    pub fn with_diagnostics(mut self) -> Self {
        self.want_diagnostics = true;
        self
    }

    pub fn config(&self) -> &TeaserConfig {
        &self.config
    }

    /// Run the full per-track pipeline: decode, analyze, select, render.
    ///
    /// Each stage's working buffers are released once its successor's output
    /// exists; only segment scores survive to the teaser for provenance.
    pub fn process_track(
        &self,
        path: &PathBuf,
        markers: &[ContentMarker],
        transcriber: Option<&dyn Transcriber>,
        cancel: &CancelFlag,
    ) -> Result<TrackReport> {
        cancel.checkpoint()?;
        let track = decode_track(path)?;
        info!(
            track = %path.display(),
            duration_secs = track.duration_secs(),
            sample_rate = track.sample_rate,
            "decoded track"
        );

        cancel.checkpoint()?;
        let transcript = match (self.config.transcription_enabled, transcriber) {
            (true, Some(t)) => t.transcribe(&track.samples, track.sample_rate)?,
            _ => Vec::new(),
        };

        cancel.checkpoint()?;
        let params = AnalysisParams {
            frame_secs: self.config.frame_secs,
            hop_secs: self.config.hop_secs,
        };
        let transcript_ref = (!transcript.is_empty()).then_some(transcript.as_slice());
        let features = extract_features(&track, transcript_ref, &params)?;

        let resolved = resolve_annotations(track.duration_secs(), markers, &transcript, &self.config);
        if resolved.dropped_markers > 0 {
            warn!(
                track = %path.display(),
                dropped = resolved.dropped_markers,
                "some content markers were malformed and ignored"
            );
        }
        drop(transcript);

        cancel.checkpoint()?;
        let curve = score_track(
            &features,
            &resolved.annotations,
            &self.config.weights,
            self.config.highlight_boost,
        );

        let selection = select_segments(&curve, &SelectionParams::from_config(&self.config))?;
        if let SelectionOutcome::Shortfall { achieved, target } = selection.outcome {
            warn!(
                track = %path.display(),
                achieved, target,
                "admissible content ran out below target; emitting a shorter teaser"
            );
        }

        let snapshot = self
            .want_diagnostics
            .then(|| AnalysisSnapshot::new(path, &features, &curve, &selection.segments));
        drop(features);
        drop(curve);

        cancel.checkpoint()?;
        let teaser = render_teaser(&track, &selection.segments, self.config.crossfade_secs)?;
        info!(
            track = %path.display(),
            segments = teaser.segments.len(),
            teaser_secs = teaser.duration_secs(),
            "rendered teaser"
        );

        Ok(TrackReport {
            teaser,
            outcome: selection.outcome,
            dropped_markers: resolved.dropped_markers,
            snapshot,
        })
    }

    /// Process a batch of tracks in parallel and, when configured and at least
    /// two teasers exist, combine them into a summary reel.
    ///
    /// Markers apply to every track in the batch (the marker resolver drops
    /// the ones that fall outside a given track).
    pub fn run_batch(
        &self,
        tracks: &[BatchTrack],
        markers: &[ContentMarker],
        transcriber: Option<&(dyn Transcriber + Sync)>,
    ) -> BatchReport {
        let workers = num_cpus::get().min(tracks.len()).max(1);
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, Result<TrackReport>)>();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                scope.spawn(move || {
                    loop {
                        let i = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(job) = tracks.get(i) else { break };
                        let res = self.process_track(
                            &job.path,
                            markers,
                            transcriber.map(|t| t as &dyn Transcriber),
                            &job.cancel,
                        );
                        if tx.send((i, res)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut slots: Vec<Option<Result<TrackReport>>> =
                (0..tracks.len()).map(|_| None).collect();
            for (i, res) in rx {
                slots[i] = Some(res);
            }

            let mut reports = Vec::new();
            let mut failures = Vec::new();
            for (job, slot) in tracks.iter().zip(slots) {
                match slot {
                    Some(Ok(report)) => reports.push(report),
                    Some(Err(err)) => {
                        warn!(track = %job.path.display(), error = %err, "track failed");
                        failures.push((job.path.clone(), err));
                    }
                    // A worker panic would leave a hole; surface it as a failure.
                    None => failures.push((
                        job.path.clone(),
                        Error::msg("track worker terminated without a result"),
                    )),
                }
            }

            let summary = self.maybe_combine(&reports);
            info!(
                succeeded = reports.len(),
                failed = failures.len(),
                summary = summary.is_some(),
                "batch complete"
            );

            BatchReport {
                reports,
                failures,
                summary,
            }
        })
    }

    fn maybe_combine(&self, reports: &[TrackReport]) -> Option<crate::summary::SummaryReel> {
        if !self.config.summary.enabled || reports.len() < 2 {
            return None;
        }
        let teasers: Vec<Teaser> = reports.iter().map(|r| r.teaser.clone()).collect();
        match crate::summary::combine_teasers(
            &teasers,
            &self.config.summary,
            self.config.crossfade_secs,
        ) {
            Ok(reel) => Some(reel),
            Err(err) => {
                warn!(error = %err, "summary reel could not be built");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_fails_at_construction() {
        let config = TeaserConfig {
            teaser_duration_secs: -1.0,
            ..TeaserConfig::default()
        };
        assert!(matches!(
            TeaserPipeline::new(config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn cancelled_flag_stops_a_track_before_decode() {
        let pipeline = TeaserPipeline::new(TeaserConfig::default()).expect("valid config");
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = pipeline
            .process_track(&PathBuf::from("never-read.wav"), &[], None, &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}

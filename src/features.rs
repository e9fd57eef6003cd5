//! Acoustic feature extraction.
//!
//! Turns a decoded track into a set of time-aligned scalar feature series:
//! - `energy`: per-frame RMS, a loudness proxy
//! - `spectral_flux`: half-wave rectified frame-to-frame STFT magnitude change,
//!   a timbral-shift proxy useful for detecting topic/tone changes
//! - `speech_density`: fraction of the frame covered by transcript speech
//!   (only present when a transcript was supplied)
//!
//! All series share one uniform time grid (`hop_secs` step) and length. Frames
//! with no defined value (the first flux frame) are backfilled with `0.0` and
//! should be treated as low-confidence rather than meaningful zeros.
//!
//! Extraction is a pure function of its inputs; it performs no I/O.

use std::collections::BTreeMap;

use rustfft::{FftPlanner, num_complex::Complex};

use crate::error::{Error, Result};
use crate::track::Track;
use crate::transcript::TranscriptSegment;

pub const ENERGY: &str = "energy";
pub const SPECTRAL_FLUX: &str = "spectral_flux";
pub const SPEECH_DENSITY: &str = "speech_density";

/// FFT size for the spectral-flux STFT. Analysis frames longer than this are
/// truncated to the window; shorter ones are zero-padded.
const FLUX_FFT_SIZE: usize = 2048;

/// Windowing parameters for the analysis frame grid.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisParams {
    pub frame_secs: f32,
    pub hop_secs: f32,
}

/// A set of feature series sharing one time grid.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub hop_secs: f32,
    pub frames: usize,
    series: BTreeMap<String, Vec<f32>>,
}

impl FeatureSet {
    /// Assemble a set from pre-computed series. Every series must already
    /// share the given grid; extraction is the normal way to get one of these.
    pub(crate) fn from_parts(
        hop_secs: f32,
        frames: usize,
        series: BTreeMap<String, Vec<f32>>,
    ) -> Self {
        Self {
            hop_secs,
            frames,
            series,
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Time of frame `i`'s start in seconds.
    pub fn frame_time(&self, i: usize) -> f32 {
        i as f32 * self.hop_secs
    }
}

/// Extract all feature series for one track.
///
/// Fails with [`Error::Decode`] when the track is empty or shorter than one
/// analysis frame; every series in the result has exactly the same length.
pub fn extract_features(
    track: &Track,
    transcript: Option<&[TranscriptSegment]>,
    params: &AnalysisParams,
) -> Result<FeatureSet> {
    let frame_len = (params.frame_secs * track.sample_rate as f32) as usize;
    let hop_len = (params.hop_secs * track.sample_rate as f32) as usize;

    if frame_len == 0 || hop_len == 0 {
        return Err(Error::msg("analysis frame and hop must span >= 1 sample"));
    }
    if track.samples.len() < frame_len {
        return Err(Error::Decode {
            path: track.source.clone(),
            reason: format!(
                "track too short for analysis: {} samples < one {}-sample frame",
                track.samples.len(),
                frame_len
            ),
        });
    }

    let frames = (track.samples.len() - frame_len) / hop_len + 1;

    let mut series = BTreeMap::new();
    series.insert(ENERGY.to_owned(), frame_energy(track, frame_len, hop_len, frames));
    series.insert(
        SPECTRAL_FLUX.to_owned(),
        spectral_flux(track, frame_len, hop_len, frames),
    );
    if let Some(segments) = transcript {
        series.insert(
            SPEECH_DENSITY.to_owned(),
            speech_density(segments, params, frames),
        );
    }

    Ok(FeatureSet {
        hop_secs: params.hop_secs,
        frames,
        series,
    })
}

/// Per-frame RMS energy.
fn frame_energy(track: &Track, frame_len: usize, hop_len: usize, frames: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(frames);
    for i in 0..frames {
        let frame = &track.samples[i * hop_len..i * hop_len + frame_len];
        let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
        out.push((sum_sq / frame_len as f32).sqrt());
    }
    out
}

/// Half-wave rectified spectral flux on the analysis frame grid.
///
/// Each frame's leading samples are Hann-windowed and transformed; the flux is
/// the mean positive magnitude change against the previous frame. The first
/// frame has no predecessor and is backfilled with `0.0`.
fn spectral_flux(track: &Track, frame_len: usize, hop_len: usize, frames: usize) -> Vec<f32> {
    let window_len = frame_len.min(FLUX_FFT_SIZE);
    let hann = hann_window(window_len);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FLUX_FFT_SIZE);
    let bins = FLUX_FFT_SIZE / 2 + 1;

    let mut out = Vec::with_capacity(frames);
    let mut prev_mag: Option<Vec<f32>> = None;
    let mut buf = vec![Complex::new(0.0f32, 0.0); FLUX_FFT_SIZE];

    for i in 0..frames {
        let frame = &track.samples[i * hop_len..i * hop_len + frame_len];

        for (j, slot) in buf.iter_mut().enumerate() {
            let sample = if j < window_len {
                frame[j] * hann[j]
            } else {
                0.0
            };
            *slot = Complex::new(sample, 0.0);
        }
        fft.process(&mut buf);

        let mag: Vec<f32> = buf[..bins].iter().map(|c| c.norm()).collect();

        let flux = match &prev_mag {
            Some(prev) => {
                let positive: f32 = mag
                    .iter()
                    .zip(prev)
                    .map(|(cur, old)| (cur - old).max(0.0))
                    .sum();
                positive / bins as f32
            }
            // Backfill: no predecessor frame, low-confidence zero.
            None => 0.0,
        };
        out.push(flux);
        prev_mag = Some(mag);
    }
    out
}

/// Fraction of each frame covered by transcript speech, in `[0.0, 1.0]`.
fn speech_density(
    segments: &[TranscriptSegment],
    params: &AnalysisParams,
    frames: usize,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(frames);
    for i in 0..frames {
        let start = i as f32 * params.hop_secs;
        let end = start + params.frame_secs;

        let mut covered = 0.0f32;
        for seg in segments {
            let overlap = seg.end_seconds.min(end) - seg.start_seconds.max(start);
            if overlap > 0.0 {
                covered += overlap;
            }
        }
        // Overlapping transcript segments can over-count; clamp to full coverage.
        out.push((covered / params.frame_secs).min(1.0));
    }
    out
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn track_from(samples: Vec<f32>, sample_rate: u32) -> Track {
        Track {
            source: PathBuf::from("test.wav"),
            samples,
            sample_rate,
            channels: 1,
        }
    }

    fn params() -> AnalysisParams {
        AnalysisParams {
            frame_secs: 1.0,
            hop_secs: 0.5,
        }
    }

    #[test]
    fn too_short_track_is_a_decode_error() {
        let track = track_from(vec![0.0; 100], 1_000);
        let err = extract_features(&track, None, &params()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn all_series_share_one_grid() -> anyhow::Result<()> {
        let track = track_from(vec![0.1; 8_000], 1_000);
        let transcript = vec![TranscriptSegment {
            start_seconds: 1.0,
            end_seconds: 3.0,
            text: "hello".into(),
            confidence: 1.0,
        }];
        let set = extract_features(&track, Some(&transcript), &params())?;

        assert!(set.frames > 0);
        for (_, values) in set.iter() {
            assert_eq!(values.len(), set.frames);
        }
        Ok(())
    }

    #[test]
    fn energy_tracks_amplitude() -> anyhow::Result<()> {
        // 4 s at 1 kHz: quiet first half, loud second half.
        let mut samples = vec![0.01f32; 2_000];
        samples.extend(vec![0.8f32; 2_000]);
        let track = track_from(samples, 1_000);

        let set = extract_features(&track, None, &params())?;
        let energy = set.get(ENERGY).expect("energy present");
        assert!(energy.last().unwrap() > energy.first().unwrap());
        Ok(())
    }

    #[test]
    fn speech_density_is_zero_without_overlap_and_full_with() -> anyhow::Result<()> {
        let track = track_from(vec![0.1; 10_000], 1_000);
        let transcript = vec![TranscriptSegment {
            start_seconds: 5.0,
            end_seconds: 9.0,
            text: "mid".into(),
            confidence: 1.0,
        }];
        let set = extract_features(&track, Some(&transcript), &params())?;
        let density = set.get(SPEECH_DENSITY).expect("density present");

        // Frame starting at 0.0 has no speech; frame starting at 6.0 is fully covered.
        assert_eq!(density[0], 0.0);
        let covered_frame = (6.0 / 0.5) as usize;
        assert!((density[covered_frame] - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn flux_first_frame_is_backfilled_zero() -> anyhow::Result<()> {
        let track = track_from(vec![0.3; 5_000], 1_000);
        let set = extract_features(&track, None, &params())?;
        assert_eq!(set.get(SPECTRAL_FLUX).expect("flux present")[0], 0.0);
        Ok(())
    }
}

//! Library-level configuration for teaser generation.
//!
//! This struct represents *library-level configuration*, not CLI flags directly.
//! The CLI is responsible for mapping user input into this type so that:
//! - the library remains reusable outside of a CLI context
//! - other frontends (APIs, tests, batch jobs) can construct configuration programmatically
//!
//! Every pipeline stage receives this value at construction time. Nothing in the
//! crate reads ambient/global settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-feature weights used when combining feature series into the interest curve.
///
/// Defaults favor loudness and talk density; spectral flux is de-emphasized so
/// timbral churn (music beds, noise) doesn't dominate the curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_energy_weight")]
    pub energy: f32,
    #[serde(default = "default_spectral_flux_weight")]
    pub spectral_flux: f32,
    #[serde(default = "default_speech_density_weight")]
    pub speech_density: f32,
}

fn default_energy_weight() -> f32 {
    1.0
}

fn default_spectral_flux_weight() -> f32 {
    0.4
}

fn default_speech_density_weight() -> f32 {
    0.8
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            energy: default_energy_weight(),
            spectral_flux: default_spectral_flux_weight(),
            speech_density: default_speech_density_weight(),
        }
    }
}

/// A transcript keyword that promotes matching segments to highlights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightKeyword {
    pub term: String,
    /// Relative importance of this cue. Multiplied by the transcript
    /// segment's confidence to produce the highlight weight.
    #[serde(default = "default_keyword_relevance")]
    pub relevance: f32,
}

fn default_keyword_relevance() -> f32 {
    1.0
}

/// Cross-episode summary reel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Target length of the combined reel in seconds.
    #[serde(default = "default_summary_duration")]
    pub duration_secs: f32,
    /// Optional per-track allocation weights, in batch order. When absent
    /// every track gets an equal share of the reel.
    #[serde(default)]
    pub track_weights: Option<Vec<f32>>,
}

fn default_summary_duration() -> f32 {
    60.0
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_secs: default_summary_duration(),
            track_weights: None,
        }
    }
}

/// Configuration for one teaser-generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeaserConfig {
    /// Target teaser length in seconds.
    #[serde(default = "default_teaser_duration")]
    pub teaser_duration_secs: f32,

    /// Shortest admissible segment.
    #[serde(default = "default_min_segment_len")]
    pub min_segment_len_secs: f32,

    /// Longest admissible segment.
    #[serde(default = "default_max_segment_len")]
    pub max_segment_len_secs: f32,

    /// Minimum silence kept between two chosen segments in the source timeline.
    #[serde(default = "default_segment_gap")]
    pub segment_gap_secs: f32,

    /// Equal-power crossfade applied at each splice point.
    #[serde(default = "default_crossfade")]
    pub crossfade_secs: f32,

    /// When true, the first `intro_len_secs` and last `outro_len_secs` of every
    /// track become hard exclusion zones.
    #[serde(default)]
    pub exclude_intro_outro: bool,

    #[serde(default = "default_intro_len")]
    pub intro_len_secs: f32,

    #[serde(default = "default_outro_len")]
    pub outro_len_secs: f32,

    /// Analysis frame length in seconds.
    #[serde(default = "default_frame_secs")]
    pub frame_secs: f32,

    /// Hop between analysis frames in seconds. This is the time step shared by
    /// every feature series and the interest curve.
    #[serde(default = "default_hop_secs")]
    pub hop_secs: f32,

    #[serde(default)]
    pub weights: ScoringWeights,

    /// Transcript keywords that promote matching segments to highlights.
    /// Empty by default: there is no product-blessed keyword list.
    #[serde(default)]
    pub highlight_keywords: Vec<HighlightKeyword>,

    /// Additive interest boost per unit of highlight/include weight.
    #[serde(default = "default_highlight_boost")]
    pub highlight_boost: f32,

    /// Whether to ask the transcription collaborator for a transcript at all.
    #[serde(default = "default_true")]
    pub transcription_enabled: bool,

    #[serde(default)]
    pub summary: SummaryConfig,
}

fn default_teaser_duration() -> f32 {
    60.0
}

fn default_min_segment_len() -> f32 {
    3.0
}

fn default_max_segment_len() -> f32 {
    15.0
}

fn default_segment_gap() -> f32 {
    1.0
}

fn default_crossfade() -> f32 {
    0.5
}

fn default_intro_len() -> f32 {
    30.0
}

fn default_outro_len() -> f32 {
    30.0
}

fn default_frame_secs() -> f32 {
    1.0
}

fn default_hop_secs() -> f32 {
    0.5
}

fn default_highlight_boost() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

impl Default for TeaserConfig {
    fn default() -> Self {
        // serde_json round-trip would work too, but spelling the defaults out keeps
        // `Default` usable without a serde pass.
        Self {
            teaser_duration_secs: default_teaser_duration(),
            min_segment_len_secs: default_min_segment_len(),
            max_segment_len_secs: default_max_segment_len(),
            segment_gap_secs: default_segment_gap(),
            crossfade_secs: default_crossfade(),
            exclude_intro_outro: false,
            intro_len_secs: default_intro_len(),
            outro_len_secs: default_outro_len(),
            frame_secs: default_frame_secs(),
            hop_secs: default_hop_secs(),
            weights: ScoringWeights::default(),
            highlight_keywords: Vec::new(),
            highlight_boost: default_highlight_boost(),
            transcription_enabled: true,
            summary: SummaryConfig::default(),
        }
    }
}

impl TeaserConfig {
    /// Load configuration from a JSON file, filling unspecified fields with defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration once, before any track is processed.
    ///
    /// Malformed configuration is the only batch-aborting failure in the system,
    /// so everything a stage relies on is checked here.
    pub fn validate(&self) -> Result<()> {
        if self.teaser_duration_secs <= 0.0 {
            return Err(Error::Config(format!(
                "teaser_duration_secs must be positive, got {}",
                self.teaser_duration_secs
            )));
        }
        if self.min_segment_len_secs <= 0.0 {
            return Err(Error::Config(format!(
                "min_segment_len_secs must be positive, got {}",
                self.min_segment_len_secs
            )));
        }
        if self.min_segment_len_secs > self.max_segment_len_secs {
            return Err(Error::Config(format!(
                "min_segment_len_secs ({}) exceeds max_segment_len_secs ({})",
                self.min_segment_len_secs, self.max_segment_len_secs
            )));
        }
        if self.segment_gap_secs < 0.0 {
            return Err(Error::Config("segment_gap_secs must not be negative".into()));
        }
        if self.crossfade_secs < 0.0 {
            return Err(Error::Config("crossfade_secs must not be negative".into()));
        }
        if self.crossfade_secs >= self.min_segment_len_secs {
            return Err(Error::Config(format!(
                "crossfade_secs ({}) must be shorter than min_segment_len_secs ({})",
                self.crossfade_secs, self.min_segment_len_secs
            )));
        }
        if self.frame_secs <= 0.0 || self.hop_secs <= 0.0 {
            return Err(Error::Config(
                "frame_secs and hop_secs must be positive".into(),
            ));
        }
        if self.hop_secs > self.frame_secs {
            return Err(Error::Config(format!(
                "hop_secs ({}) exceeds frame_secs ({}); frames would leave gaps",
                self.hop_secs, self.frame_secs
            )));
        }
        if self.exclude_intro_outro && (self.intro_len_secs < 0.0 || self.outro_len_secs < 0.0) {
            return Err(Error::Config(
                "intro_len_secs and outro_len_secs must not be negative".into(),
            ));
        }
        if self.summary.enabled && self.summary.duration_secs <= 0.0 {
            return Err(Error::Config(
                "summary.duration_secs must be positive when the summary reel is enabled".into(),
            ));
        }
        if let Some(weights) = &self.summary.track_weights {
            if weights.iter().any(|w| *w < 0.0) {
                return Err(Error::Config(
                    "summary.track_weights must not contain negative weights".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        TeaserConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn rejects_inverted_segment_bounds() {
        let cfg = TeaserConfig {
            min_segment_len_secs: 20.0,
            max_segment_len_secs: 10.0,
            ..TeaserConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_non_positive_target() {
        let cfg = TeaserConfig {
            teaser_duration_secs: 0.0,
            ..TeaserConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_crossfade_longer_than_min_segment() {
        let cfg = TeaserConfig {
            crossfade_secs: 5.0,
            min_segment_len_secs: 3.0,
            ..TeaserConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() -> anyhow::Result<()> {
        let cfg: TeaserConfig = serde_json::from_str(r#"{"teaser_duration_secs": 90.0}"#)?;
        assert_eq!(cfg.teaser_duration_secs, 90.0);
        assert_eq!(cfg.min_segment_len_secs, 3.0);
        assert!(cfg.summary.enabled);
        Ok(())
    }
}

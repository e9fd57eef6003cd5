//! Per-track analysis snapshot for the visualization collaborator.
//!
//! The engine only exposes the numeric series a plotting tool needs; it never
//! draws anything itself.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::features::FeatureSet;
use crate::scoring::InterestCurve;
use crate::selector::Segment;

/// Everything a diagnostic plot of one track's analysis needs.
#[derive(Debug, Serialize)]
pub struct AnalysisSnapshot {
    pub source: String,
    /// Time step shared by every series below, in seconds.
    pub hop_secs: f32,
    pub features: BTreeMap<String, Vec<f32>>,
    pub interest: Vec<f32>,
    pub segments: Vec<Segment>,
}

impl AnalysisSnapshot {
    pub fn new(
        source: &Path,
        features: &FeatureSet,
        curve: &InterestCurve,
        segments: &[Segment],
    ) -> Self {
        Self {
            source: source.display().to_string(),
            hop_secs: curve.hop_secs,
            features: features
                .iter()
                .map(|(name, values)| (name.to_owned(), values.to_vec()))
                .collect(),
            interest: curve.values.clone(),
            segments: segments.to_vec(),
        }
    }

    /// Write the snapshot as pretty-printed JSON next to whatever plotting
    /// tool the caller points at it.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }
}

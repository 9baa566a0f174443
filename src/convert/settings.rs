// Conversion Settings - User-facing knobs for a lane conversion
// Loaded from JSON and clamped into a consistent range before use

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Highest lane count a chart can be converted to
pub const MAX_TARGET_LANES: usize = 18;

/// How long a lane-mapping decision is held, as a multiple of the beat length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSpeed {
    /// 1/8 beat - mapping changes almost every note
    Eighth,

    /// 1/4 beat
    Quarter,

    /// 1/2 beat
    Half,

    /// One full beat
    Whole,

    /// Two beats
    Double,

    /// Four beats - long stable stretches
    Quadruple,
}

impl TransformSpeed {
    /// Multiplier applied to the beat length
    pub fn factor(&self) -> f64 {
        match self {
            TransformSpeed::Eighth => 0.125,
            TransformSpeed::Quarter => 0.25,
            TransformSpeed::Half => 0.5,
            TransformSpeed::Whole => 1.0,
            TransformSpeed::Double => 2.0,
            TransformSpeed::Quadruple => 4.0,
        }
    }
}

/// Settings for one lane conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Lane count of the converted chart [1, 18]
    pub target_lanes: usize,

    /// Floor on simultaneous notes the density corrector keeps per row
    pub min_lanes: usize,

    /// Ceiling on simultaneous notes per row (soft, enforced by the corrector)
    pub max_lanes: usize,

    /// How long lane mappings are held before wandering
    pub transform_speed: TransformSpeed,

    /// Only charts with one of these source lane counts are converted
    /// None = convert every chart
    pub source_filter: Option<Vec<usize>>,

    /// Fixed seed for reproducible output; None draws from entropy
    pub seed: Option<u64>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        ConversionSettings {
            target_lanes: 7,
            min_lanes: 1,
            max_lanes: 7,
            transform_speed: TransformSpeed::Whole,
            source_filter: None,
            seed: None,
        }
    }
}

impl ConversionSettings {
    /// Settings for a target lane count with every other field defaulted
    pub fn for_target(target_lanes: usize) -> Self {
        ConversionSettings {
            target_lanes,
            min_lanes: 1,
            max_lanes: target_lanes,
            ..Default::default()
        }
        .normalized()
    }

    /// Clamp into a consistent range: `1 <= target <= 18`, `min <= max <= target`
    pub fn normalized(mut self) -> Self {
        self.target_lanes = self.target_lanes.clamp(1, MAX_TARGET_LANES);
        self.max_lanes = self.max_lanes.min(self.target_lanes);
        self.min_lanes = self.min_lanes.min(self.max_lanes);
        self
    }

    /// True if a chart with this many lanes should be converted
    pub fn accepts_source(&self, source_lanes: usize) -> bool {
        match &self.source_filter {
            Some(allowed) => allowed.contains(&source_lanes),
            None => true,
        }
    }

    /// Per-row removal budget handed to the density corrector
    pub fn max_removals_per_row(&self) -> usize {
        self.target_lanes.saturating_sub(self.max_lanes)
    }

    /// Parse settings from a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        let settings: ConversionSettings = serde_json::from_str(json)?;
        Ok(settings.normalized())
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConvertError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

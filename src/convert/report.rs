// Conversion Report - Summary of what one conversion did to a chart

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matrix::NoteMatrix;

/// How a conversion ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Lanes were added or removed and the corrector ran
    Converted,

    /// Source lane count is not in the configured filter
    SkippedFiltered,

    /// Source and target lane counts already match
    SkippedUnchanged,
}

impl ConversionStatus {
    pub fn is_skipped(&self) -> bool {
        !matches!(self, ConversionStatus::Converted)
    }
}

/// Counts describing one conversion, serialized into the trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub run_id: Uuid,
    pub status: ConversionStatus,
    pub source_lanes: usize,
    pub target_lanes: usize,
    pub rows: usize,

    /// Note heads in the input and output
    pub notes_before: usize,
    pub notes_after: usize,

    /// Fully empty rows in the input and output
    pub empty_rows_before: usize,
    pub empty_rows_after: usize,

    /// Removal regions processed (0 when lanes were added)
    pub regions: usize,

    /// Notes reinserted by the removal repair and empty-row cleanup
    pub repaired: usize,
    pub recovered: usize,
    pub unrecovered: usize,

    /// Notes the density corrector removed, per output lane
    pub density_removed: Vec<usize>,
}

impl ConversionReport {
    /// Start a report from the input matrix
    pub fn new(run_id: Uuid, source: &NoteMatrix, target_lanes: usize) -> Self {
        ConversionReport {
            run_id,
            status: ConversionStatus::Converted,
            source_lanes: source.cols(),
            target_lanes,
            rows: source.rows(),
            notes_before: source.total_heads(),
            notes_after: source.total_heads(),
            empty_rows_before: source.empty_rows(),
            empty_rows_after: source.empty_rows(),
            regions: 0,
            repaired: 0,
            recovered: 0,
            unrecovered: 0,
            density_removed: Vec::new(),
        }
    }

    /// Record output counts
    pub fn finish(&mut self, status: ConversionStatus, output: &NoteMatrix) {
        self.status = status;
        self.notes_after = output.total_heads();
        self.empty_rows_after = output.empty_rows();
    }

    /// Net change in note count
    pub fn note_delta(&self) -> i64 {
        self.notes_after as i64 - self.notes_before as i64
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// Conversion errors
// Hard failures that abort a single conversion; best-effort degradations never land here

use thiserror::Error;

/// Errors that can occur while building, converting or materializing a note matrix
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid BPM: {0}")]
    InvalidBpm(f64),

    #[error("Invalid time axis at row {row}: {reason}")]
    InvalidTimeAxis { row: usize, reason: String },

    #[error("Matrix has {matrix_rows} rows but time axis has {axis_rows}")]
    ShapeMismatch { matrix_rows: usize, axis_rows: usize },

    #[error("Matrix width {width} does not match expected lane count {expected}")]
    WidthMismatch { width: usize, expected: usize },

    #[error("Overlapping notes at row {row}, lane {lane}")]
    OverlappingNotes { row: usize, lane: usize },

    #[error("Note {note} targets lane {lane} but chart has {lanes} lanes")]
    LaneOutOfRange { note: usize, lane: usize, lanes: usize },

    #[error("Insertion at row {row}, column {col} outside row width {width}")]
    InsertOutOfBounds { row: usize, col: usize, width: usize },

    #[error("Settings IO error: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

// Conversion Timing - Beat length, conversion window and playability thresholds
// All engine thresholds derive from a single BPM value

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Guard window after a stream transition, in beats
pub const TRANSITION_GUARD_BEATS: f64 = 3.0 / 16.0;

/// Minimum gap between notes of different origin sharing a lane, in beats
pub const COLLISION_GAP_BEATS: f64 = 2.0 / 16.0;

/// Minimum spacing between notes in the same lane, in beats
pub const NOTE_SPACING_BEATS: f64 = 1.0 / 16.0;

/// Tolerance added to the spacing window to absorb rounding of note times
pub const SPACING_EPSILON_MS: f64 = 1.0;

/// Clearance subtracted from the spacing window when checking hold tails
pub const TAIL_MARGIN_MS: f64 = 10.0;

/// Margin subtracted from the conversion window to absorb timing jitter
pub const WINDOW_MARGIN_MS: f64 = 10.0;

/// Rows searched on either side of a placement for spacing conflicts
pub const SPACING_ROW_RADIUS: usize = 3;

/// Timing constants shared by every pass of one conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionTiming {
    /// Beats per minute of the source chart
    pub bpm: f64,

    /// Length of one beat unit (four quarter notes) in milliseconds
    pub beat_length_ms: f64,

    /// Minimum span a wandering stream holds a value, and the removal region length
    pub conversion_window_ms: f64,
}

impl ConversionTiming {
    /// Derive timing from BPM and the transform speed multiplier
    pub fn new(bpm: f64, speed_factor: f64) -> Result<Self, ConvertError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConvertError::InvalidBpm(bpm));
        }

        let beat_length_ms = 60000.0 / bpm * 4.0;
        let conversion_window_ms = (speed_factor * beat_length_ms - WINDOW_MARGIN_MS).max(1.0);

        Ok(ConversionTiming {
            bpm,
            beat_length_ms,
            conversion_window_ms,
        })
    }

    pub fn transition_guard_ms(&self) -> f64 {
        self.beat_length_ms * TRANSITION_GUARD_BEATS
    }

    pub fn collision_gap_ms(&self) -> f64 {
        self.beat_length_ms * COLLISION_GAP_BEATS
    }

    /// Window inside which two notes in one lane are too close
    pub fn spacing_window_ms(&self) -> f64 {
        self.beat_length_ms * NOTE_SPACING_BEATS + SPACING_EPSILON_MS
    }

    /// Required clearance after a hold tail
    pub fn tail_clearance_ms(&self) -> f64 {
        (self.beat_length_ms * NOTE_SPACING_BEATS - TAIL_MARGIN_MS).max(0.0)
    }
}

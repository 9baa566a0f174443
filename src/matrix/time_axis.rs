// Time Axis - Absolute row timestamps for a note matrix

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Strictly increasing millisecond timestamps, one per matrix row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    times_ms: Vec<f64>,
}

impl TimeAxis {
    /// Validate and wrap a list of row timestamps
    pub fn new(times_ms: Vec<f64>) -> Result<Self, ConvertError> {
        for (row, &t) in times_ms.iter().enumerate() {
            if !t.is_finite() {
                return Err(ConvertError::InvalidTimeAxis {
                    row,
                    reason: format!("non-finite timestamp {}", t),
                });
            }
            if row > 0 && t <= times_ms[row - 1] {
                return Err(ConvertError::InvalidTimeAxis {
                    row,
                    reason: format!("{} ms does not follow {} ms", t, times_ms[row - 1]),
                });
            }
        }
        Ok(TimeAxis { times_ms })
    }

    /// Build from unordered, possibly repeated timestamps
    pub fn from_unsorted(mut times_ms: Vec<f64>) -> Result<Self, ConvertError> {
        times_ms.sort_by(|a, b| a.total_cmp(b));
        times_ms.dedup();
        Self::new(times_ms)
    }

    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }

    #[inline]
    pub fn time(&self, row: usize) -> f64 {
        self.times_ms[row]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.times_ms
    }

    /// Time since the previous row (0 for the first row)
    pub fn gap(&self, row: usize) -> f64 {
        if row == 0 {
            0.0
        } else {
            self.times_ms[row] - self.times_ms[row - 1]
        }
    }

    /// Absolute distance between two rows
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        (self.times_ms[a] - self.times_ms[b]).abs()
    }

    /// Row index holding exactly this timestamp
    pub fn row_of(&self, time_ms: f64) -> Option<usize> {
        self.times_ms
            .binary_search_by(|t| t.total_cmp(&time_ms))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_increasing() {
        let result = TimeAxis::new(vec![0.0, 100.0, 100.0]);
        assert!(matches!(
            result,
            Err(ConvertError::InvalidTimeAxis { row: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_nan() {
        assert!(TimeAxis::new(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_from_unsorted_dedups() {
        let axis = TimeAxis::from_unsorted(vec![500.0, 0.0, 250.0, 500.0]).unwrap();
        assert_eq!(axis.as_slice(), &[0.0, 250.0, 500.0]);
        assert_eq!(axis.row_of(250.0), Some(1));
        assert_eq!(axis.row_of(260.0), None);
    }

    #[test]
    fn test_gap_and_distance() {
        let axis = TimeAxis::new(vec![0.0, 125.0, 375.0]).unwrap();
        assert_eq!(axis.gap(0), 0.0);
        assert_eq!(axis.gap(2), 250.0);
        assert_eq!(axis.distance(2, 0), 375.0);
    }
}

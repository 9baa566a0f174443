// Chart Model - Lane-based note charts as loaded and saved by callers

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// One playable note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNote {
    /// Zero-based lane index
    pub lane: usize,

    /// Hit time in milliseconds
    pub start_ms: f64,

    /// Release time for long notes; None for taps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<f64>,

    /// Horizontal playfield coordinate of the lane
    pub position: f64,
}

impl ChartNote {
    pub fn tap(lane: usize, start_ms: f64) -> Self {
        ChartNote {
            lane,
            start_ms,
            end_ms: None,
            position: 0.0,
        }
    }

    pub fn hold(lane: usize, start_ms: f64, end_ms: f64) -> Self {
        ChartNote {
            lane,
            start_ms,
            end_ms: Some(end_ms),
            position: 0.0,
        }
    }

    /// True for long notes that release after they start
    pub fn is_hold(&self) -> bool {
        matches!(self.end_ms, Some(end) if end > self.start_ms)
    }
}

/// A chart: lane count, tempo and notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub lanes: usize,
    pub bpm: f64,
    pub notes: Vec<ChartNote>,
}

impl Chart {
    pub fn new(title: impl Into<String>, lanes: usize, bpm: f64) -> Self {
        Chart {
            title: title.into(),
            lanes,
            bpm,
            notes: Vec::new(),
        }
    }

    pub fn add_note(&mut self, note: ChartNote) {
        self.notes.push(note);
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Number of long notes
    pub fn hold_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_hold()).count()
    }

    /// Sort notes by hit time, then lane
    pub fn sort_notes(&mut self) {
        self.notes.sort_by(|a, b| {
            a.start_ms
                .total_cmp(&b.start_ms)
                .then(a.lane.cmp(&b.lane))
        });
    }

    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConvertError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_detection() {
        assert!(ChartNote::hold(0, 100.0, 400.0).is_hold());
        assert!(!ChartNote::hold(0, 100.0, 100.0).is_hold());
        assert!(!ChartNote::tap(0, 100.0).is_hold());
    }

    #[test]
    fn test_sort_notes() {
        let mut chart = Chart::new("Test", 4, 120.0);
        chart.add_note(ChartNote::tap(2, 500.0));
        chart.add_note(ChartNote::tap(3, 0.0));
        chart.add_note(ChartNote::tap(1, 0.0));
        chart.sort_notes();

        let order: Vec<usize> = chart.notes.iter().map(|n| n.lane).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }

    #[test]
    fn test_json_omits_tap_end() {
        let mut chart = Chart::new("Test", 4, 150.0);
        chart.add_note(ChartNote::tap(0, 0.0));
        chart.add_note(ChartNote::hold(1, 0.0, 200.0));

        let json = chart.to_json().unwrap();
        let parsed = Chart::from_json(&json).unwrap();
        assert_eq!(parsed, chart);
        assert_eq!(json.matches("end_ms").count(), 1);
        assert_eq!(parsed.hold_count(), 1);
    }
}

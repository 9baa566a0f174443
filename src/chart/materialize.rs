// Chart Materializer - Rebuilds chart notes from a converted matrix

use serde::{Deserialize, Serialize};

use super::builder::build_matrix;
use super::model::{Chart, ChartNote};
use crate::convert::{ConversionReport, LaneConverter};
use crate::error::ConvertError;
use crate::matrix::{NoteMatrix, TimeAxis};

/// Maps lane indices to playfield positions
pub trait LaneLayout {
    fn position(&self, lane: usize, lanes: usize) -> f64;
}

/// Lanes spread evenly across a playfield, each centered in its slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformLayout {
    pub width: f64,
}

impl Default for UniformLayout {
    fn default() -> Self {
        UniformLayout { width: 512.0 }
    }
}

impl LaneLayout for UniformLayout {
    fn position(&self, lane: usize, lanes: usize) -> f64 {
        if lanes == 0 {
            return 0.0;
        }
        let slot = self.width / lanes as f64;
        (slot * lane as f64 + slot / 2.0).floor()
    }
}

/// Prefix a title with the `[{from}to{to}C]` conversion tag, once
pub fn tag_difficulty(title: &str, from: usize, to: usize) -> String {
    let tag = format!("[{}to{}C]", from, to);
    if title.starts_with(&tag) {
        title.to_string()
    } else if title.is_empty() {
        tag
    } else {
        format!("{} {}", tag, title)
    }
}

/// Rebuild a chart from a converted matrix
///
/// Each head maps back to the source note with the same index; its lane,
/// position and timing are taken from the matrix. Notes are returned sorted
/// by time, then lane.
pub fn materialize(
    source: &Chart,
    matrix: &NoteMatrix,
    axis: &TimeAxis,
    layout: &dyn LaneLayout,
) -> Result<Chart, ConvertError> {
    if matrix.rows() != axis.len() {
        return Err(ConvertError::ShapeMismatch {
            matrix_rows: matrix.rows(),
            axis_rows: axis.len(),
        });
    }

    let lanes = matrix.cols();
    let mut notes = Vec::with_capacity(matrix.total_heads());

    for row in 0..matrix.rows() {
        for lane in matrix.head_lanes(row) {
            let id = matrix.get(row, lane) as usize;
            let body = matrix.body_length(row, lane);

            let mut note = source
                .notes
                .get(id)
                .cloned()
                .unwrap_or_else(|| ChartNote::tap(lane, axis.time(row)));
            note.lane = lane;
            note.position = layout.position(lane, lanes);
            note.start_ms = axis.time(row);
            note.end_ms = (body > 0).then(|| axis.time(row + body));
            notes.push(note);
        }
    }

    let mut chart = Chart {
        title: tag_difficulty(&source.title, source.lanes, lanes),
        lanes,
        bpm: source.bpm,
        notes,
    };
    chart.sort_notes();
    Ok(chart)
}

/// Build, convert and materialize a chart in one call
///
/// Skipped conversions hand back an untouched copy of the input.
pub fn convert_chart(
    chart: &Chart,
    converter: &LaneConverter,
    layout: &dyn LaneLayout,
) -> Result<(Chart, ConversionReport), ConvertError> {
    let (matrix, axis) = build_matrix(chart)?;
    let conversion = converter.convert(&matrix, &axis, chart.bpm)?;

    if conversion.status().is_skipped() {
        return Ok((chart.clone(), conversion.report));
    }

    let converted = materialize(chart, &conversion.matrix, &axis, layout)?;
    log::info!(
        "Materialized '{}': {} -> {} notes",
        converted.title,
        chart.note_count(),
        converted.note_count()
    );
    Ok((converted, conversion.report))
}

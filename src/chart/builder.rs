// Matrix Builder - Lays chart notes out on a row grid

use super::model::Chart;
use crate::error::ConvertError;
use crate::matrix::{NoteMatrix, TimeAxis, EMPTY};

/// Build a note matrix and its time axis from a chart
///
/// Rows are the distinct note start and end times. Each head stores the index
/// of its note in `chart.notes`; a long note's body runs down to and including
/// its end row.
pub fn build_matrix(chart: &Chart) -> Result<(NoteMatrix, TimeAxis), ConvertError> {
    let mut times = Vec::with_capacity(chart.notes.len() * 2);
    for (index, note) in chart.notes.iter().enumerate() {
        if note.lane >= chart.lanes {
            return Err(ConvertError::LaneOutOfRange {
                note: index,
                lane: note.lane,
                lanes: chart.lanes,
            });
        }
        times.push(note.start_ms);
        if note.is_hold() {
            if let Some(end) = note.end_ms {
                times.push(end);
            }
        }
    }

    let axis = TimeAxis::from_unsorted(times)?;
    let mut matrix = NoteMatrix::new(axis.len(), chart.lanes);

    let mut order: Vec<usize> = (0..chart.notes.len()).collect();
    order.sort_by(|&a, &b| chart.notes[a].start_ms.total_cmp(&chart.notes[b].start_ms));

    for index in order {
        let note = &chart.notes[index];
        let row = locate(&axis, note.start_ms)?;
        let end_row = match note.end_ms {
            Some(end) if note.is_hold() => locate(&axis, end)?,
            _ => row,
        };

        if matrix.get(row, note.lane) != EMPTY || !matrix.span_is_free(note.lane, row, end_row) {
            return Err(ConvertError::OverlappingNotes {
                row,
                lane: note.lane,
            });
        }
        matrix.write_note(row, note.lane, index as i32, end_row - row);
    }

    log::debug!(
        "Built {}x{} matrix from {} notes",
        matrix.rows(),
        matrix.cols(),
        chart.notes.len()
    );

    Ok((matrix, axis))
}

fn locate(axis: &TimeAxis, time_ms: f64) -> Result<usize, ConvertError> {
    axis.row_of(time_ms).ok_or_else(|| ConvertError::InvalidTimeAxis {
        row: axis.len(),
        reason: format!("no row at {} ms", time_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartNote;
    use crate::matrix::HOLD_BODY;

    #[test]
    fn test_build_taps_and_hold() {
        let mut chart = Chart::new("Test", 3, 120.0);
        chart.add_note(ChartNote::tap(0, 0.0));
        chart.add_note(ChartNote::hold(1, 250.0, 750.0));
        chart.add_note(ChartNote::tap(2, 500.0));

        let (matrix, axis) = build_matrix(&chart).unwrap();
        assert_eq!(axis.as_slice(), &[0.0, 250.0, 500.0, 750.0]);
        assert_eq!(
            matrix.to_rows(),
            vec![
                vec![0, EMPTY, EMPTY],
                vec![EMPTY, 1, EMPTY],
                vec![EMPTY, HOLD_BODY, 2],
                vec![EMPTY, HOLD_BODY, EMPTY],
            ]
        );
    }

    #[test]
    fn test_lane_out_of_range() {
        let mut chart = Chart::new("Test", 4, 120.0);
        chart.add_note(ChartNote::tap(0, 0.0));
        chart.add_note(ChartNote::tap(4, 100.0));

        assert!(matches!(
            build_matrix(&chart),
            Err(ConvertError::LaneOutOfRange { note: 1, lane: 4, lanes: 4 })
        ));
    }

    #[test]
    fn test_stacked_notes_rejected() {
        let mut chart = Chart::new("Test", 2, 120.0);
        chart.add_note(ChartNote::tap(0, 100.0));
        chart.add_note(ChartNote::tap(0, 100.0));

        assert!(matches!(
            build_matrix(&chart),
            Err(ConvertError::OverlappingNotes { row: 0, lane: 0 })
        ));
    }

    #[test]
    fn test_note_inside_hold_rejected() {
        let mut chart = Chart::new("Test", 2, 120.0);
        chart.add_note(ChartNote::hold(0, 0.0, 500.0));
        chart.add_note(ChartNote::tap(0, 250.0));

        assert!(matches!(
            build_matrix(&chart),
            Err(ConvertError::OverlappingNotes { row: 1, lane: 0 })
        ));
    }

    #[test]
    fn test_empty_chart() {
        let chart = Chart::new("Empty", 4, 120.0);
        let (matrix, axis) = build_matrix(&chart).unwrap();
        assert_eq!(matrix.rows(), 0);
        assert!(axis.is_empty());
    }
}

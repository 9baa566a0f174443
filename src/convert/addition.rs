// Lane Addition - Grows N lanes to N+k lanes
// Relocates existing notes into the widened grid along slowly wandering lane streams

use rand::Rng;

use super::oscillator::OscillatingIndex;
use crate::error::ConvertError;
use crate::groove::ConversionTiming;
use crate::matrix::{is_head, NoteMatrix, TimeAxis, EMPTY};

/// A note head travelling through the temporary row, tagged with the lane it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placed {
    id: i32,
    source_lane: usize,
}

/// Per-row lane choices for one added lane
#[derive(Debug, Clone)]
struct LaneStreams {
    /// Existing lane a candidate is read from, in [0, N-1]
    source: Vec<usize>,

    /// Insert position in the widened row, in [0, N-1+offset]
    dest: Vec<usize>,
}

impl LaneStreams {
    fn changed_at(&self, row: usize) -> bool {
        row > 0 && (self.source[row] != self.source[row - 1] || self.dest[row] != self.dest[row - 1])
    }
}

/// Build a per-row index stream that holds each value for at least `window_ms`
fn wandering_stream<R: Rng + ?Sized>(
    axis: &TimeAxis,
    max_value: usize,
    window_ms: f64,
    rng: &mut R,
) -> Vec<usize> {
    let mut index = OscillatingIndex::new(max_value, rng);
    let warmup = rng.gen_range(0..=max_value);
    for _ in 0..warmup {
        index.advance();
    }

    let mut elapsed = 0.0;
    (0..axis.len())
        .map(|row| {
            elapsed += axis.gap(row);
            if elapsed >= window_ms {
                index.advance();
                elapsed = 0.0;
            }
            index.value()
        })
        .collect()
}

/// Move heads along the lane streams for one row
///
/// Each added lane either moves the head found in its source lane to its
/// destination index (insert-shift) or appends an empty slot. Moves are
/// suppressed from a stream change until the guard window has passed.
/// Returns the widened slots and the number of moves.
fn shift_row(
    cells: &[i32],
    row: usize,
    now: f64,
    streams: &[LaneStreams],
    guard_until: &mut [f64],
    guard_ms: f64,
) -> Result<(Vec<Option<Placed>>, usize), ConvertError> {
    let mut slots: Vec<Option<Placed>> = cells
        .iter()
        .enumerate()
        .map(|(lane, &cell)| is_head(cell).then_some(Placed { id: cell, source_lane: lane }))
        .collect();
    let mut moves = 0;

    for (offset, lane_streams) in streams.iter().enumerate() {
        if lane_streams.changed_at(row) {
            guard_until[offset] = now + guard_ms;
        }

        let source = lane_streams.source[row];
        let dest = lane_streams.dest[row];
        let candidate = if now < guard_until[offset] {
            None
        } else {
            slots
                .iter()
                .position(|slot| matches!(slot, Some(p) if p.source_lane == source))
        };

        match candidate {
            Some(pos) => {
                if dest > slots.len() {
                    return Err(ConvertError::InsertOutOfBounds {
                        row,
                        col: dest,
                        width: slots.len(),
                    });
                }
                let moving = slots[pos].take();
                slots.insert(dest, moving);
                moves += 1;
            }
            None => slots.push(None),
        }
    }

    Ok((slots, moves))
}

/// Grow the matrix by `added` lanes
///
/// Algorithm:
/// 1. Build a source and a destination stream per added lane
/// 2. Per row, move the head found in the source lane to the destination
///    index, shifting the rest of the row right (insert-shift)
/// 3. Suppress moves for a short guard window after a stream changes value
/// 4. Re-write hold bodies below moved heads
/// 5. Drop notes that land too close behind a note from another source lane
///
/// A row never ends with fewer heads than `min(min_lanes, heads in the source row)`.
pub fn add_lanes<R: Rng + ?Sized>(
    matrix: &NoteMatrix,
    axis: &TimeAxis,
    added: usize,
    min_lanes: usize,
    timing: &ConversionTiming,
    rng: &mut R,
) -> Result<NoteMatrix, ConvertError> {
    let source_lanes = matrix.cols();
    let width = source_lanes + added;
    let rows = matrix.rows();

    if source_lanes == 0 {
        return Ok(NoteMatrix::new(rows, width));
    }

    let holds = matrix.hold_lengths();
    let streams: Vec<LaneStreams> = (0..added)
        .map(|offset| LaneStreams {
            source: wandering_stream(axis, source_lanes - 1, timing.conversion_window_ms, rng),
            dest: wandering_stream(axis, source_lanes - 1 + offset, timing.conversion_window_ms, rng),
        })
        .collect();
    let floors: Vec<usize> = (0..rows)
        .map(|row| min_lanes.min(matrix.head_count(row)))
        .collect();

    let guard_ms = timing.transition_guard_ms();
    let mut guard_until = vec![f64::NEG_INFINITY; added];
    let mut out = NoteMatrix::new(rows, width);
    let mut origin: Vec<Option<usize>> = vec![None; rows * width];
    let mut relocated = 0usize;
    let mut shortened = 0usize;
    let mut dropped = 0usize;

    for row in 0..rows {
        let (slots, moves) = shift_row(
            matrix.row(row),
            row,
            axis.time(row),
            &streams,
            &mut guard_until,
            guard_ms,
        )?;
        relocated += moves;
        let mut remaining = slots.iter().flatten().count();

        for (col, slot) in slots.into_iter().enumerate() {
            let Some(placed) = slot else {
                continue;
            };
            remaining -= 1;
            let body = holds.get(&placed.id).copied().unwrap_or(0);
            if let Some(target) = nearest_free_column(&out, row, col, body) {
                out.write_note(row, target, placed.id, body);
                origin[row * width + target] = Some(placed.source_lane);
                continue;
            }

            // Short of the floor, keep the head as a tap rather than lose it
            let below_floor = out.head_count(row) + remaining < floors[row];
            match nearest_free_column(&out, row, col, 0).filter(|_| below_floor) {
                Some(target) => {
                    out.write_note(row, target, placed.id, 0);
                    origin[row * width + target] = Some(placed.source_lane);
                    shortened += 1;
                }
                None => {
                    log::debug!("No free lane for note {} at row {}", placed.id, row);
                    dropped += 1;
                }
            }
        }
    }

    let smoothed = smooth_collisions(&mut out, &origin, axis, timing.collision_gap_ms(), &floors);

    log::debug!(
        "Lane addition {} -> {}: {} moves, {} shortened, {} dropped, {} smoothed",
        source_lanes,
        width,
        relocated,
        shortened,
        dropped,
        smoothed
    );

    Ok(out)
}

/// Closest column to `col` that is free for the head and its whole body
fn nearest_free_column(out: &NoteMatrix, row: usize, col: usize, body: usize) -> Option<usize> {
    let width = out.cols();
    let fits = |c: usize| out.get(row, c) == EMPTY && out.span_is_free(c, row, row + body);

    (0..width).find_map(|distance| {
        if col + distance < width && fits(col + distance) {
            return Some(col + distance);
        }
        if distance > 0 && distance <= col && fits(col - distance) {
            return Some(col - distance);
        }
        None
    })
}

/// Delete heads that follow a note from a different source lane too closely
///
/// A deletion is skipped if it would leave a row fully empty or drop the
/// row below its head floor.
fn smooth_collisions(
    out: &mut NoteMatrix,
    origin: &[Option<usize>],
    axis: &TimeAxis,
    gap_ms: f64,
    floors: &[usize],
) -> usize {
    let width = out.cols();
    let mut removed = 0;

    for col in 0..width {
        let mut last: Option<(usize, usize)> = None;

        for row in 0..out.rows() {
            if !is_head(out.get(row, col)) {
                continue;
            }
            let Some(source) = origin[row * width + col] else {
                continue;
            };

            if let Some((last_row, last_source)) = last {
                let too_close = axis.time(row) - axis.time(last_row) < gap_ms;
                let keeps_floor = out.head_count(row) > floors[row];
                if last_source != source
                    && too_close
                    && keeps_floor
                    && !out.clear_would_empty_row(row, col)
                {
                    out.clear_note(row, col);
                    removed += 1;
                    continue;
                }
            }
            last = Some((row, source));
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::HOLD_BODY;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn even_axis(rows: usize, step_ms: f64) -> TimeAxis {
        TimeAxis::new((0..rows).map(|r| r as f64 * step_ms).collect()).unwrap()
    }

    /// One tap per row, cycling through the lanes
    fn staircase(rows: usize, lanes: usize) -> NoteMatrix {
        let mut matrix = NoteMatrix::new(rows, lanes);
        for row in 0..rows {
            matrix.set(row, row % lanes, row as i32);
        }
        matrix
    }

    #[test]
    fn test_width_and_rows() {
        let matrix = staircase(64, 4);
        let axis = even_axis(64, 125.0);
        let timing = ConversionTiming::new(120.0, 0.25).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);

        let out = add_lanes(&matrix, &axis, 3, 1, &timing, &mut rng).unwrap();

        assert_eq!(out.cols(), 7);
        assert_eq!(out.rows(), 64);
    }

    #[test]
    fn test_notes_move_but_are_never_duplicated() {
        let matrix = staircase(64, 4);
        let axis = even_axis(64, 125.0);
        let timing = ConversionTiming::new(120.0, 0.25).unwrap();
        let mut rng = Pcg32::seed_from_u64(2);

        let out = add_lanes(&matrix, &axis, 2, 1, &timing, &mut rng).unwrap();

        for row in 0..64 {
            // Each head stays in its own row, at most once
            let ids: Vec<i32> = out.row(row).iter().copied().filter(|&c| is_head(c)).collect();
            assert!(ids.len() <= 1);
            if let Some(&id) = ids.first() {
                assert_eq!(id, row as i32);
            }
            // Smoothing never empties a row
            assert!(!out.is_row_empty(row));
        }
    }

    #[test]
    fn test_some_notes_reach_new_lanes() {
        let matrix = staircase(256, 4);
        let axis = even_axis(256, 125.0);
        let timing = ConversionTiming::new(120.0, 1.0).unwrap();
        let mut rng = Pcg32::seed_from_u64(3);

        let out = add_lanes(&matrix, &axis, 2, 1, &timing, &mut rng).unwrap();

        let in_new_lanes = (0..256)
            .filter(|&row| out.row(row)[4..].iter().any(|&c| is_head(c)))
            .count();
        assert!(in_new_lanes > 0);
    }

    #[test]
    fn test_hold_bodies_follow_heads() {
        // Lane 0 holds for three rows every fourth row; lanes 1-3 tap
        let rows = 64;
        let mut matrix = NoteMatrix::new(rows, 4);
        let mut id = 0;
        for row in (0..rows).step_by(4) {
            matrix.write_note(row, 0, id, 3);
            id += 1;
            for lane in 1..4 {
                matrix.set(row + lane, lane, id);
                id += 1;
            }
        }
        let source_holds = matrix.hold_lengths();
        let axis = even_axis(rows, 62.5);
        let timing = ConversionTiming::new(150.0, 0.5).unwrap();
        let mut rng = Pcg32::seed_from_u64(4);

        let out = add_lanes(&matrix, &axis, 2, 1, &timing, &mut rng).unwrap();

        for row in 0..rows {
            for col in 0..out.cols() {
                let cell = out.get(row, col);
                if is_head(cell) {
                    let expected = source_holds.get(&cell).copied().unwrap_or(0);
                    assert_eq!(out.body_length(row, col), expected, "note {}", cell);
                }
                if cell == HOLD_BODY {
                    // A body cell always sits below a head or another body cell
                    assert!(row > 0);
                    assert_ne!(out.get(row - 1, col), EMPTY);
                }
            }
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let matrix = staircase(48, 5);
        let axis = even_axis(48, 100.0);
        let timing = ConversionTiming::new(140.0, 0.25).unwrap();

        let run = || {
            let mut rng = Pcg32::seed_from_u64(77);
            add_lanes(&matrix, &axis, 3, 1, &timing, &mut rng).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_stream_holds_value_within_window() {
        let axis = even_axis(40, 100.0);
        let mut rng = Pcg32::seed_from_u64(9);

        let stream = wandering_stream(&axis, 4, 400.0, &mut rng);

        // Changes happen at most every fourth row
        let changes: Vec<usize> = (1..40).filter(|&r| stream[r] != stream[r - 1]).collect();
        for pair in changes.windows(2) {
            assert!(pair[1] - pair[0] >= 4);
        }
        assert!(stream.iter().all(|&v| v <= 4));
    }

    #[test]
    fn test_nearest_free_column_skips_held_lanes() {
        let mut out = NoteMatrix::new(4, 3);
        out.write_note(0, 1, 0, 3);
        assert_eq!(nearest_free_column(&out, 1, 1, 0), Some(2));
        assert_eq!(nearest_free_column(&out, 1, 0, 0), Some(0));

        out.write_note(1, 2, 1, 0);
        out.write_note(1, 0, 2, 0);
        assert_eq!(nearest_free_column(&out, 1, 1, 0), None);
    }

    #[test]
    fn test_smoothing_removes_fast_cross_lane_taps() {
        // Two taps in column 0 from different sources 100ms apart; each row has a partner note
        let mut out = NoteMatrix::new(2, 2);
        out.set(0, 0, 0);
        out.set(0, 1, 1);
        out.set(1, 0, 2);
        out.set(1, 1, 3);
        let origin = vec![Some(0), Some(1), Some(2), Some(1)];
        let axis = even_axis(2, 100.0);

        let removed = smooth_collisions(&mut out, &origin, &axis, 250.0, &[1, 1]);

        assert_eq!(removed, 1);
        assert_eq!(out.get(1, 0), EMPTY);
        // Column 1 notes share a source lane and survive
        assert_eq!(out.get(1, 1), 3);
    }

    #[test]
    fn test_smoothing_respects_row_floor() {
        // Same layout as above, but both rows must keep two heads
        let mut out = NoteMatrix::new(2, 2);
        out.set(0, 0, 0);
        out.set(0, 1, 1);
        out.set(1, 0, 2);
        out.set(1, 1, 3);
        let origin = vec![Some(0), Some(1), Some(2), Some(1)];
        let axis = even_axis(2, 100.0);

        let removed = smooth_collisions(&mut out, &origin, &axis, 250.0, &[2, 2]);

        assert_eq!(removed, 0);
        assert_eq!(out.get(1, 0), 2);
    }

    #[test]
    fn test_transition_guard_suppresses_moves() {
        // Three source lanes, one added lane; the destination stream changes at row 4
        let streams = vec![LaneStreams {
            source: vec![0; 10],
            dest: vec![2, 2, 2, 2, 1, 1, 1, 1, 1, 1],
        }];
        let axis = even_axis(10, 100.0);
        let guard_ms = 250.0;
        let mut guard_until = vec![f64::NEG_INFINITY];

        let mut positions = Vec::new();
        for row in 0..10 {
            let cells = [row as i32, EMPTY, EMPTY];
            let (slots, moves) =
                shift_row(&cells, row, axis.time(row), &streams, &mut guard_until, guard_ms).unwrap();
            assert_eq!(slots.len(), 4);
            let pos = slots
                .iter()
                .position(|slot| matches!(slot, Some(p) if p.id == row as i32))
                .unwrap();
            assert_eq!(moves, usize::from(pos != 0));
            positions.push(pos);
        }

        // Moves before the change, none until 400 + 250 ms, then moves to the new index
        assert_eq!(positions, vec![2, 2, 2, 2, 0, 0, 0, 1, 1, 1]);
        assert_eq!(guard_until[0], 650.0);
    }

    #[test]
    fn test_shift_row_keeps_source_lane() {
        let streams = vec![LaneStreams {
            source: vec![1],
            dest: vec![0],
        }];
        let mut guard_until = vec![f64::NEG_INFINITY];

        let (slots, moves) = shift_row(&[5, 6, EMPTY], 0, 0.0, &streams, &mut guard_until, 100.0).unwrap();

        assert_eq!(moves, 1);
        assert_eq!(slots[0], Some(Placed { id: 6, source_lane: 1 }));
        assert_eq!(slots[1], Some(Placed { id: 5, source_lane: 0 }));
        assert_eq!(slots[2], None);
    }
}

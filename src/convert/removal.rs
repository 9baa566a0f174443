// Lane Removal - Shrinks N lanes to N-k lanes
// Ranks lanes per time region and drops the least load-bearing ones

use std::collections::HashMap;
use std::ops::Range;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ConvertError;
use crate::groove::timing::SPACING_ROW_RADIUS;
use crate::groove::ConversionTiming;
use crate::matrix::{is_head, NoteMatrix, TimeAxis, EMPTY};

/// Result of a lane removal pass
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    /// Converted matrix, `N - k` lanes wide
    pub matrix: NoteMatrix,

    /// Lanes dropped in each region, in region order
    pub dropped_lanes: Vec<Vec<usize>>,

    /// Notes reinserted by the per-region repair
    pub repaired: usize,

    /// Empty rows filled by the global cleanup
    pub recovered: usize,

    /// Rows that had a note in the source but are left fully empty
    pub unrecovered: usize,
}

/// Per-lane ranking inputs for one region
#[derive(Debug, Clone, Copy, PartialEq)]
struct LaneRank {
    lane: usize,
    weight: usize,
    risk: f64,
    chart_weight: usize,
}

/// Spacing thresholds for placing a note in a lane
#[derive(Debug, Clone, Copy)]
struct Spacing {
    window_ms: f64,
    tail_ms: f64,
}

/// Split the time axis into regions at least `window_ms` long
///
/// A region closes on the row where elapsed time reaches the window, or at
/// the last row.
pub fn segment_regions(axis: &TimeAxis, window_ms: f64) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut start = 0;
    let mut elapsed = 0.0;

    for row in 0..axis.len() {
        if row > start {
            elapsed += axis.gap(row);
        }
        if elapsed >= window_ms || row + 1 == axis.len() {
            regions.push(start..row + 1);
            start = row + 1;
            elapsed = 0.0;
        }
    }

    regions
}

/// Occupied cells per lane over a row range
fn lane_weights(matrix: &NoteMatrix, rows: Range<usize>) -> Vec<usize> {
    let mut weights = vec![0; matrix.cols()];
    for row in rows {
        for (lane, &cell) in matrix.row(row).iter().enumerate() {
            if cell != EMPTY {
                weights[lane] += 1;
            }
        }
    }
    weights
}

/// Pick the `count` lanes to drop in a region
///
/// Lanes are ranked ascending by (weight, risk); ties fall back to the
/// chart-wide weight, then lane index.
fn rank_lanes(
    matrix: &NoteMatrix,
    region: Range<usize>,
    chart_weights: &[usize],
    count: usize,
) -> Vec<usize> {
    let weights = lane_weights(matrix, region.clone());
    let region_rows = region.len().max(1) as f64;

    let mut ranks: Vec<LaneRank> = (0..matrix.cols())
        .map(|lane| {
            let sole_rows = region
                .clone()
                .filter(|&row| {
                    let cells = matrix.row(row);
                    cells[lane] != EMPTY
                        && cells.iter().enumerate().all(|(c, &v)| c == lane || v == EMPTY)
                })
                .count();
            LaneRank {
                lane,
                weight: weights[lane],
                risk: sole_rows as f64 / region_rows,
                chart_weight: chart_weights[lane],
            }
        })
        .collect();

    ranks.sort_by(|a, b| {
        a.weight
            .cmp(&b.weight)
            .then(a.risk.total_cmp(&b.risk))
            .then(a.chart_weight.cmp(&b.chart_weight))
            .then(a.lane.cmp(&b.lane))
    });

    let mut dropped: Vec<usize> = ranks.iter().take(count).map(|r| r.lane).collect();
    dropped.sort_unstable();
    dropped
}

/// Old lane -> new lane; dropped lanes map to None, survivors keep their order
fn build_remap(lanes: usize, dropped: &[usize]) -> Vec<Option<usize>> {
    let mut next = 0;
    (0..lanes)
        .map(|lane| {
            if dropped.contains(&lane) {
                None
            } else {
                next += 1;
                Some(next - 1)
            }
        })
        .collect()
}

/// True if another head in `col` sits within the spacing window of `row`
fn has_close_head(out: &NoteMatrix, axis: &TimeAxis, row: usize, col: usize, window_ms: f64) -> bool {
    let lo = row.saturating_sub(SPACING_ROW_RADIUS);
    let hi = (row + SPACING_ROW_RADIUS).min(out.rows().saturating_sub(1));

    (lo..=hi).any(|r| r != row && is_head(out.get(r, col)) && axis.distance(r, row) <= window_ms)
}

/// True if nothing in `col` starts too soon after a hold tail ending at `row + body`
fn tail_is_clear(out: &NoteMatrix, axis: &TimeAxis, row: usize, col: usize, body: usize, tail_ms: f64) -> bool {
    if body == 0 {
        return true;
    }
    let tail = row + body;
    (tail + 1..out.rows())
        .take_while(|&r| axis.distance(r, tail) < tail_ms)
        .all(|r| !is_head(out.get(r, col)))
}

/// Slot, hold span and spacing checks for a copied note
fn can_place(out: &NoteMatrix, axis: &TimeAxis, row: usize, col: usize, body: usize, spacing: &Spacing) -> bool {
    out.get(row, col) == EMPTY
        && out.span_is_free(col, row, row + body)
        && !has_close_head(out, axis, row, col, spacing.window_ms)
}

/// `can_place` plus tail clearance, used for reinserted notes
fn can_reinsert(out: &NoteMatrix, axis: &TimeAxis, row: usize, col: usize, body: usize, spacing: &Spacing) -> bool {
    can_place(out, axis, row, col, body, spacing) && tail_is_clear(out, axis, row, col, body, spacing.tail_ms)
}

/// Original heads of a row that are missing from the converted row
fn missing_heads(source: &NoteMatrix, out: &NoteMatrix, row: usize) -> Vec<i32> {
    source
        .row(row)
        .iter()
        .copied()
        .filter(|&cell| is_head(cell) && !out.row(row).contains(&cell))
        .collect()
}

/// Reinsert one missing head of `row` into a random valid lane
///
/// Candidates are tried in random order; returns true once one lands.
fn reinsert_one<R: Rng + ?Sized>(
    out: &mut NoteMatrix,
    source: &NoteMatrix,
    axis: &TimeAxis,
    row: usize,
    holds: &HashMap<i32, usize>,
    spacing: &Spacing,
    rng: &mut R,
) -> bool {
    let mut candidates = missing_heads(source, out, row);
    candidates.shuffle(rng);

    for id in candidates {
        let body = holds.get(&id).copied().unwrap_or(0);
        let lanes: Vec<usize> = (0..out.cols())
            .filter(|&col| can_reinsert(out, axis, row, col, body, spacing))
            .collect();
        if let Some(&col) = lanes.choose(rng) {
            out.write_note(row, col, id, body);
            return true;
        }
    }
    false
}

/// Bring rows of a region back up to the note floor
fn repair_region<R: Rng + ?Sized>(
    out: &mut NoteMatrix,
    source: &NoteMatrix,
    axis: &TimeAxis,
    region: Range<usize>,
    floor: usize,
    holds: &HashMap<i32, usize>,
    spacing: &Spacing,
    rng: &mut R,
) -> usize {
    let mut repaired = 0;

    for row in region {
        let row_floor = floor.min(source.head_count(row));
        loop {
            let needs_note = out.is_row_empty(row) || (floor > 1 && out.head_count(row) < row_floor);
            if !needs_note || !reinsert_one(out, source, axis, row, holds, spacing, rng) {
                break;
            }
            repaired += 1;
        }
    }

    repaired
}

fn restore_column(out: &mut NoteMatrix, col: usize, snapshot: &[i32]) {
    for (row, &cell) in snapshot.iter().enumerate() {
        out.set(row, col, cell);
    }
}

/// Clear heads around `row` in one lane, then retry insertion into that lane
///
/// Lanes are tried in random order. An eviction that empties another row,
/// or that still leaves no room, is rolled back.
fn evict_and_insert<R: Rng + ?Sized>(
    out: &mut NoteMatrix,
    source: &NoteMatrix,
    axis: &TimeAxis,
    row: usize,
    holds: &HashMap<i32, usize>,
    spacing: &Spacing,
    rng: &mut R,
) -> bool {
    let candidates = missing_heads(source, out, row);
    if candidates.is_empty() {
        return false;
    }

    let mut lanes: Vec<usize> = (0..out.cols()).collect();
    lanes.shuffle(rng);

    let lo = row.saturating_sub(SPACING_ROW_RADIUS);
    let hi = (row + SPACING_ROW_RADIUS).min(out.rows() - 1);

    for col in lanes {
        let snapshot: Vec<i32> = (0..out.rows()).map(|r| out.get(r, col)).collect();

        for r in lo..=hi {
            if r != row && axis.distance(r, row) <= spacing.window_ms {
                out.clear_note(r, col);
            }
        }

        let emptied_other = (0..out.rows())
            .any(|r| r != row && snapshot[r] != out.get(r, col) && out.is_row_empty(r));
        if emptied_other {
            restore_column(out, col, &snapshot);
            continue;
        }

        let placed = candidates.iter().find_map(|&id| {
            let body = holds.get(&id).copied().unwrap_or(0);
            can_reinsert(out, axis, row, col, body, spacing).then_some((id, body))
        });

        match placed {
            Some((id, body)) => {
                out.write_note(row, col, id, body);
                return true;
            }
            None => restore_column(out, col, &snapshot),
        }
    }

    false
}

/// Last-chance pass over rows that lost every note
///
/// Rows already empty in the source are left alone. Returns (recovered, unrecovered).
fn fill_empty_rows<R: Rng + ?Sized>(
    out: &mut NoteMatrix,
    source: &NoteMatrix,
    axis: &TimeAxis,
    holds: &HashMap<i32, usize>,
    spacing: &Spacing,
    rng: &mut R,
) -> (usize, usize) {
    let mut recovered = 0;
    let mut unrecovered = 0;

    for row in 0..out.rows() {
        if !out.is_row_empty(row) || source.head_count(row) == 0 {
            continue;
        }
        if reinsert_one(out, source, axis, row, holds, spacing, rng)
            || evict_and_insert(out, source, axis, row, holds, spacing, rng)
        {
            recovered += 1;
        } else {
            log::debug!("Row {} left empty after lane removal", row);
            unrecovered += 1;
        }
    }

    (recovered, unrecovered)
}

/// Shrink the matrix by `removed` lanes
///
/// Algorithm:
/// 1. Segment rows into regions of at least one conversion window
/// 2. Per region, drop the lowest-ranked lanes and compact the rest
/// 3. Copy heads that keep their spacing; holds keep their full length
/// 4. Reinsert notes into rows that fell below the floor
/// 5. Fill rows that are still empty, evicting neighbours if that is safe
pub fn remove_lanes<R: Rng + ?Sized>(
    matrix: &NoteMatrix,
    axis: &TimeAxis,
    removed: usize,
    min_lanes: usize,
    timing: &ConversionTiming,
    rng: &mut R,
) -> Result<RemovalOutcome, ConvertError> {
    let source_lanes = matrix.cols();
    let width = source_lanes.saturating_sub(removed);
    let rows = matrix.rows();

    if matrix.rows() != axis.len() {
        return Err(ConvertError::ShapeMismatch {
            matrix_rows: rows,
            axis_rows: axis.len(),
        });
    }

    let mut out = NoteMatrix::new(rows, width);
    if width == 0 || rows == 0 {
        return Ok(RemovalOutcome {
            matrix: out,
            dropped_lanes: Vec::new(),
            repaired: 0,
            recovered: 0,
            unrecovered: (0..rows).filter(|&row| matrix.head_count(row) > 0).count(),
        });
    }

    let holds = matrix.hold_lengths();
    let chart_weights = lane_weights(matrix, 0..rows);
    let spacing = Spacing {
        window_ms: timing.spacing_window_ms(),
        tail_ms: timing.tail_clearance_ms(),
    };
    let floor = min_lanes.max(1).min(width);

    let regions = segment_regions(axis, timing.conversion_window_ms);
    let mut dropped_lanes = Vec::with_capacity(regions.len());
    let mut repaired = 0;

    for region in regions {
        let dropped = rank_lanes(matrix, region.clone(), &chart_weights, removed);
        let remap = build_remap(source_lanes, &dropped);

        for row in region.clone() {
            for (lane, target) in remap.iter().enumerate() {
                let Some(col) = *target else {
                    continue;
                };
                let cell = matrix.get(row, lane);
                if !is_head(cell) {
                    continue;
                }
                let body = holds.get(&cell).copied().unwrap_or(0);
                if can_place(&out, axis, row, col, body, &spacing) {
                    out.write_note(row, col, cell, body);
                }
            }
        }

        out.reseal_holds(&holds);
        repaired += repair_region(&mut out, matrix, axis, region, floor, &holds, &spacing, rng);
        dropped_lanes.push(dropped);
    }

    let (recovered, unrecovered) = fill_empty_rows(&mut out, matrix, axis, &holds, &spacing, rng);

    log::debug!(
        "Lane removal {} -> {}: {} regions, {} repaired, {} recovered, {} unrecovered",
        source_lanes,
        width,
        dropped_lanes.len(),
        repaired,
        recovered,
        unrecovered
    );

    Ok(RemovalOutcome {
        matrix: out,
        dropped_lanes,
        repaired,
        recovered,
        unrecovered,
    })
}

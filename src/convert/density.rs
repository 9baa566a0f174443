// Density Corrector - Trims excess simultaneous notes per row
// Spreads deletions across lanes so no single lane is hollowed out

use rand::seq::SliceRandom;
use rand::Rng;

use crate::matrix::NoteMatrix;

/// Per-lane deletion counts for one conversion
///
/// Threaded explicitly through the corrector so that independent
/// conversions never share state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalLedger {
    counts: Vec<usize>,
}

impl RemovalLedger {
    pub fn new(lanes: usize) -> Self {
        RemovalLedger {
            counts: vec![0; lanes],
        }
    }

    pub fn count(&self, lane: usize) -> usize {
        self.counts.get(lane).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Sampling weight for a lane: lanes trimmed often are picked less
    pub fn weight(&self, lane: usize) -> f64 {
        1.0 / (1.0 + self.count(lane) as f64)
    }

    fn record(&mut self, lane: usize) {
        if lane >= self.counts.len() {
            self.counts.resize(lane + 1, 0);
        }
        self.counts[lane] += 1;
    }
}

/// Number of heads a row keeps after correction
///
/// `target = max(min, min(active, floor(active * (lanes - budget) / lanes)))`
pub fn row_target(active: usize, lanes: usize, max_removals: usize, min_lanes: usize) -> usize {
    if lanes == 0 {
        return active;
    }
    let scaled = active * lanes.saturating_sub(max_removals) / lanes;
    min_lanes.max(active.min(scaled))
}

/// Remove excess heads row by row
///
/// Rows with `min_lanes` heads or fewer are left alone. Removing a head
/// also removes its hold body. Returns the number of heads removed.
pub fn correct_density<R: Rng + ?Sized>(
    matrix: &mut NoteMatrix,
    max_removals: usize,
    min_lanes: usize,
    ledger: &mut RemovalLedger,
    rng: &mut R,
) -> usize {
    let lanes = matrix.cols();
    if max_removals == 0 || lanes == 0 {
        return 0;
    }

    let mut removed = 0;

    for row in 0..matrix.rows() {
        let mut pool = matrix.head_lanes(row);
        let active = pool.len();
        if active <= min_lanes {
            continue;
        }

        let target = row_target(active, lanes, max_removals, min_lanes);
        let to_remove = active - target;

        for _ in 0..to_remove {
            let picked = match pool.choose_weighted(rng, |&lane| ledger.weight(lane)) {
                Ok(&lane) => lane,
                Err(_) => break,
            };
            pool.retain(|&lane| lane != picked);

            matrix.clear_note(row, picked);
            ledger.record(picked);
            removed += 1;
        }
    }

    if removed > 0 {
        log::debug!("Density corrector removed {} notes", removed);
    }

    removed
}

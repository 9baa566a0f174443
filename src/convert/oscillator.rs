// Oscillating Index - Bounded random walk over lane indices
// Wanders back and forth between 0 and a maximum without jumping to extremes

use rand::Rng;

/// Stateful index in `[0, max_value]` that steps one unit per advance
#[derive(Debug, Clone)]
pub struct OscillatingIndex {
    value: usize,
    max_value: usize,
    ascending: bool,
}

impl OscillatingIndex {
    /// Start at a random position with a random direction
    pub fn new<R: Rng + ?Sized>(max_value: usize, rng: &mut R) -> Self {
        OscillatingIndex {
            value: rng.gen_range(0..=max_value),
            max_value,
            ascending: rng.gen_bool(0.5),
        }
    }

    pub fn value(&self) -> usize {
        self.value
    }

    pub fn max_value(&self) -> usize {
        self.max_value
    }

    /// Step once in the current direction, bouncing off either bound
    pub fn advance(&mut self) -> usize {
        if self.max_value == 0 {
            return 0;
        }

        if self.ascending && self.value >= self.max_value {
            self.ascending = false;
        } else if !self.ascending && self.value == 0 {
            self.ascending = true;
        }

        if self.ascending {
            self.value += 1;
        } else {
            self.value -= 1;
        }
        self.value
    }
}

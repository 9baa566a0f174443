// Note Matrix - Time x lane grid of note identifiers
// Rows follow the time axis, columns are lanes

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Cell value for an empty slot
pub const EMPTY: i32 = -1;

/// Cell value for a long-note body continuation
pub const HOLD_BODY: i32 = -7;

/// True if the cell holds a note head (the owning note's identifier)
#[inline]
pub fn is_head(cell: i32) -> bool {
    cell >= 0
}

/// Dense row-major grid of cells
///
/// Each head appears once; its body is the contiguous run of `HOLD_BODY`
/// cells directly below it in the same column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

impl NoteMatrix {
    /// Create an all-empty matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        NoteMatrix {
            rows,
            cols,
            cells: vec![EMPTY; rows * cols],
        }
    }

    /// Build a matrix from row vectors; every row must share the same width
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, ConvertError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut cells = Vec::with_capacity(rows.len() * cols);

        for row in &rows {
            if row.len() != cols {
                return Err(ConvertError::WidthMismatch {
                    width: row.len(),
                    expected: cols,
                });
            }
            cells.extend_from_slice(row);
        }

        Ok(NoteMatrix {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: i32) {
        self.cells[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[i32] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    /// Copy out as nested row vectors
    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    /// Number of note heads in a row
    pub fn head_count(&self, row: usize) -> usize {
        self.row(row).iter().filter(|&&c| is_head(c)).count()
    }

    /// Lanes holding a note head in a row
    pub fn head_lanes(&self, row: usize) -> Vec<usize> {
        self.row(row)
            .iter()
            .enumerate()
            .filter(|(_, &c)| is_head(c))
            .map(|(lane, _)| lane)
            .collect()
    }

    /// True if every cell in the row is empty (held bodies count as occupied)
    pub fn is_row_empty(&self, row: usize) -> bool {
        self.row(row).iter().all(|&c| c == EMPTY)
    }

    pub fn total_heads(&self) -> usize {
        self.cells.iter().filter(|&&c| is_head(c)).count()
    }

    pub fn empty_rows(&self) -> usize {
        (0..self.rows).filter(|&r| self.is_row_empty(r)).count()
    }

    /// Length in rows of the body run below a head
    pub fn body_length(&self, row: usize, col: usize) -> usize {
        (row + 1..self.rows)
            .take_while(|&r| self.get(r, col) == HOLD_BODY)
            .count()
    }

    /// Body length of every long note, keyed by note identifier
    pub fn hold_lengths(&self) -> HashMap<i32, usize> {
        let mut lengths = HashMap::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = self.get(row, col);
                if is_head(cell) {
                    let len = self.body_length(row, col);
                    if len > 0 {
                        lengths.insert(cell, len);
                    }
                }
            }
        }
        lengths
    }

    /// True if every cell of a column in `from..=to` is empty
    pub fn span_is_free(&self, col: usize, from: usize, to: usize) -> bool {
        if to >= self.rows {
            return false;
        }
        (from..=to).all(|r| self.get(r, col) == EMPTY)
    }

    /// Write a head and `body_len` body cells below it
    pub fn write_note(&mut self, row: usize, col: usize, id: i32, body_len: usize) {
        self.set(row, col, id);
        let end = (row + body_len).min(self.rows.saturating_sub(1));
        for r in row + 1..=end {
            self.set(r, col, HOLD_BODY);
        }
    }

    /// Erase a head together with its body run
    ///
    /// Returns the number of cells cleared. Clearing a body cell directly is
    /// refused, it would orphan the rest of the run.
    pub fn clear_note(&mut self, row: usize, col: usize) -> usize {
        if !is_head(self.get(row, col)) {
            return 0;
        }
        let body = self.body_length(row, col);
        for r in row..=row + body {
            self.set(r, col, EMPTY);
        }
        body + 1
    }

    /// True if erasing the note at (row, col) would leave one of its rows fully empty
    pub fn clear_would_empty_row(&self, row: usize, col: usize) -> bool {
        let body = self.body_length(row, col);
        (row..=row + body).any(|r| {
            self.row(r)
                .iter()
                .enumerate()
                .all(|(c, &v)| c == col || v == EMPTY)
        })
    }

    /// Re-derive body continuation below heads with a known hold length
    ///
    /// Fills empty cells inside each head's span; stops at the first cell
    /// owned by another head. Returns the number of cells filled.
    pub fn reseal_holds(&mut self, lengths: &HashMap<i32, usize>) -> usize {
        let mut filled = 0;
        for col in 0..self.cols {
            for row in 0..self.rows {
                let Some(&len) = lengths.get(&self.get(row, col)) else {
                    continue;
                };
                for r in row + 1..(row + 1 + len).min(self.rows) {
                    match self.get(r, col) {
                        EMPTY => {
                            self.set(r, col, HOLD_BODY);
                            filled += 1;
                        }
                        HOLD_BODY => {}
                        _ => break,
                    }
                }
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NoteMatrix {
        NoteMatrix::from_rows(vec![
            vec![0, EMPTY, 1],
            vec![HOLD_BODY, EMPTY, EMPTY],
            vec![HOLD_BODY, 2, EMPTY],
            vec![3, EMPTY, EMPTY],
            vec![EMPTY, EMPTY, EMPTY],
        ])
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = NoteMatrix::from_rows(vec![vec![0, 1], vec![EMPTY]]);
        assert!(matches!(
            result,
            Err(ConvertError::WidthMismatch { width: 1, expected: 2 })
        ));
    }

    #[test]
    fn test_counts() {
        let m = sample();
        assert_eq!(m.rows(), 5);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.head_count(0), 2);
        assert_eq!(m.head_count(1), 0);
        assert!(!m.is_row_empty(1)); // held body
        assert!(m.is_row_empty(4));
        assert_eq!(m.total_heads(), 4);
        assert_eq!(m.empty_rows(), 1);
        assert_eq!(m.head_lanes(0), vec![0, 2]);
    }

    #[test]
    fn test_hold_lengths() {
        let m = sample();
        let lengths = m.hold_lengths();
        assert_eq!(lengths.get(&0), Some(&2));
        assert_eq!(lengths.get(&1), None);
        assert_eq!(m.body_length(3, 0), 0);
    }

    #[test]
    fn test_clear_note_cascades_body() {
        let mut m = sample();
        assert_eq!(m.clear_note(0, 0), 3);
        assert_eq!(m.get(1, 0), EMPTY);
        assert_eq!(m.get(2, 0), EMPTY);
        // Next head in the column is untouched
        assert_eq!(m.get(3, 0), 3);
    }

    #[test]
    fn test_clear_body_cell_is_refused() {
        let mut m = sample();
        assert_eq!(m.clear_note(1, 0), 0);
        assert_eq!(m.get(1, 0), HOLD_BODY);
    }

    #[test]
    fn test_clear_would_empty_row() {
        let m = sample();
        // Row 1 holds nothing but the body of head 0
        assert!(m.clear_would_empty_row(0, 0));
        assert!(!m.clear_would_empty_row(0, 2));
        // Head 3 is alone in row 3
        assert!(m.clear_would_empty_row(3, 0));
    }

    #[test]
    fn test_write_note_and_span() {
        let mut m = NoteMatrix::new(4, 2);
        assert!(m.span_is_free(1, 0, 3));
        assert!(!m.span_is_free(1, 0, 4));
        m.write_note(0, 1, 9, 2);
        assert_eq!(m.row(0), &[EMPTY, 9]);
        assert_eq!(m.get(2, 1), HOLD_BODY);
        assert_eq!(m.get(3, 1), EMPTY);
        assert!(!m.span_is_free(1, 1, 3));
    }

    #[test]
    fn test_reseal_holds_fills_gaps_only_inside_span() {
        let mut m = NoteMatrix::from_rows(vec![
            vec![4],
            vec![EMPTY],
            vec![HOLD_BODY],
            vec![EMPTY],
            vec![EMPTY],
        ])
        .unwrap();
        let mut lengths = HashMap::new();
        lengths.insert(4, 3);

        assert_eq!(m.reseal_holds(&lengths), 2);
        assert_eq!(m.body_length(0, 0), 3);
        assert_eq!(m.get(4, 0), EMPTY);
    }

    #[test]
    fn test_reseal_stops_at_foreign_head() {
        let mut m = NoteMatrix::from_rows(vec![vec![4], vec![EMPTY], vec![5], vec![EMPTY]])
            .unwrap();
        let mut lengths = HashMap::new();
        lengths.insert(4, 3);

        m.reseal_holds(&lengths);
        assert_eq!(m.get(1, 0), HOLD_BODY);
        assert_eq!(m.get(2, 0), 5);
        assert_eq!(m.get(3, 0), EMPTY);
    }
}

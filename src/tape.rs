//! The interpreter's memory: a row of byte cells that grows in both directions.

use std::collections::VecDeque;

/// A growable tape of 8-bit cells with a cursor.
///
/// There is always at least one cell, and the cursor always refers to one of them. Moving past
/// either end appends a fresh zero cell on that side, so earlier values are never lost.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: VecDeque<u8>,
    cursor: usize,
}

impl Tape {
    pub fn new() -> Self {
        let mut cells = VecDeque::new();
        cells.push_back(0);
        Tape { cells, cursor: 0 }
    }

    /// Moves the cursor one cell towards the high end.
    pub fn advance(&mut self) {
        if self.cursor + 1 == self.cells.len() {
            self.cells.push_back(0);
        }
        self.cursor += 1;
    }

    /// Moves the cursor one cell towards the low end.
    pub fn retreat(&mut self) {
        if self.cursor == 0 {
            // the cursor keeps index 0, which is now the new cell
            self.cells.push_front(0);
        } else {
            self.cursor -= 1;
        }
    }

    pub fn increment(&mut self) {
        let cell = self.cell_mut();
        *cell = cell.wrapping_add(1);
    }

    pub fn decrement(&mut self) {
        let cell = self.cell_mut();
        *cell = cell.wrapping_sub(1);
    }

    pub fn read(&self) -> u8 {
        self.cells[self.cursor]
    }

    pub fn write(&mut self, value: u8) {
        *self.cell_mut() = value;
    }

    /// Number of cells allocated so far.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Index of the cursor, counted from the current low end.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn cell_mut(&mut self) -> &mut u8 {
        &mut self.cells[self.cursor]
    }
}

impl Default for Tape {
    fn default() -> Self {
        Tape::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_zero_cell() {
        let tape = Tape::new();
        assert_eq!(tape.len(), 1);
        assert_eq!(tape.cursor(), 0);
        assert_eq!(tape.read(), 0);
    }

    #[test]
    fn cells_wrap_modulo_256() {
        let mut tape = Tape::new();
        tape.decrement();
        assert_eq!(tape.read(), 255);
        tape.increment();
        assert_eq!(tape.read(), 0);

        tape.write(255);
        tape.increment();
        assert_eq!(tape.read(), 0);
    }

    #[test]
    fn grows_at_both_ends() {
        let mut tape = Tape::new();
        tape.retreat();
        assert_eq!(tape.len(), 2);
        assert_eq!(tape.cursor(), 0);

        tape.advance();
        tape.advance();
        assert_eq!(tape.len(), 3);
        assert_eq!(tape.cursor(), 2);

        // moving back over existing cells allocates nothing
        tape.retreat();
        assert_eq!(tape.len(), 3);
        assert_eq!(tape.cursor(), 1);
    }

    #[test]
    fn values_survive_long_excursions() {
        let mut tape = Tape::new();
        tape.write(42);

        for _ in 0..1000 {
            tape.retreat();
        }
        tape.write(7);
        for _ in 0..3000 {
            tape.advance();
        }
        for _ in 0..2000 {
            tape.retreat();
        }
        assert_eq!(tape.read(), 42);

        for _ in 0..1000 {
            tape.retreat();
        }
        assert_eq!(tape.read(), 7);
    }
}

//! The fixed-size puzzle board.
//!
//! A 6x6 grid of cells, each holding a species and a frozen flag.
//! Coordinates are 1-indexed `(row, col)` with row 1 at the top; reads
//! outside the grid yield [`SpeciesId::AIR`] so window scans never bound-
//! check. Every board handed to the simulation is a private deep copy —
//! `Clone` produces exclusively-owned state.
//!
//! Structural equality and hashing cover the grid contents only (species and
//! frozen flags); the remaining-move counter used by lookahead is excluded.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::species::SpeciesId;

/// Number of rows on the board.
pub const BOARD_ROWS: usize = 6;

/// Number of columns on the board.
pub const BOARD_COLS: usize = 6;

/// One board cell: a species plus a frozen flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct Cell {
    species: SpeciesId,
    frozen: bool,
}

impl Cell {
    const EMPTY: Cell = Cell {
        species: SpeciesId::AIR,
        frozen: false,
    };
}

/// A 6x6 puzzle board.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Cell>,
    moves_remaining: u8,
}

impl Board {
    /// Create an empty board (all air, nothing frozen).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cells: vec![Cell::EMPTY; BOARD_ROWS * BOARD_COLS],
            moves_remaining: 0,
        }
    }

    /// Build a board from raw species IDs, row by row from the top.
    ///
    /// Intended for tests and fixtures.
    #[must_use]
    pub fn from_grid(rows: [[u16; BOARD_COLS]; BOARD_ROWS]) -> Self {
        let mut board = Self::empty();
        for (r, row) in rows.iter().enumerate() {
            for (c, &id) in row.iter().enumerate() {
                board.set_species_at(r + 1, c + 1, SpeciesId::new(id));
            }
        }
        board
    }

    #[inline]
    fn idx(row: usize, col: usize) -> usize {
        (row - 1) * BOARD_COLS + (col - 1)
    }

    /// Check whether a 1-indexed coordinate is on the board.
    #[must_use]
    pub fn in_bounds(row: usize, col: usize) -> bool {
        (1..=BOARD_ROWS).contains(&row) && (1..=BOARD_COLS).contains(&col)
    }

    /// The species at a 1-indexed coordinate; air outside the grid.
    #[must_use]
    pub fn species_at(&self, row: usize, col: usize) -> SpeciesId {
        if Self::in_bounds(row, col) {
            self.cells[Self::idx(row, col)].species
        } else {
            SpeciesId::AIR
        }
    }

    /// Set the species at a 1-indexed coordinate.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is off the board.
    pub fn set_species_at(&mut self, row: usize, col: usize, species: SpeciesId) {
        assert!(Self::in_bounds(row, col), "coordinate ({row},{col}) off board");
        self.cells[Self::idx(row, col)].species = species;
    }

    /// Whether the cell at a 1-indexed coordinate is frozen; false outside.
    #[must_use]
    pub fn is_frozen_at(&self, row: usize, col: usize) -> bool {
        Self::in_bounds(row, col) && self.cells[Self::idx(row, col)].frozen
    }

    /// Set the frozen flag at a 1-indexed coordinate.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is off the board.
    pub fn set_frozen_at(&mut self, row: usize, col: usize, frozen: bool) {
        assert!(Self::in_bounds(row, col), "coordinate ({row},{col}) off board");
        self.cells[Self::idx(row, col)].frozen = frozen;
    }

    /// All non-air species present on the board.
    #[must_use]
    pub fn species_present(&self) -> FxHashSet<SpeciesId> {
        self.cells
            .iter()
            .map(|c| c.species)
            .filter(|s| !s.is_air())
            .collect()
    }

    /// Iterate over all cells as `(row, col, species, frozen)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, SpeciesId, bool)> + '_ {
        self.cells.iter().enumerate().map(|(i, c)| {
            (i / BOARD_COLS + 1, i % BOARD_COLS + 1, c.species, c.frozen)
        })
    }

    /// Moves left before the stage ends (used by lookahead).
    #[must_use]
    pub fn moves_remaining(&self) -> u8 {
        self.moves_remaining
    }

    /// Set the remaining-move counter.
    pub fn set_moves_remaining(&mut self, moves: u8) {
        self.moves_remaining = moves;
    }

    /// Decrement the remaining-move counter, saturating at zero.
    pub fn decrement_moves_remaining(&mut self) {
        self.moves_remaining = self.moves_remaining.saturating_sub(1);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

// Equality is structural over the grid only; `moves_remaining` is bookkeeping.
impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cells.hash(state);
    }
}

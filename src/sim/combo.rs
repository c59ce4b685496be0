//! Run detection: the 3-in-a-row pre-check and the full-board run scan.
//!
//! [`forms_combo`] answers "would this species at this cell be part of a
//! horizontal or vertical run of three?" and is the legality filter for
//! move enumeration. [`find_runs`] locates every completed run on a board
//! and backs the cascade resolution in the reference executor.

use smallvec::SmallVec;

use crate::board::{Board, SpeciesDex, SpeciesId, BOARD_COLS, BOARD_ROWS};

/// Check whether `species` placed at `(row, col)` participates in a run of
/// three or more matching, combo-capable pieces.
///
/// Scans a 5-cell window centered on the coordinate in both directions. The
/// center position always counts as matching, since it stands for the
/// hypothetical placement being tested; a run-length counter resets on every
/// non-matching cell and a count of three anywhere in the window is a combo.
#[must_use]
pub fn forms_combo(
    board: &Board,
    row: usize,
    col: usize,
    species: SpeciesId,
    dex: &SpeciesDex,
) -> bool {
    if !dex.is_pickable(species) {
        return false;
    }

    let mut v_run = 0u32;
    let mut h_run = 0u32;
    for i in 0..5 {
        // Offsets -2..=2 from the center; reads off the board are air and
        // never match a pickable species.
        let v_matches = (row + i)
            .checked_sub(2)
            .is_some_and(|r| board.species_at(r, col) == species);
        if i == 2 || v_matches {
            v_run += 1;
        } else {
            v_run = 0;
        }

        let h_matches = (col + i)
            .checked_sub(2)
            .is_some_and(|c| board.species_at(row, c) == species);
        if i == 2 || h_matches {
            h_run += 1;
        } else {
            h_run = 0;
        }

        if v_run >= 3 || h_run >= 3 {
            return true;
        }
    }
    false
}

/// A completed run of matching cells, in scan order.
pub type Run = SmallVec<[(usize, usize); 6]>;

/// Find every horizontal and vertical run of three or more matching,
/// combo-capable pieces on the board.
///
/// Rows are scanned top to bottom, then columns left to right, so the result
/// order is deterministic. A cell may appear in both a horizontal and a
/// vertical run (a cross).
#[must_use]
pub fn find_runs(board: &Board, dex: &SpeciesDex) -> Vec<Run> {
    let mut runs = Vec::new();

    for row in 1..=BOARD_ROWS {
        scan_line(board, dex, &mut runs, (1..=BOARD_COLS).map(|col| (row, col)));
    }
    for col in 1..=BOARD_COLS {
        scan_line(board, dex, &mut runs, (1..=BOARD_ROWS).map(|row| (row, col)));
    }

    runs
}

fn scan_line(
    board: &Board,
    dex: &SpeciesDex,
    runs: &mut Vec<Run>,
    line: impl Iterator<Item = (usize, usize)>,
) {
    let mut current: Run = SmallVec::new();
    let mut current_species = SpeciesId::AIR;

    for (row, col) in line {
        let species = board.species_at(row, col);
        if !species.is_air() && species == current_species {
            current.push((row, col));
            continue;
        }
        if current.len() >= 3 {
            runs.push(current.clone());
        }
        current.clear();
        if dex.is_pickable(species) {
            current.push((row, col));
        }
        current_species = if dex.is_pickable(species) {
            species
        } else {
            SpeciesId::AIR
        };
    }
    if current.len() >= 3 {
        runs.push(current);
    }
}

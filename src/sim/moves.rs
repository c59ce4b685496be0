//! Legal move enumeration.
//!
//! A swap is legal when the two cells differ in species, neither is frozen,
//! and performing the swap completes a run of three at either end. The scan
//! order is fixed (row-major picks, row-major drops) so identical boards
//! always enumerate identical move lists, keeping the parallel fan-out
//! reproducible.

use crate::board::{Board, Move, SpeciesDex, BOARD_COLS, BOARD_ROWS};

use super::combo::forms_combo;

/// Enumerate every legal move on the board.
#[must_use]
pub fn legal_moves(board: &Board, dex: &SpeciesDex) -> Vec<Move> {
    let mut picks: Vec<(usize, usize)> = Vec::new();
    let mut drops: Vec<(usize, usize)> = Vec::new();

    for row in 1..=BOARD_ROWS {
        for col in 1..=BOARD_COLS {
            let effect = dex.effect_for(board.species_at(row, col));
            if effect.droppable && !board.is_frozen_at(row, col) {
                drops.push((row, col));
                if effect.pickable {
                    picks.push((row, col));
                }
            }
        }
    }

    let mut moves = Vec::new();
    for &pick in &picks {
        for &drop in &drops {
            if is_allowed(pick, drop, board, dex) {
                moves.push(Move::new(
                    pick.0 as u8,
                    pick.1 as u8,
                    drop.0 as u8,
                    drop.1 as u8,
                ));
            }
        }
    }
    moves
}

/// Check whether swapping `pick` and `drop` is a legal move.
#[must_use]
pub fn is_allowed(
    pick: (usize, usize),
    drop: (usize, usize),
    board: &Board,
    dex: &SpeciesDex,
) -> bool {
    let picked = board.species_at(pick.0, pick.1);
    let dropped_on = board.species_at(drop.0, drop.1);

    if pick == drop
        || picked == dropped_on
        || board.is_frozen_at(pick.0, pick.1)
        || board.is_frozen_at(drop.0, drop.1)
    {
        return false;
    }

    // Simulate the swap on a scratch copy and look for a combo at either end.
    let mut after_swap = board.clone();
    after_swap.set_species_at(drop.0, drop.1, picked);
    after_swap.set_species_at(pick.0, pick.1, dropped_on);

    forms_combo(&after_swap, drop.0, drop.1, picked, dex)
        || forms_combo(&after_swap, pick.0, pick.1, dropped_on, dex)
}

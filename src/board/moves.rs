//! The player move: pick one piece up, drop it on another.

use serde::{Deserialize, Serialize};

/// A player swap, as 1-indexed pick and drop coordinates.
///
/// The settle case ("no swap, let the board resolve") is represented as
/// `Option<Move>::None` wherever a move may be absent; its display form is
/// the bare pick coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Row of the picked-up piece.
    pub pick_row: u8,
    /// Column of the picked-up piece.
    pub pick_col: u8,
    /// Row the piece is dropped on.
    pub drop_row: u8,
    /// Column the piece is dropped on.
    pub drop_col: u8,
}

impl Move {
    /// Create a move from its four 1-indexed coordinates.
    #[must_use]
    pub const fn new(pick_row: u8, pick_col: u8, drop_row: u8, drop_col: u8) -> Self {
        Self {
            pick_row,
            pick_col,
            drop_row,
            drop_col,
        }
    }

    /// The pick coordinate as `(row, col)`.
    #[must_use]
    pub const fn pick(&self) -> (usize, usize) {
        (self.pick_row as usize, self.pick_col as usize)
    }

    /// The drop coordinate as `(row, col)`.
    #[must_use]
    pub const fn drop(&self) -> (usize, usize) {
        (self.drop_row as usize, self.drop_col as usize)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{} -> {},{}",
            self.pick_row, self.pick_col, self.drop_row, self.drop_col
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_accessors() {
        let mv = Move::new(3, 1, 3, 4);
        assert_eq!(mv.pick(), (3, 1));
        assert_eq!(mv.drop(), (3, 4));
    }

    #[test]
    fn test_move_display() {
        let mv = Move::new(1, 2, 6, 2);
        assert_eq!(mv.to_string(), "1,2 -> 6,2");
    }
}

//! Board domain: the grid, piece types, moves, and stage/team inputs.
//!
//! Everything here is a plain value. Boards are deep-copied at the
//! simulation boundary so concurrent computations never share mutable
//! state with the caller.

pub mod grid;
pub mod moves;
pub mod species;
pub mod stage;

pub use grid::{Board, BOARD_COLS, BOARD_ROWS};
pub use moves::Move;
pub use species::{Effect, SpeciesDex, SpeciesId};
pub use stage::{Stage, Team};

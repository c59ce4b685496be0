//! Feeder variations: randomized guesses of future spawns.
//!
//! A feeder holds, per column, the queue of species that will fall in as
//! cells clear. One computation samples several variations and averages the
//! per-move outcomes over them, turning spawn randomness into the value
//! spans carried by result nodes.

use smallvec::SmallVec;

use crate::board::{SpeciesId, BOARD_COLS};
use crate::core::SimRng;

use super::snapshot::RequestSnapshot;
use super::traits::FeederGenerator;

/// One sampled pattern of future spawns, a queue per column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeederVariation {
    columns: [SmallVec<[SpeciesId; 8]>; BOARD_COLS],
}

impl FeederVariation {
    /// A feeder with every column empty.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a species to a column's queue (1-indexed column).
    ///
    /// # Panics
    ///
    /// Panics if the column is out of range.
    pub fn push(&mut self, col: usize, species: SpeciesId) {
        assert!((1..=BOARD_COLS).contains(&col), "column {col} off board");
        self.columns[col - 1].push(species);
    }

    /// Take the next species that falls into a column, if any.
    pub fn take(&mut self, col: usize) -> Option<SpeciesId> {
        if !(1..=BOARD_COLS).contains(&col) || self.columns[col - 1].is_empty() {
            return None;
        }
        Some(self.columns[col - 1].remove(0))
    }

    /// Remaining queue length for a column.
    #[must_use]
    pub fn len(&self, col: usize) -> usize {
        if (1..=BOARD_COLS).contains(&col) {
            self.columns[col - 1].len()
        } else {
            0
        }
    }

    /// Whether every column queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(SmallVec::is_empty)
    }
}

/// Samples feeder variations uniformly from the snapshot's spawnable set.
///
/// Seeded: the same seed and snapshot always produce the same variations,
/// which keeps whole computations reproducible in tests. Each variation
/// draws from its own forked RNG stream.
#[derive(Clone, Debug)]
pub struct RandomFeederGenerator {
    seed: u64,
}

impl RandomFeederGenerator {
    /// Create a generator with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for RandomFeederGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}

impl FeederGenerator for RandomFeederGenerator {
    fn generate(&self, snapshot: &RequestSnapshot, min_height: u8) -> Vec<FeederVariation> {
        let count = snapshot.variation_count.max(1);

        // Hash-set iteration order is unstable; sort so the same spawnable
        // set always samples the same sequence.
        let mut pool: Vec<SpeciesId> = snapshot.spawnable.iter().copied().collect();
        pool.sort();

        let mut rng = SimRng::new(self.seed);
        (0..count)
            .map(|_| {
                let mut branch = rng.fork();
                let mut variation = FeederVariation::empty();
                if !pool.is_empty() {
                    for col in 1..=BOARD_COLS {
                        for _ in 0..min_height {
                            let idx = branch.gen_range_usize(0..pool.len());
                            variation.push(col, pool[idx]);
                        }
                    }
                }
                variation
            })
            .collect()
    }
}

//! Stage and team snapshot inputs.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::species::SpeciesId;

/// The stage being played: identity plus its starting budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name (display only).
    pub name: String,

    /// Starting health of the stage.
    pub health: i32,

    /// Starting move budget.
    pub moves: u8,
}

impl Stage {
    /// Create a stage.
    #[must_use]
    pub fn new(name: impl Into<String>, health: i32, moves: u8) -> Self {
        Self {
            name: name.into(),
            health,
            moves,
        }
    }
}

/// The player's team composition and mega-evolution state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    members: Vec<SpeciesId>,
    non_support: FxHashSet<SpeciesId>,
    mega_slot: Option<SpeciesId>,
    mega_threshold: u32,
}

impl Team {
    /// Create a team from its member species.
    #[must_use]
    pub fn new(members: Vec<SpeciesId>) -> Self {
        Self {
            members,
            non_support: FxHashSet::default(),
            mega_slot: None,
            mega_threshold: 0,
        }
    }

    /// Assign the mega slot and its evolution threshold.
    #[must_use]
    pub fn with_mega(mut self, slot: SpeciesId, threshold: u32) -> Self {
        self.mega_slot = Some(slot);
        self.mega_threshold = threshold;
        self
    }

    /// Mark a member as non-support (it will not count toward support sets).
    #[must_use]
    pub fn with_non_support(mut self, species: SpeciesId) -> Self {
        self.non_support.insert(species);
        self
    }

    /// The team members.
    #[must_use]
    pub fn members(&self) -> &[SpeciesId] {
        &self.members
    }

    /// Whether a species is marked non-support.
    #[must_use]
    pub fn is_non_support(&self, species: SpeciesId) -> bool {
        self.non_support.contains(&species)
    }

    /// The mega slot species, if one is assigned.
    #[must_use]
    pub fn mega_slot(&self) -> Option<SpeciesId> {
        self.mega_slot
    }

    /// Icons required for the mega slot to evolve.
    #[must_use]
    pub fn mega_threshold(&self) -> u32 {
        self.mega_threshold
    }
}

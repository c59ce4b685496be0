//! Piece types and their behavior records.
//!
//! ## SpeciesId
//!
//! Type-safe identifier for a piece type ("species"). A handful of fixed
//! species exist in every game: the empty cell, coins, and the two
//! block disruptions. Everything else is registered per game.
//!
//! ## Effect
//!
//! A species' behavior record: whether the player can pick it up, whether it
//! falls and can be dropped onto, whether it spawns from the sky-fall, and
//! whether clearing it counts as removing a disruption. Carries the
//! per-skill-level damage multiplier table.
//!
//! ## SpeciesDex
//!
//! The lookup table mapping species to effect, level, and skill level.
//! Snapshots deep-copy it so in-flight computations never observe roster
//! edits.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Identifier for a piece type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

impl SpeciesId {
    /// The empty cell.
    pub const AIR: SpeciesId = SpeciesId(0);

    /// Coin pickup, converts to gold when cleared.
    pub const COIN: SpeciesId = SpeciesId(1);

    /// Wooden block disruption.
    pub const WOOD: SpeciesId = SpeciesId(2);

    /// Metal block disruption.
    pub const METAL: SpeciesId = SpeciesId(3);

    /// Species that exist in every game and never belong to a team.
    pub const FIXED: [SpeciesId; 4] = [Self::AIR, Self::COIN, Self::WOOD, Self::METAL];

    /// Create a new species ID.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if this is the empty cell.
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == Self::AIR.0
    }

    /// Check if this is one of the fixed species.
    #[must_use]
    pub fn is_fixed(self) -> bool {
        Self::FIXED.contains(&self)
    }
}

impl std::fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Species({})", self.0)
    }
}

/// Behavior record for a species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Can the player pick this piece up (participate in matches)?
    pub pickable: bool,

    /// Does this piece fall, and can a picked piece be dropped onto it?
    pub droppable: bool,

    /// Does this species spawn from the sky-fall?
    pub auto_generated: bool,

    /// Does clearing it count as removing a disruption?
    pub disruptive: bool,

    /// Damage multiplier indexed by skill level 1-5.
    mult: [f64; 5],
}

impl Effect {
    /// A species with no behavior at all (the empty cell).
    pub const INERT: Effect = Effect {
        pickable: false,
        droppable: false,
        auto_generated: false,
        disruptive: false,
        mult: [1.0; 5],
    };

    /// A standard team member: matchable, falls, spawns from the sky.
    #[must_use]
    pub fn team_member() -> Self {
        Effect {
            pickable: true,
            droppable: true,
            auto_generated: true,
            disruptive: false,
            mult: [1.0; 5],
        }
    }

    /// A coin: falls and spawns but cannot be matched by the player.
    #[must_use]
    pub fn coin() -> Self {
        Effect {
            pickable: false,
            droppable: true,
            auto_generated: true,
            disruptive: false,
            mult: [1.0; 5],
        }
    }

    /// A block disruption: fixed in place until cleared from the side.
    #[must_use]
    pub fn block() -> Self {
        Effect {
            pickable: false,
            droppable: false,
            auto_generated: false,
            disruptive: true,
            mult: [1.0; 5],
        }
    }

    /// Set the per-skill-level multiplier table.
    #[must_use]
    pub fn with_mult(mut self, mult: [f64; 5]) -> Self {
        self.mult = mult;
        self
    }

    /// Damage multiplier for a skill level (clamped to 1-5).
    #[must_use]
    pub fn mult(&self, skill_level: u8) -> f64 {
        let idx = skill_level.clamp(1, 5) as usize - 1;
        self.mult[idx]
    }
}

/// Per-species configuration: effect, level, skill level.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct DexEntry {
    effect: Effect,
    level: u8,
    skill: u8,
}

/// Lookup table from species to their configuration.
///
/// Unknown species read as inert at level 0, skill 1, so lookups are total.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesDex {
    entries: FxHashMap<SpeciesId, DexEntry>,
}

impl SpeciesDex {
    /// Create a dex with the fixed species pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let mut dex = Self {
            entries: FxHashMap::default(),
        };
        dex.register(SpeciesId::AIR, Effect::INERT, 0, 1);
        dex.register(SpeciesId::COIN, Effect::coin(), 0, 1);
        dex.register(SpeciesId::WOOD, Effect::block(), 0, 1);
        dex.register(SpeciesId::METAL, Effect::block(), 0, 1);
        dex
    }

    /// Register a species with its effect, level, and skill level.
    pub fn register(&mut self, species: SpeciesId, effect: Effect, level: u8, skill: u8) {
        self.entries.insert(
            species,
            DexEntry {
                effect,
                level,
                skill,
            },
        );
    }

    /// The effect for a species (inert if unregistered).
    #[must_use]
    pub fn effect_for(&self, species: SpeciesId) -> &Effect {
        self.entries
            .get(&species)
            .map_or(&Effect::INERT, |e| &e.effect)
    }

    /// The level for a species (0 if unregistered).
    #[must_use]
    pub fn level_for(&self, species: SpeciesId) -> u8 {
        self.entries.get(&species).map_or(0, |e| e.level)
    }

    /// The skill level for a species (1 if unregistered).
    #[must_use]
    pub fn skill_for(&self, species: SpeciesId) -> u8 {
        self.entries.get(&species).map_or(1, |e| e.skill)
    }

    /// Whether a species can be picked up by the player.
    #[must_use]
    pub fn is_pickable(&self, species: SpeciesId) -> bool {
        self.effect_for(species).pickable
    }

    /// Whether a species falls and can be dropped onto.
    #[must_use]
    pub fn is_droppable(&self, species: SpeciesId) -> bool {
        self.effect_for(species).droppable
    }

    /// Iterate over all registered species.
    pub fn all_species(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for SpeciesDex {
    fn default() -> Self {
        Self::new()
    }
}

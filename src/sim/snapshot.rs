//! The immutable per-request snapshot.
//!
//! A [`RequestSnapshot`] captures, by deep copy, everything one computation
//! needs: board, stage, team, species tables, derived species sets, counters,
//! and feature flags. Later edits to the caller's live state cannot reach an
//! in-flight computation, which is what makes the fan-out safe to run
//! against concurrent user edits without any locking.
//!
//! Construction goes through [`SnapshotBuilder`]; a missing board, stage, or
//! team is a configuration fault reported eagerly as [`SnapshotError`].

use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::board::{Board, SpeciesDex, SpeciesId, Stage, Team};

/// Identifier of one computation request.
///
/// Only equality is ever checked (the staleness protocol compares the
/// orchestrator's id against the acceptor's most recent one), so a
/// process-wide monotonic counter is sufficient and keeps tests
/// deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Allocate a fresh, process-unique request id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// Configuration faults detected at snapshot construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot requires a board")]
    MissingBoard,
    #[error("snapshot requires a stage")]
    MissingStage,
    #[error("snapshot requires a team")]
    MissingTeam,
}

/// Immutable bundle of everything one computation request needs.
#[derive(Clone, Debug)]
pub struct RequestSnapshot {
    /// The board as it stood when the request was issued.
    pub board: Board,

    /// The stage being played.
    pub stage: Stage,

    /// The player's team.
    pub team: Team,

    /// Species configuration tables.
    pub dex: SpeciesDex,

    /// Team members that count as support.
    pub support: FxHashSet<SpeciesId>,

    /// Known species that are not support.
    pub non_support: FxHashSet<SpeciesId>,

    /// Species eligible to spawn from the sky-fall.
    pub spawnable: FxHashSet<SpeciesId>,

    /// Icons cleared toward mega evolution so far.
    pub mega_progress: u32,

    /// Whether mega evolution is enabled for this run.
    pub mega_allowed: bool,

    /// Icons required for the mega slot to evolve.
    pub mega_threshold: u32,

    /// Stage health left when the request was issued.
    pub remaining_health: i32,

    /// Moves left *after* the move being chosen resolves.
    pub remaining_moves: u8,

    /// Minimum number of activated pieces before effects may trigger.
    pub effect_threshold: u32,

    /// Attack power-up active (doubles damage).
    pub attack_power_up: bool,

    /// Mobile-version rules in effect.
    pub mobile_mode: bool,

    /// How far into the future feeders generate.
    pub feeder_height: u8,

    /// Number of feeder variations to average over.
    pub variation_count: u32,

    /// Key of the grading mode selected for this request.
    pub grading_key: String,
}

/// Builder for [`RequestSnapshot`].
///
/// Board, stage, and team are required; everything else defaults.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    board: Option<Board>,
    stage: Option<Stage>,
    team: Option<Team>,
    dex: SpeciesDex,
    mega_progress: u32,
    mega_allowed: bool,
    remaining_health: i32,
    remaining_moves: u8,
    effect_threshold: u32,
    attack_power_up: bool,
    mobile_mode: bool,
    feeder_height: u8,
    variation_count: u32,
    grading_key: Option<String>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            variation_count: 1,
            ..Self::default()
        }
    }

    pub fn board(mut self, board: Board) -> Self {
        self.board = Some(board);
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    pub fn dex(mut self, dex: SpeciesDex) -> Self {
        self.dex = dex;
        self
    }

    pub fn mega_progress(mut self, progress: u32) -> Self {
        self.mega_progress = progress;
        self
    }

    pub fn mega_allowed(mut self, allowed: bool) -> Self {
        self.mega_allowed = allowed;
        self
    }

    pub fn remaining_health(mut self, health: i32) -> Self {
        self.remaining_health = health;
        self
    }

    pub fn remaining_moves(mut self, moves: u8) -> Self {
        self.remaining_moves = moves;
        self
    }

    pub fn effect_threshold(mut self, threshold: u32) -> Self {
        self.effect_threshold = threshold;
        self
    }

    pub fn attack_power_up(mut self, on: bool) -> Self {
        self.attack_power_up = on;
        self
    }

    pub fn mobile_mode(mut self, on: bool) -> Self {
        self.mobile_mode = on;
        self
    }

    pub fn feeder_height(mut self, height: u8) -> Self {
        self.feeder_height = height;
        self
    }

    pub fn variation_count(mut self, count: u32) -> Self {
        self.variation_count = count;
        self
    }

    pub fn grading_key(mut self, key: impl Into<String>) -> Self {
        self.grading_key = Some(key.into());
        self
    }

    /// Capture the snapshot, deriving the species sets.
    ///
    /// Derivations:
    /// - support = team members, minus non-support marks, minus fixed species
    /// - non-support = all known species, minus support, minus fixed species
    /// - spawnable = species present on board or team whose effect is
    ///   auto-generated
    pub fn build(self) -> Result<RequestSnapshot, SnapshotError> {
        let mut board = self.board.ok_or(SnapshotError::MissingBoard)?;
        let stage = self.stage.ok_or(SnapshotError::MissingStage)?;
        let team = self.team.ok_or(SnapshotError::MissingTeam)?;
        let dex = self.dex;

        let mut support: FxHashSet<SpeciesId> = team.members().iter().copied().collect();
        support.retain(|s| !team.is_non_support(*s) && !s.is_fixed());

        let mut non_support: FxHashSet<SpeciesId> = dex.all_species().collect();
        non_support.retain(|s| !support.contains(s) && !s.is_fixed());

        let mut present = board.species_present();
        present.extend(team.members().iter().copied());
        let spawnable: FxHashSet<SpeciesId> = present
            .into_iter()
            .filter(|s| dex.effect_for(*s).auto_generated)
            .collect();

        let mega_threshold = team.mega_threshold();

        // The budget relevant to lookahead is what is left once the move
        // being chosen has resolved.
        let remaining_moves = self.remaining_moves.saturating_sub(1);
        board.set_moves_remaining(remaining_moves);

        Ok(RequestSnapshot {
            board,
            stage,
            team,
            dex,
            support,
            non_support,
            spawnable,
            mega_progress: self.mega_progress,
            mega_allowed: self.mega_allowed,
            mega_threshold,
            remaining_health: self.remaining_health,
            remaining_moves,
            effect_threshold: self.effect_threshold,
            attack_power_up: self.attack_power_up,
            mobile_mode: self.mobile_mode,
            feeder_height: self.feeder_height,
            variation_count: self.variation_count.max(1),
            grading_key: self.grading_key.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Effect;

    fn sample_parts() -> (Board, Stage, Team, SpeciesDex) {
        let board = Board::from_grid([
            [10, 11, 0, 0, 0, 1],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 2, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let stage = Stage::new("test", 5000, 10);
        let team = Team::new(vec![SpeciesId::new(10), SpeciesId::new(11), SpeciesId::new(12)])
            .with_mega(SpeciesId::new(10), 12)
            .with_non_support(SpeciesId::new(12));
        let mut dex = SpeciesDex::new();
        for id in [10, 11, 12, 13] {
            dex.register(SpeciesId::new(id), Effect::team_member(), 5, 1);
        }
        (board, stage, team, dex)
    }

    #[test]
    fn test_missing_parts_fail_eagerly() {
        let (board, stage, team, _) = sample_parts();

        assert_eq!(
            SnapshotBuilder::new().stage(stage.clone()).team(team.clone()).build().unwrap_err(),
            SnapshotError::MissingBoard
        );
        assert_eq!(
            SnapshotBuilder::new().board(board.clone()).team(team).build().unwrap_err(),
            SnapshotError::MissingStage
        );
        assert_eq!(
            SnapshotBuilder::new().board(board).stage(stage).build().unwrap_err(),
            SnapshotError::MissingTeam
        );
    }

    #[test]
    fn test_derived_species_sets() {
        let (board, stage, team, dex) = sample_parts();
        let snapshot = SnapshotBuilder::new()
            .board(board)
            .stage(stage)
            .team(team)
            .dex(dex)
            .build()
            .unwrap();

        // 12 is marked non-support; 10 and 11 remain.
        assert!(snapshot.support.contains(&SpeciesId::new(10)));
        assert!(snapshot.support.contains(&SpeciesId::new(11)));
        assert!(!snapshot.support.contains(&SpeciesId::new(12)));

        // 13 is registered but not on the team.
        assert!(snapshot.non_support.contains(&SpeciesId::new(13)));
        assert!(snapshot.non_support.contains(&SpeciesId::new(12)));
        assert!(!snapshot.non_support.contains(&SpeciesId::new(10)));

        // Fixed species never land in either set.
        assert!(!snapshot.non_support.contains(&SpeciesId::COIN));

        // Spawnable: team members and the on-board coin, but not the wood
        // block (not auto-generated) and not species 13 (absent).
        assert!(snapshot.spawnable.contains(&SpeciesId::new(10)));
        assert!(snapshot.spawnable.contains(&SpeciesId::COIN));
        assert!(!snapshot.spawnable.contains(&SpeciesId::WOOD));
        assert!(!snapshot.spawnable.contains(&SpeciesId::new(13)));
    }

    #[test]
    fn test_remaining_moves_and_counts() {
        let (board, stage, team, dex) = sample_parts();
        let snapshot = SnapshotBuilder::new()
            .board(board)
            .stage(stage)
            .team(team)
            .dex(dex)
            .remaining_moves(10)
            .variation_count(0)
            .build()
            .unwrap();

        assert_eq!(snapshot.remaining_moves, 9);
        assert_eq!(snapshot.board.moves_remaining(), 9);
        assert_eq!(snapshot.variation_count, 1);
        assert_eq!(snapshot.mega_threshold, 12);
    }

    #[test]
    fn test_snapshot_is_a_deep_copy() {
        let (board, stage, team, dex) = sample_parts();
        let mut live_board = board.clone();
        let snapshot = SnapshotBuilder::new()
            .board(live_board.clone())
            .stage(stage)
            .team(team)
            .dex(dex)
            .build()
            .unwrap();

        // Mutating the caller's board after capture must not be visible.
        live_board.set_species_at(1, 1, SpeciesId::new(13));
        assert_eq!(snapshot.board.species_at(1, 1), SpeciesId::new(10));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert_ne!(a, b);
    }
}

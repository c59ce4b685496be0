//! Deterministic cascade resolution and span aggregation.
//!
//! [`CascadeExecutor`] is the reference [`MoveExecutor`]: it applies the
//! swap, clears every completed run, lets the survivors fall, refills from
//! the feeder, and repeats until the board settles, tallying raw totals as
//! it goes. Together with [`SpanAggregator`] it is the default wiring for
//! the simulator and the engine the integration tests drive.
//!
//! The numbers are intentionally simple (flat base damage scaled by level
//! and skill multiplier, flat gold per clear); the orchestration around
//! them, not the scoring curve, is what this crate models.

use rustc_hash::FxHashSet;

use crate::board::{Board, Move, SpeciesId, BOARD_COLS, BOARD_ROWS};
use crate::core::ValueSpan;
use crate::sim::combo::find_runs;
use crate::sim::feeder::FeederVariation;
use crate::sim::result::{NodeSpans, ResultNode};
use crate::sim::snapshot::{RequestId, RequestSnapshot};
use crate::sim::traits::{MoveExecutor, MoveOutcome, OutcomeAggregator, SimError};

/// Damage for clearing one piece, before level and skill scaling.
const BASE_DAMAGE: f64 = 30.0;

/// Gold earned per cleared piece.
const GOLD_PER_CLEAR: f64 = 5.0;

/// First column counted as the right half of the board.
const RIGHT_HALF_START: usize = BOARD_COLS / 2 + 1;

/// Reference match-3 resolution engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct CascadeExecutor;

impl MoveExecutor for CascadeExecutor {
    fn execute(
        &self,
        snapshot: &RequestSnapshot,
        board: &Board,
        mv: Option<Move>,
        feeder: &FeederVariation,
    ) -> Result<MoveOutcome, SimError> {
        let mut b = board.clone();
        let mut feeder = feeder.clone();

        if let Some(m) = mv {
            let (pick_row, pick_col) = m.pick();
            let (drop_row, drop_col) = m.drop();
            if !Board::in_bounds(pick_row, pick_col) || !Board::in_bounds(drop_row, drop_col) {
                return Err(SimError::Execution(format!("move {m} off board")));
            }
            let picked = b.species_at(pick_row, pick_col);
            let dropped_on = b.species_at(drop_row, drop_col);
            b.set_species_at(drop_row, drop_col, picked);
            b.set_species_at(pick_row, pick_col, dropped_on);
        }

        let mut score = 0.0;
        let mut gold = 0.0;
        let mut mega_progress = 0.0;
        let mut blocks_cleared = 0.0;
        let mut disruptions_cleared = 0.0;
        let mut combos_cleared = 0.0;
        let mut right_side_gold = 0.0;

        loop {
            let runs = find_runs(&b, &snapshot.dex);
            if runs.is_empty() {
                break;
            }
            combos_cleared += runs.len() as f64;

            let mut cleared: Vec<(usize, usize)> = runs
                .iter()
                .flat_map(|run| run.iter().copied())
                .collect::<FxHashSet<_>>()
                .into_iter()
                .collect();
            cleared.sort_unstable();

            // Disruptions adjacent to a run clear with it.
            let mut knocked_out: Vec<(usize, usize)> = Vec::new();
            for &(row, col) in &cleared {
                for (nr, nc) in neighbors(row, col) {
                    let neighbor = b.species_at(nr, nc);
                    if snapshot.dex.effect_for(neighbor).disruptive && !knocked_out.contains(&(nr, nc)) {
                        knocked_out.push((nr, nc));
                    }
                }
            }

            for &(row, col) in &cleared {
                let species = b.species_at(row, col);
                let level = f64::from(snapshot.dex.level_for(species));
                let skill = snapshot.dex.skill_for(species);
                let mut damage = BASE_DAMAGE * level * snapshot.dex.effect_for(species).mult(skill);
                if snapshot.attack_power_up {
                    damage *= 2.0;
                }
                score += damage;
                blocks_cleared += 1.0;
                gold += GOLD_PER_CLEAR;
                if col >= RIGHT_HALF_START {
                    right_side_gold += GOLD_PER_CLEAR;
                }
                if snapshot.mega_allowed && snapshot.team.mega_slot() == Some(species) {
                    mega_progress += 1.0;
                }
                if b.is_frozen_at(row, col) {
                    disruptions_cleared += 1.0;
                    b.set_frozen_at(row, col, false);
                }
                b.set_species_at(row, col, SpeciesId::AIR);
            }

            for &(row, col) in &knocked_out {
                disruptions_cleared += 1.0;
                b.set_species_at(row, col, SpeciesId::AIR);
                b.set_frozen_at(row, col, false);
            }

            settle_columns(&mut b, &mut feeder);
        }

        Ok(MoveOutcome {
            board: b,
            score,
            gold,
            mega_progress,
            blocks_cleared,
            disruptions_cleared,
            combos_cleared,
            right_side_gold,
        })
    }
}

fn neighbors(row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
    [
        (row.wrapping_sub(1), col),
        (row + 1, col),
        (row, col.wrapping_sub(1)),
        (row, col + 1),
    ]
    .into_iter()
    .filter(|&(r, c)| Board::in_bounds(r, c))
}

/// Drop surviving pieces to the bottom of each column and refill the gap
/// from the feeder. Frozen cells anchor in place; only unfrozen cells take
/// part in the fall.
fn settle_columns(b: &mut Board, feeder: &mut FeederVariation) {
    for col in 1..=BOARD_COLS {
        let slots: Vec<usize> = (1..=BOARD_ROWS)
            .filter(|&row| !b.is_frozen_at(row, col))
            .collect();
        let movable: Vec<SpeciesId> = slots
            .iter()
            .map(|&row| b.species_at(row, col))
            .filter(|s| !s.is_air())
            .collect();

        let gap = slots.len() - movable.len();

        // Pieces leave the feeder top-first, so the first one taken comes to
        // rest at the bottom of the gap.
        let mut refill: Vec<SpeciesId> = (0..gap)
            .map(|_| feeder.take(col).unwrap_or(SpeciesId::AIR))
            .collect();
        refill.reverse();

        for (i, &row) in slots.iter().enumerate() {
            if i < gap {
                b.set_species_at(row, col, refill[i]);
            } else {
                b.set_species_at(row, col, movable[i - gap]);
            }
        }
    }
}

/// Folds a move's outcomes into one node of value spans.
///
/// Each distribution field summarizes the corresponding raw total across the
/// feeder variations (pooled min/max, sample-weighted mean, so the rule is
/// linear in member count). The node's board is the most frequent resulting
/// board, ties broken by first occurrence.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpanAggregator;

impl OutcomeAggregator for SpanAggregator {
    fn aggregate(
        &self,
        mv: Option<Move>,
        request: RequestId,
        outcomes: &[MoveOutcome],
        started_ms: u64,
    ) -> Result<ResultNode, SimError> {
        if outcomes.is_empty() {
            return Err(SimError::Aggregation("empty outcome set".into()));
        }

        let mut best_idx = 0;
        let mut best_count = 0;
        for (i, outcome) in outcomes.iter().enumerate() {
            let count = outcomes.iter().filter(|o| o.board == outcome.board).count();
            if count > best_count {
                best_count = count;
                best_idx = i;
            }
        }

        let spans = NodeSpans {
            score: ValueSpan::from_values(outcomes.iter().map(|o| o.score)),
            gold: ValueSpan::from_values(outcomes.iter().map(|o| o.gold)),
            mega_progress: ValueSpan::from_values(outcomes.iter().map(|o| o.mega_progress)),
            blocks_cleared: ValueSpan::from_values(outcomes.iter().map(|o| o.blocks_cleared)),
            disruptions_cleared: ValueSpan::from_values(
                outcomes.iter().map(|o| o.disruptions_cleared),
            ),
            combos_cleared: ValueSpan::from_values(outcomes.iter().map(|o| o.combos_cleared)),
            right_side_gold: ValueSpan::from_values(outcomes.iter().map(|o| o.right_side_gold)),
        };

        Ok(ResultNode::new(
            mv,
            outcomes[best_idx].board.clone(),
            spans,
            request,
            started_ms,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Effect, SpeciesDex, Stage, Team};
    use crate::sim::snapshot::SnapshotBuilder;

    fn snapshot_with_board(board: Board) -> RequestSnapshot {
        let mut dex = SpeciesDex::new();
        for id in [7, 8, 9] {
            dex.register(SpeciesId::new(id), Effect::team_member(), 5, 1);
        }
        SnapshotBuilder::new()
            .board(board)
            .stage(Stage::new("test", 5000, 10))
            .team(
                Team::new(vec![SpeciesId::new(7), SpeciesId::new(8), SpeciesId::new(9)])
                    .with_mega(SpeciesId::new(7), 20),
            )
            .dex(dex)
            .mega_allowed(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_swap_clears_completed_run() {
        // Swapping (1,4) onto (1,3) completes 7-7-7 in row 1.
        let board = Board::from_grid([
            [7, 7, 8, 7, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let snap = snapshot_with_board(board.clone());

        let outcome = CascadeExecutor
            .execute(&snap, &board, Some(Move::new(1, 4, 1, 3)), &FeederVariation::empty())
            .unwrap();

        // Three level-5 pieces at base damage.
        assert_eq!(outcome.score, 3.0 * BASE_DAMAGE * 5.0);
        assert_eq!(outcome.blocks_cleared, 3.0);
        assert_eq!(outcome.combos_cleared, 1.0);
        assert_eq!(outcome.gold, 3.0 * GOLD_PER_CLEAR);
        // Mega slot is species 7; all three cleared pieces count.
        assert_eq!(outcome.mega_progress, 3.0);
        // The swapped-in 8 survives at (1,4) and falls to the bottom row.
        assert_eq!(outcome.board.species_at(6, 4), SpeciesId::new(8));
    }

    #[test]
    fn test_input_board_is_not_mutated() {
        let board = Board::from_grid([
            [7, 7, 8, 7, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let snap = snapshot_with_board(board.clone());
        let before = board.clone();

        CascadeExecutor
            .execute(&snap, &board, Some(Move::new(1, 4, 1, 3)), &FeederVariation::empty())
            .unwrap();

        assert_eq!(board, before);
    }

    #[test]
    fn test_settled_board_round_trips() {
        let board = Board::from_grid([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [7, 8, 7, 8, 7, 8],
        ]);
        let snap = snapshot_with_board(board.clone());

        let outcome = CascadeExecutor
            .execute(&snap, &board, None, &FeederVariation::empty())
            .unwrap();

        assert_eq!(outcome.board, board);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.combos_cleared, 0.0);
    }

    #[test]
    fn test_feeder_refills_cleared_cells() {
        let board = Board::from_grid([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [7, 7, 8, 7, 0, 0],
        ]);
        let snap = snapshot_with_board(board.clone());
        let mut feeder = FeederVariation::empty();
        feeder.push(1, SpeciesId::new(9));

        let outcome = CascadeExecutor
            .execute(&snap, &board, Some(Move::new(6, 4, 6, 3)), &FeederVariation::empty())
            .unwrap();
        // Without a feeder the cleared cells stay empty.
        assert_eq!(outcome.board.species_at(6, 1), SpeciesId::AIR);

        let outcome = CascadeExecutor
            .execute(&snap, &board, Some(Move::new(6, 4, 6, 3)), &feeder)
            .unwrap();
        // With one queued piece, column 1 refills at the bottom.
        assert_eq!(outcome.board.species_at(6, 1), SpeciesId::new(9));
    }

    #[test]
    fn test_adjacent_block_clears_as_disruption() {
        let mut board = Board::from_grid([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [2, 0, 0, 0, 0, 0],
            [7, 7, 8, 7, 0, 0],
        ]);
        board.set_frozen_at(5, 1, true);
        let snap = snapshot_with_board(board.clone());

        let outcome = CascadeExecutor
            .execute(&snap, &board, Some(Move::new(6, 4, 6, 3)), &FeederVariation::empty())
            .unwrap();

        // The wood block above the run is knocked out.
        assert_eq!(outcome.disruptions_cleared, 1.0);
        assert_eq!(outcome.board.species_at(5, 1), SpeciesId::AIR);
    }

    #[test]
    fn test_right_side_gold_counts_right_half_only() {
        // A run entirely in columns 4..6.
        let board = Board::from_grid([
            [0, 0, 0, 7, 7, 8],
            [0, 0, 0, 0, 0, 7],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let snap = snapshot_with_board(board.clone());

        let outcome = CascadeExecutor
            .execute(&snap, &board, Some(Move::new(1, 6, 2, 6)), &FeederVariation::empty())
            .unwrap();

        assert_eq!(outcome.right_side_gold, outcome.gold);

        // And one entirely in columns 1..3.
        let board = Board::from_grid([
            [7, 7, 8, 0, 0, 0],
            [0, 0, 7, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let snap = snapshot_with_board(board.clone());
        let outcome = CascadeExecutor
            .execute(&snap, &board, Some(Move::new(1, 3, 2, 3)), &FeederVariation::empty())
            .unwrap();

        assert_eq!(outcome.right_side_gold, 0.0);
        assert!(outcome.gold > 0.0);
    }

    #[test]
    fn test_aggregator_rejects_empty() {
        let result = SpanAggregator.aggregate(None, RequestId(1), &[], 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_aggregator_spans_and_board() {
        let board_a = Board::empty();
        let mut board_b = Board::empty();
        board_b.set_species_at(1, 1, SpeciesId::new(7));

        let outcome = |board: &Board, score: f64| MoveOutcome {
            board: board.clone(),
            score,
            gold: score / 10.0,
            mega_progress: 0.0,
            blocks_cleared: 3.0,
            disruptions_cleared: 0.0,
            combos_cleared: 1.0,
            right_side_gold: score / 20.0,
        };

        let outcomes = vec![
            outcome(&board_a, 100.0),
            outcome(&board_b, 200.0),
            outcome(&board_a, 300.0),
        ];

        let node = SpanAggregator
            .aggregate(Some(Move::new(1, 1, 1, 2)), RequestId(9), &outcomes, 777)
            .unwrap();

        // board_a appears twice and wins.
        assert_eq!(node.board(), &board_a);
        assert_eq!(node.score().min(), 100.0);
        assert_eq!(node.score().max(), 300.0);
        assert_eq!(node.score().mean(), 200.0);
        assert_eq!(node.score().samples(), 3);
        assert_eq!(node.request(), RequestId(9));
        assert_eq!(node.started_ms(), 777);
        // The heuristic starts as the raw right-side-gold span.
        assert_eq!(node.heuristic().mean(), 10.0);
    }

    #[test]
    fn test_aggregator_single_outcome_heuristic_is_raw() {
        let outcomes = vec![MoveOutcome {
            board: Board::empty(),
            score: 50.0,
            gold: 20.0,
            mega_progress: 0.0,
            blocks_cleared: 3.0,
            disruptions_cleared: 0.0,
            combos_cleared: 1.0,
            right_side_gold: 15.0,
        }];

        let node = SpanAggregator.aggregate(None, RequestId(2), &outcomes, 0).unwrap();
        assert_eq!(node.heuristic(), ValueSpan::from_value(15.0));
    }
}

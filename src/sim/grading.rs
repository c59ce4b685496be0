//! Grading modes: the ranking order over candidate moves.
//!
//! A grading mode is a total order over result nodes plus a flag for
//! whether the computation should spend one extra lookahead ply. The order
//! puts the best move first; the orchestrator's stable sort breaks ties by
//! insertion order.

use std::cmp::Ordering;

use super::result::ResultNode;

/// A ranking policy over result nodes.
pub trait GradingMode: Send + Sync {
    /// Stable identifier used to select the mode from a snapshot.
    fn key(&self) -> &'static str;

    /// Compare two nodes; `Less` means `a` ranks ahead of `b`.
    fn cmp(&self, a: &ResultNode, b: &ResultNode) -> Ordering;

    /// Whether one extra lookahead ply should be computed.
    fn wants_lookahead(&self) -> bool {
        false
    }
}

/// Rank by expected score, then combos, then blocks cleared.
#[derive(Clone, Copy, Debug, Default)]
pub struct TotalScore;

impl GradingMode for TotalScore {
    fn key(&self) -> &'static str {
        "score"
    }

    fn cmp(&self, a: &ResultNode, b: &ResultNode) -> Ordering {
        b.score()
            .cmp(&a.score())
            .then_with(|| b.combos_cleared().cmp(&a.combos_cleared()))
            .then_with(|| b.blocks_cleared().cmp(&a.blocks_cleared()))
    }
}

/// Rank by expected gold, then score.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoldFirst;

impl GradingMode for GoldFirst {
    fn key(&self) -> &'static str {
        "gold"
    }

    fn cmp(&self, a: &ResultNode, b: &ResultNode) -> Ordering {
        b.gold()
            .cmp(&a.gold())
            .then_with(|| b.score().cmp(&a.score()))
    }
}

/// Rank by disruptions removed, then score.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisruptionsFirst;

impl GradingMode for DisruptionsFirst {
    fn key(&self) -> &'static str {
        "disruptions"
    }

    fn cmp(&self, a: &ResultNode, b: &ResultNode) -> Ordering {
        b.disruptions_cleared()
            .cmp(&a.disruptions_cleared())
            .then_with(|| b.score().cmp(&a.score()))
    }
}

/// Early-game mode: spend an extra ply and rank by the smoothed heuristic.
///
/// After back-propagation the heuristic folds in a damped fraction of each
/// move's best continuation, so this order favors moves that set up a strong
/// follow-up.
#[derive(Clone, Copy, Debug, Default)]
pub struct EarlyGame;

impl GradingMode for EarlyGame {
    fn key(&self) -> &'static str {
        "early-game"
    }

    fn cmp(&self, a: &ResultNode, b: &ResultNode) -> Ordering {
        b.heuristic()
            .cmp(&a.heuristic())
            .then_with(|| b.gold().cmp(&a.gold()))
            .then_with(|| b.score().cmp(&a.score()))
    }

    fn wants_lookahead(&self) -> bool {
        true
    }
}

/// Resolve a grading mode from its key; unknown keys fall back to
/// [`TotalScore`].
#[must_use]
pub fn by_key(key: &str) -> Box<dyn GradingMode> {
    match key {
        "gold" => Box::new(GoldFirst),
        "disruptions" => Box::new(DisruptionsFirst),
        "early-game" => Box::new(EarlyGame),
        _ => Box::new(TotalScore),
    }
}

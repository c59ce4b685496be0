//! The simulation orchestrator.
//!
//! A [`Simulator`] owns one request's immutable snapshot and its
//! collaborators. One computation:
//!
//! 1. settle check — if the board is mid-cascade, the only result is the
//!    synthetic "let it settle" node;
//! 2. enumerate legal moves and generate the feeder variations once;
//! 3. fan out one unit of work per (move, feeder variation) on the rayon
//!    pool, every unit on its own deep-copied board;
//! 4. per move, once its whole feeder set completes, aggregate the outcomes
//!    into one detached result node — different moves' pipelines run fully
//!    in parallel;
//! 5. join everything, optionally expand one extra ply, back-propagate the
//!    heuristic, rank the top-level nodes, and publish — unless a newer
//!    request has superseded this one, in which case the results are
//!    discarded at this single publish point. Already-dispatched work is
//!    never aborted mid-flight; it just runs to completion and is dropped.
//!
//! The snapshot is the only state shared across workers and it is immutable
//! for the lifetime of the computation, so the fan-out needs no locking.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::board::{Board, Move};
use crate::games::cascade::{CascadeExecutor, SpanAggregator};

use super::feeder::{FeederVariation, RandomFeederGenerator};
use super::grading::{self, GradingMode};
use super::moves::legal_moves;
use super::result::{Detached, ResultNode, ResultTree};
use super::snapshot::{RequestId, RequestSnapshot};
use super::traits::{
    FeederGenerator, MoveExecutor, MoveOutcome, OutcomeAggregator, ResultAcceptor, SimError,
};

/// How a computation ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeOutcome {
    /// Results were ranked and delivered to the acceptor; carries the number
    /// of top-level results.
    Published(usize),
    /// A newer request superseded this one; results were discarded unseen.
    Stale,
}

/// Statistics from the last computation, for diagnostics and tuning.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ComputeStats {
    /// Top-level results produced.
    pub roots: usize,

    /// Total result nodes across all plies.
    pub nodes: usize,

    /// Wall time of the computation (microseconds).
    pub time_us: u64,
}

/// Orchestrates one computation request.
pub struct Simulator {
    snapshot: RequestSnapshot,
    request: RequestId,
    feeders: Box<dyn FeederGenerator>,
    executor: Box<dyn MoveExecutor>,
    aggregator: Box<dyn OutcomeAggregator>,
    grading: Box<dyn GradingMode>,
    started_ms: u64,
    stats: ComputeStats,
}

impl Simulator {
    /// Create a simulator for a snapshot and request id with the default
    /// collaborators: a seeded random feeder generator, the cascade
    /// executor, the span aggregator, and the snapshot's grading mode.
    #[must_use]
    pub fn new(snapshot: RequestSnapshot, request: RequestId) -> Self {
        let grading = grading::by_key(&snapshot.grading_key);
        Self {
            feeders: Box::new(RandomFeederGenerator::new(request.0)),
            executor: Box::new(CascadeExecutor),
            aggregator: Box::new(SpanAggregator),
            grading,
            snapshot,
            request,
            started_ms: 0,
            stats: ComputeStats::default(),
        }
    }

    /// Replace the feeder generator.
    #[must_use]
    pub fn with_feeders<F: FeederGenerator + 'static>(mut self, feeders: F) -> Self {
        self.feeders = Box::new(feeders);
        self
    }

    /// Replace the move executor.
    #[must_use]
    pub fn with_executor<E: MoveExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Replace the outcome aggregator.
    #[must_use]
    pub fn with_aggregator<A: OutcomeAggregator + 'static>(mut self, aggregator: A) -> Self {
        self.aggregator = Box::new(aggregator);
        self
    }

    /// Replace the grading mode.
    #[must_use]
    pub fn with_grading<G: GradingMode + 'static>(mut self, grading: G) -> Self {
        self.grading = Box::new(grading);
        self
    }

    /// This computation's request id.
    #[must_use]
    pub fn request(&self) -> RequestId {
        self.request
    }

    /// The immutable snapshot this computation runs against.
    #[must_use]
    pub fn snapshot(&self) -> &RequestSnapshot {
        &self.snapshot
    }

    /// Statistics from the last computation.
    #[must_use]
    pub fn stats(&self) -> &ComputeStats {
        &self.stats
    }

    /// Whether this request is still the acceptor's most recent one.
    #[must_use]
    pub fn is_current(&self, acceptor: &dyn ResultAcceptor) -> bool {
        acceptor.current_request() == self.request
    }

    /// Run the computation, logging instead of returning failures.
    ///
    /// Fire-and-forget entry point for callers that re-trigger on fresh
    /// requests rather than handling errors; a failed computation publishes
    /// nothing.
    pub fn run(&mut self, acceptor: &dyn ResultAcceptor) {
        match self.compute(acceptor) {
            Ok(ComputeOutcome::Published(count)) => {
                debug!("{}: published {count} ranked results", self.request);
            }
            Ok(ComputeOutcome::Stale) => {}
            Err(e) => warn!("{}: computation failed: {e}", self.request),
        }
    }

    /// Run the computation and deliver ranked results through the acceptor.
    ///
    /// On error nothing is published — results are never partial. Staleness
    /// is not an error: a superseded request reports
    /// [`ComputeOutcome::Stale`].
    pub fn compute(&mut self, acceptor: &dyn ResultAcceptor) -> Result<ComputeOutcome, SimError> {
        let clock = Instant::now();
        self.started_ms = now_millis();

        let depth = u32::from(self.grading.wants_lookahead());
        let board = self.snapshot.board.clone();
        let subtrees = self.compute_n(&board, depth)?;

        let mut tree = ResultTree::new(self.request);
        for subtree in subtrees {
            tree.adopt_root(subtree);
        }
        if depth > 0 {
            tree.propagate_heuristics();
        }

        let grading = &self.grading;
        tree.sort_roots_by(|a, b| grading.cmp(a, b));

        self.stats = ComputeStats {
            roots: tree.roots().len(),
            nodes: tree.len(),
            time_us: clock.elapsed().as_micros() as u64,
        };

        if self.is_current(acceptor) {
            let count = tree.roots().len();
            acceptor.accept_results(tree);
            Ok(ComputeOutcome::Published(count))
        } else {
            info!(
                "{}: superseded by {}, discarding {} results",
                self.request,
                acceptor.current_request(),
                tree.roots().len()
            );
            Ok(ComputeOutcome::Stale)
        }
    }

    /// Aggregate `board` and expand `n` further plies below each result.
    ///
    /// Children stay in move-enumeration order; only the top level is ever
    /// ranked by the grading mode.
    fn compute_n(&self, board: &Board, n: u32) -> Result<Vec<Detached>, SimError> {
        let nodes = self.aggregate_board(board)?;
        if n == 0 {
            return Ok(nodes.into_iter().map(Detached::leaf).collect());
        }

        nodes
            .into_par_iter()
            .map(|mut node| {
                node.decrement_board_moves();
                let children = self.compute_n(node.board(), n - 1)?;
                Ok(Detached { node, children })
            })
            .collect()
    }

    /// The per-board fan-out/fan-in: one aggregated node per legal move.
    fn aggregate_board(&self, board: &Board) -> Result<Vec<ResultNode>, SimError> {
        // A board mid-cascade has no move to offer; the settle outcome is
        // the only thing worth reporting. A board that settles to itself is
        // already stable and falls through to move enumeration.
        let settle_feeders = self.feeders.generate(&self.snapshot, 0);
        if settle_feeders.is_empty() {
            return Err(SimError::NoFeeders);
        }
        let settle = self.aggregate_move(board, None, &settle_feeders)?;
        if settle.board() != board {
            debug!("{}: board not settled, reporting settle-only result", self.request);
            return Ok(vec![settle]);
        }

        let moves = legal_moves(board, &self.snapshot.dex);
        let feeders = self.feeders.generate(&self.snapshot, self.snapshot.feeder_height);
        if feeders.is_empty() {
            return Err(SimError::NoFeeders);
        }
        debug!(
            "{}: {} legal moves x {} feeder variations",
            self.request,
            moves.len(),
            feeders.len()
        );

        moves
            .par_iter()
            .map(|&mv| self.aggregate_move(board, Some(mv), &feeders))
            .collect()
    }

    /// Resolve one move across every feeder variation and fold the outcomes
    /// into a single detached node.
    fn aggregate_move(
        &self,
        board: &Board,
        mv: Option<Move>,
        feeders: &[FeederVariation],
    ) -> Result<ResultNode, SimError> {
        let outcomes: Vec<MoveOutcome> = feeders
            .par_iter()
            .map(|feeder| {
                let own = board.clone();
                self.executor.execute(&self.snapshot, &own, mv, feeder)
            })
            .collect::<Result<_, _>>()?;

        // The whole feeder set for this move has joined by the time the
        // aggregation runs.
        self.aggregator.aggregate(mv, self.request, &outcomes, self.started_ms)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

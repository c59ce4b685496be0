//! Capability interfaces at the simulation boundary.
//!
//! The orchestrator consumes its collaborators through small traits so the
//! core can run against deterministic fakes in tests and against the real
//! cascade engine in production:
//!
//! - [`FeederGenerator`]: produces the randomized future-spawn variations
//! - [`MoveExecutor`]: resolves one move against one feeder variation
//! - [`OutcomeAggregator`]: folds a move's outcome set into one result node
//! - [`ResultAcceptor`]: receives published rankings and owns the staleness
//!   protocol's notion of "the current request"
//!
//! All collaborators are `Send + Sync`; the fan-out shares them read-only
//! across worker threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

use crate::board::{Board, Move};

use super::feeder::FeederVariation;
use super::result::{ResultNode, ResultTree};
use super::snapshot::{RequestId, RequestSnapshot};

/// Computation faults surfaced during enumeration, fan-out, or aggregation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("no feeder variations generated")]
    NoFeeders,
    #[error("move execution failed: {0}")]
    Execution(String),
    #[error("outcome aggregation failed: {0}")]
    Aggregation(String),
}

/// The raw result of resolving one move against one feeder variation.
#[derive(Clone, Debug)]
pub struct MoveOutcome {
    /// The board after the cascade settled.
    pub board: Board,
    /// Score dealt to the stage.
    pub score: f64,
    /// Gold earned.
    pub gold: f64,
    /// Mega-evolution progress gained.
    pub mega_progress: f64,
    /// Pieces cleared.
    pub blocks_cleared: f64,
    /// Disruptions removed.
    pub disruptions_cleared: f64,
    /// Combos triggered.
    pub combos_cleared: f64,
    /// Gold earned from clears on the right half of the board.
    pub right_side_gold: f64,
}

/// Produces candidate future-spawn patterns.
///
/// May be randomized, but must be pure with respect to its inputs and its
/// own configuration (a seeded generator returns the same variations for
/// the same snapshot).
pub trait FeederGenerator: Send + Sync {
    /// Generate the feeder variations for one per-board aggregation.
    ///
    /// `min_height` is how many future rows to fill per column; the settle
    /// check passes 0.
    fn generate(&self, snapshot: &RequestSnapshot, min_height: u8) -> Vec<FeederVariation>;
}

/// Resolves one move (or the settle case) against one feeder variation.
pub trait MoveExecutor: Send + Sync {
    /// Execute the move on a private copy of `board`.
    ///
    /// Implementations must not mutate the input board; the resulting board
    /// is returned inside the outcome.
    fn execute(
        &self,
        snapshot: &RequestSnapshot,
        board: &Board,
        mv: Option<Move>,
        feeder: &FeederVariation,
    ) -> Result<MoveOutcome, SimError>;
}

/// Folds a move's complete outcome set into exactly one result node.
pub trait OutcomeAggregator: Send + Sync {
    /// Aggregate `outcomes` (one per feeder variation) for `mv`.
    fn aggregate(
        &self,
        mv: Option<Move>,
        request: RequestId,
        outcomes: &[MoveOutcome],
        started_ms: u64,
    ) -> Result<ResultNode, SimError>;
}

/// Receives published rankings and arbitrates staleness.
pub trait ResultAcceptor: Send + Sync {
    /// Accept a finished, ranked result tree. Sink; no return.
    fn accept_results(&self, results: ResultTree);

    /// The id of the most recently issued request.
    ///
    /// An orchestrator whose own id differs discards its results instead of
    /// publishing.
    fn current_request(&self) -> RequestId;
}

/// In-memory acceptor holding the latest accepted tree.
///
/// The reference implementation used by tests and simple frontends: the
/// caller bumps `set_current` when issuing a new request, and stale
/// computations fail the id comparison and never overwrite newer results.
#[derive(Debug)]
pub struct MemoryAcceptor {
    current: AtomicU64,
    accepted: Mutex<Option<ResultTree>>,
    accept_count: AtomicU64,
}

impl MemoryAcceptor {
    /// Create an acceptor with the given current request.
    #[must_use]
    pub fn new(current: RequestId) -> Self {
        Self {
            current: AtomicU64::new(current.0),
            accepted: Mutex::new(None),
            accept_count: AtomicU64::new(0),
        }
    }

    /// Mark a newer request as current, superseding in-flight computations.
    pub fn set_current(&self, request: RequestId) {
        self.current.store(request.0, Ordering::SeqCst);
    }

    /// Take the most recently accepted tree, if any.
    #[must_use]
    pub fn take_results(&self) -> Option<ResultTree> {
        self.accepted.lock().expect("acceptor lock poisoned").take()
    }

    /// How many times results were accepted.
    #[must_use]
    pub fn accept_count(&self) -> u64 {
        self.accept_count.load(Ordering::SeqCst)
    }
}

impl ResultAcceptor for MemoryAcceptor {
    fn accept_results(&self, results: ResultTree) {
        self.accept_count.fetch_add(1, Ordering::SeqCst);
        *self.accepted.lock().expect("acceptor lock poisoned") = Some(results);
    }

    fn current_request(&self) -> RequestId {
        RequestId(self.current.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_acceptor_current_request() {
        let acceptor = MemoryAcceptor::new(RequestId(5));
        assert_eq!(acceptor.current_request(), RequestId(5));

        acceptor.set_current(RequestId(6));
        assert_eq!(acceptor.current_request(), RequestId(6));
    }

    #[test]
    fn test_memory_acceptor_stores_latest() {
        let acceptor = MemoryAcceptor::new(RequestId(1));
        assert!(acceptor.take_results().is_none());

        acceptor.accept_results(ResultTree::new(RequestId(1)));
        assert_eq!(acceptor.accept_count(), 1);

        let tree = acceptor.take_results().unwrap();
        assert_eq!(tree.request(), RequestId(1));
        // take empties the slot
        assert!(acceptor.take_results().is_none());
    }
}

//! The simulation core: enumeration, fan-out, aggregation, ranking.
//!
//! - `combo`: the 3-in-a-row pre-check and full-board run scan
//! - `moves`: legal move enumeration
//! - `snapshot`: the immutable per-request state bundle
//! - `feeder`: randomized future-spawn variations
//! - `result`: the arena-owned result tree
//! - `traits`: capability interfaces for the pluggable collaborators
//! - `grading`: ranking orders over result nodes
//! - `simulator`: the orchestrator tying it all together

pub mod combo;
pub mod feeder;
pub mod grading;
pub mod moves;
pub mod result;
pub mod simulator;
pub mod snapshot;
pub mod traits;

pub use combo::{find_runs, forms_combo};
pub use feeder::{FeederVariation, RandomFeederGenerator};
pub use grading::{by_key, DisruptionsFirst, EarlyGame, GoldFirst, GradingMode, TotalScore};
pub use moves::{is_allowed, legal_moves};
pub use result::{Detached, NodeId, NodeSpans, ResultNode, ResultTree};
pub use simulator::{ComputeOutcome, ComputeStats, Simulator};
pub use snapshot::{RequestId, RequestSnapshot, SnapshotBuilder, SnapshotError};
pub use traits::{
    FeederGenerator, MemoryAcceptor, MoveExecutor, MoveOutcome, OutcomeAggregator, ResultAcceptor,
    SimError,
};

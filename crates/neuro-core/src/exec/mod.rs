pub mod context;
pub mod executor;
pub mod predicate;

pub use context::RunContext;
pub use executor::{Executor, RunResult};
pub use predicate::{BranchDecision, BranchPredicate, SegmentationGate};

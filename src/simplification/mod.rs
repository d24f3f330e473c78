//! Program optimizer - constant folding and identity elimination to a fixpoint
//!
//! Rewriting works on the flat instruction sequence, not on the tree: a
//! single left-to-right scan simulates the stack with symbolic [`slot`]s and
//! offers every operator to the active [`rules`].
pub(crate) mod engine;
pub(crate) mod rules;
mod slot;

pub use engine::{
    OPTIMIZER_MAX_PASSES, OptimizationOutcome, OptimizationReport, Optimizer, OptimizerState,
    optimize, optimize_with_report,
};

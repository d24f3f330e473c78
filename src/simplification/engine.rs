//! Fixpoint optimization engine
//!
//! Each iteration runs one constant-folding pass followed by one
//! identity-elimination pass over the current program. The engine stops as
//! soon as an iteration leaves the program unchanged, or after a fixed
//! number of iterations as a guard against non-termination.
//!
//! ```text
//!              ┌──────── changed ───────┐
//!              ▼                        │
//!        ┌─────────────┐   fold +   ┌───┴───────┐
//!  ───►  │ Unconverged │ ─────────► │ candidate │
//!        └─────────────┘  simplify  └───┬───────┘
//!              │                        │ unchanged
//!              │ cap reached            ▼
//!              ▼                  ┌───────────┐
//!     ┌──────────────────┐        │ Converged │
//!     │ MaxPassesReached │        └───────────┘
//!     └──────────────────┘
//! ```

use tracing::{debug, warn};

use super::rules::{fold_constants, simplify_identities};
use crate::evaluator::Instruction;

/// Default iteration cap.
pub const OPTIMIZER_MAX_PASSES: usize = 10;

/// Engine state. `Converged` and `MaxPassesReached` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerState {
    Unconverged,
    Converged,
    MaxPassesReached,
}

/// How an optimization run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationOutcome {
    /// An iteration produced no change. `passes` counts that final iteration.
    Converged { passes: usize },
    /// The iteration cap stopped the engine before a fixpoint was confirmed.
    MaxPassesReached { passes: usize },
}

impl OptimizationOutcome {
    /// Number of iterations run.
    pub const fn passes(self) -> usize {
        match self {
            OptimizationOutcome::Converged { passes }
            | OptimizationOutcome::MaxPassesReached { passes } => passes,
        }
    }

    /// True if a fixpoint was reached.
    pub const fn converged(self) -> bool {
        matches!(self, OptimizationOutcome::Converged { .. })
    }
}

/// Optimized program plus how the run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationReport {
    pub program: Vec<Instruction>,
    pub outcome: OptimizationOutcome,
}

/// Multi-pass program optimizer
#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    max_passes: usize,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    pub const fn new() -> Self {
        Self {
            max_passes: OPTIMIZER_MAX_PASSES,
        }
    }

    /// Override the iteration cap. A cap of zero returns the input unchanged.
    pub const fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub const fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// One iteration: fold, then simplify. A pass that cannot make sense of
    /// the program (stack underflow) leaves it unchanged.
    fn iterate(program: &[Instruction]) -> Vec<Instruction> {
        let folded = fold_constants(program).unwrap_or_else(|| program.to_vec());
        simplify_identities(&folded).unwrap_or(folded)
    }

    /// Optimize `program` to a fixpoint. Never fails.
    pub fn run(&self, program: &[Instruction]) -> OptimizationReport {
        let mut state = OptimizerState::Unconverged;
        let mut current = program.to_vec();
        let mut passes = 0;

        while state == OptimizerState::Unconverged {
            if passes >= self.max_passes {
                state = OptimizerState::MaxPassesReached;
                break;
            }
            passes += 1;

            let candidate = Self::iterate(&current);
            debug!(
                pass = passes,
                before = current.len(),
                after = candidate.len(),
                "optimizer iteration"
            );

            if candidate == current {
                state = OptimizerState::Converged;
            } else {
                current = candidate;
            }
        }

        let outcome = match state {
            OptimizerState::Converged => {
                debug!(
                    passes,
                    input_len = program.len(),
                    output_len = current.len(),
                    "optimizer converged"
                );
                OptimizationOutcome::Converged { passes }
            }
            _ => {
                warn!(
                    passes,
                    output_len = current.len(),
                    "optimizer stopped at pass cap before reaching a fixpoint"
                );
                OptimizationOutcome::MaxPassesReached { passes }
            }
        };

        OptimizationReport {
            program: current,
            outcome,
        }
    }
}

/// Optimize a program with the default iteration cap.
///
/// # Example
///
/// ```
/// use mcexpr::{Expression, Instruction, compile, optimize};
///
/// let program = compile(&(Expression::constant(5.0) + Expression::constant(3.0)));
/// assert_eq!(optimize(&program), vec![Instruction::Constant(8.0)]);
/// ```
pub fn optimize(program: &[Instruction]) -> Vec<Instruction> {
    Optimizer::new().run(program).program
}

/// Optimize a program and report how the engine stopped.
pub fn optimize_with_report(program: &[Instruction]) -> OptimizationReport {
    Optimizer::new().run(program)
}

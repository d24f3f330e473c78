//! Compiled expression evaluator.
//!
//! This module converts expression trees into flat bytecode that a stack
//! machine evaluates without tree traversal. The compiled form is immutable
//! and `Send + Sync`, so one [`CompiledExpression`] is shared read-only by
//! every evaluation of a Monte Carlo run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌────────────┐    ┌───────────┐    ┌─────────────────────┐
//! │ Expression  │ -> │  Compiler  │ -> │ Optimizer │ -> │ CompiledExpression  │
//! │ (AST Tree)  │    │ (Bytecode) │    │ (fixpoint)│    │   (Stack Machine)   │
//! └─────────────┘    └────────────┘    └───────────┘    └─────────────────────┘
//!                                                                │
//!                                  ┌─────────────────────────────┼───────────────┐
//!                                  ▼                             ▼               ▼
//!                            ┌──────────┐                ┌──────────────┐  ┌──────────┐
//!                            │ evaluate │                │evaluate_batch│  │ GPU recs │
//!                            │ (scalar) │                │  (per row)   │  │ (encode) │
//!                            └──────────┘                └──────────────┘  └──────────┘
//! ```
//!
//! # Modules
//!
//! - [`instruction`]: Bytecode instruction definitions and static introspection
//! - [`compiler`]: Expression-to-bytecode compilation
//! - [`execution`]: Scalar stack machine

mod compiler;
pub(crate) mod execution;
pub(crate) mod instruction;

pub use compiler::{Compiler, compile};
pub use execution::evaluate;
pub use instruction::{Instruction, instruction_count, max_input_index, max_stack_depth};

use std::sync::Arc;

use crate::builder::Pipeline;
use crate::error::{EvaluationError, PipelineError};
use crate::gpu::GpuProgram;
use crate::simplification::OptimizationOutcome;

/// Statically check that `program` reduces to exactly one value.
///
/// Returns the maximum stack depth on success.
///
/// # Errors
///
/// - [`PipelineError::EmptyProgram`] for an empty program
/// - [`PipelineError::MalformedProgram`] if an instruction lacks operands or
///   the final stack does not hold exactly one value
pub fn validate_program(program: &[Instruction]) -> Result<usize, PipelineError> {
    if program.is_empty() {
        return Err(PipelineError::EmptyProgram);
    }

    let mut depth = 0_usize;
    let mut max_depth = 0_usize;
    for (pc, instr) in program.iter().enumerate() {
        let arity = instr.arity();
        if depth < arity {
            return Err(PipelineError::MalformedProgram {
                reason: format!(
                    "{} at {pc} needs {arity} operand(s), stack holds {depth}",
                    instr.mnemonic()
                ),
            });
        }
        depth = depth - arity + 1;
        max_depth = max_depth.max(depth);
    }

    if depth != 1 {
        return Err(PipelineError::MalformedProgram {
            reason: format!("program leaves {depth} values on the stack"),
        });
    }
    Ok(max_depth)
}

/// Compiled, optimized and encoded expression.
///
/// This is the cached state a simulation model keeps after construction.
/// Cloning is cheap: the program and the GPU records are reference counted.
///
/// # Example
///
/// ```
/// use mcexpr::{CompiledExpression, Expression};
///
/// let x = Expression::input(0);
/// let payoff = (x - 100.0).max(0.0);
/// let compiled = CompiledExpression::new(&payoff).expect("valid program");
///
/// assert_eq!(compiled.evaluate(&[130.0]), Ok(30.0));
/// assert_eq!(compiled.required_inputs(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    instructions: Arc<[Instruction]>,
    gpu: Arc<GpuProgram>,
    raw_instruction_count: usize,
    max_stack_depth: usize,
    max_input_index: Option<usize>,
    outcome: Option<OptimizationOutcome>,
}

impl CompiledExpression {
    /// Compile, optimize and encode `expr` with the default [`Pipeline`].
    ///
    /// # Errors
    ///
    /// See [`Pipeline::build`].
    pub fn new(expr: &crate::Expression) -> Result<Self, PipelineError> {
        Pipeline::new().build(expr)
    }

    /// Assemble from pipeline output, failing closed on an unusable program.
    pub(crate) fn from_parts(
        raw_instruction_count: usize,
        program: Vec<Instruction>,
        max_input_index: Option<usize>,
        outcome: Option<OptimizationOutcome>,
    ) -> Result<Self, PipelineError> {
        let max_stack_depth = validate_program(&program)?;
        let gpu = GpuProgram::encode(&program)?;
        Ok(Self {
            instructions: program.into(),
            gpu: Arc::new(gpu),
            raw_instruction_count,
            max_stack_depth,
            max_input_index,
            outcome,
        })
    }

    /// Evaluate against one input vector.
    ///
    /// # Errors
    ///
    /// See [`evaluate`].
    pub fn evaluate(&self, inputs: &[f64]) -> Result<f64, EvaluationError> {
        execution::execute(&self.instructions, inputs, self.max_stack_depth)
    }

    /// Evaluate every row independently. One result per row, in order.
    pub fn evaluate_batch<R: AsRef<[f64]>>(&self, rows: &[R]) -> Vec<Result<f64, EvaluationError>> {
        rows.iter().map(|row| self.evaluate(row.as_ref())).collect()
    }

    /// Optimized program.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Device records for the optimized program.
    pub fn gpu(&self) -> &GpuProgram {
        &self.gpu
    }

    /// Length of the optimized program.
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Length of the program before optimization.
    pub const fn raw_instruction_count(&self) -> usize {
        self.raw_instruction_count
    }

    pub const fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// Highest input slot the source expression references.
    ///
    /// Taken from the tree, not the optimized program: `x * 0` still
    /// reports slot `x` so input-width validation does not depend on
    /// optimization.
    pub const fn max_input_index(&self) -> Option<usize> {
        self.max_input_index
    }

    /// Minimum input vector length callers must supply.
    pub fn required_inputs(&self) -> usize {
        self.max_input_index.map_or(0, |i| i + 1)
    }

    /// How the optimizer stopped; `None` if optimization was disabled.
    pub const fn outcome(&self) -> Option<OptimizationOutcome> {
        self.outcome
    }
}

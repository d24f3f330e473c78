//! Expression compiler for Monte Carlo simulation models
//!
//! Builds small arithmetic expressions over simulation inputs, lowers them to
//! a flat stack program, optimizes the program to a fixpoint and evaluates it
//! on a CPU stack machine or encodes it as fixed-width records for a GPU
//! kernel.
//!
//! # Features
//! - **Operator-overloaded DSL** with array/matrix helpers and inlined
//!   reusable functions
//! - **Post-order compiler** to a stack program, one instruction per node
//! - **Fixpoint optimizer**: constant folding plus identity elimination
//! - **Stack interpreter** with typed errors, never a panic
//! - **GPU record encoder** with a reference replay that shares the
//!   interpreter's arithmetic
//! - **Parallel batch evaluation** with Rayon (feature `parallel`)
//!
//! # Usage Examples
//!
//! ## Free functions
//! ```
//! use mcexpr::{Expression, Instruction, compile, evaluate, optimize, to_gpu_records};
//!
//! let x = Expression::input(0);
//! let program = compile(&((x + 0.0) * 1.0));
//! let optimized = optimize(&program);
//! assert_eq!(optimized, vec![Instruction::Input(0)]);
//! assert_eq!(evaluate(&optimized, &[2.5]), Ok(2.5));
//!
//! let records = to_gpu_records(&optimized)?;
//! assert_eq!((records[0].opcode, records[0].arg1), (4, 0));
//! # Ok::<(), mcexpr::PipelineError>(())
//! ```
//!
//! ## Cached model state
//! ```
//! use mcexpr::{Expression, Pipeline};
//!
//! // Net revenue: units * price * (1 - churn), floored at zero
//! let units = Expression::input(0);
//! let price = Expression::input(1);
//! let churn = Expression::input(2);
//! let revenue = (units * price * (1.0 - churn)).max(0.0);
//!
//! let compiled = Pipeline::new().validate_gpu(true).build(&revenue)?;
//! assert_eq!(compiled.evaluate(&[100.0, 20.0, 0.25]), Ok(1500.0));
//! assert_eq!(compiled.gpu().replay(&[100.0, 20.0, 0.25]), Ok(1500.0));
//! # Ok::<(), mcexpr::PipelineError>(())
//! ```

mod ast;
mod builder;
mod display;
pub mod dsl;
mod error;
pub mod evaluator;
pub mod gpu;
pub(crate) mod math;
mod simplification;
pub mod visitor;

#[cfg(feature = "parallel")]
pub mod parallel;


// Re-export key types for easier usage
pub use ast::{BinaryOp, Expression, UnaryOp};
pub use builder::Pipeline;
pub use dsl::{ExprArray, ExprFunction, ExprMatrix, FunctionRegistry};
pub use error::{BuildError, Error, EvaluationError, PipelineError, Result};
pub use evaluator::{
    CompiledExpression, Instruction, compile, evaluate, instruction_count, max_input_index,
    max_stack_depth, validate_program,
};
pub use gpu::{
    GpuLimits, GpuProgram, GpuRecord, Opcode, is_f32_exact, replay_records, to_gpu_records,
};
pub use math::EQUALITY_EPSILON;
pub use simplification::{
    OPTIMIZER_MAX_PASSES, OptimizationOutcome, OptimizationReport, Optimizer, OptimizerState,
    optimize, optimize_with_report,
};

/// Build `expr` with the default [`Pipeline`] and evaluate it once.
///
/// Convenient for one-off checks; simulation code should keep the
/// [`CompiledExpression`] and evaluate it per iteration instead.
///
/// # Errors
///
/// [`Error::Pipeline`] if the model cannot be built, [`Error::Evaluation`]
/// if evaluation fails.
pub fn evaluate_expression(expr: &Expression, inputs: &[f64]) -> Result<f64> {
    let compiled = Pipeline::new().build(expr)?;
    Ok(compiled.evaluate(inputs)?)
}

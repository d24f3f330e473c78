//! Error taxonomies for construction, pipeline assembly and evaluation.
//!
//! Every failure is returned as a typed value. Nothing in this crate aborts
//! the host process on malformed input: array/matrix shape mismatches and
//! function arity mismatches surface as [`BuildError`], a program that cannot
//! be executed surfaces as [`PipelineError`], and runtime faults of the stack
//! machine surface as [`EvaluationError`].

use thiserror::Error;

/// Errors raised by the stack machine while evaluating a program.
///
/// Both execution backends (the interpreter and the GPU record replay)
/// produce exactly these variants for the same faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// An instruction needed more operands than the stack held.
    #[error("stack underflow")]
    StackUnderflow,

    /// An `Input` instruction referenced a slot past the end of the input vector.
    #[error("input index {index} out of range ({available} inputs available)")]
    InvalidInputIndex {
        /// Referenced input slot
        index: usize,
        /// Length of the supplied input vector
        available: usize,
    },

    /// Division with an exact zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// Domain error of a unary function, or an undecodable GPU record.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The program left a number of values other than one on the stack.
    #[error("invalid final stack: expected 1 value, found {0}")]
    InvalidFinalStack(usize),
}

/// Errors raised while building expressions through the DSL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A reusable function was called with the wrong number of arguments.
    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Function name
        name: String,
        /// Declared arity
        expected: usize,
        /// Number of supplied arguments
        got: usize,
    },

    /// A function template references an input slot that its arity does not cover.
    #[error("function '{name}' template references input {index} but arity is {arity}")]
    TemplateInputOutOfRange {
        /// Function name
        name: String,
        /// Offending input slot
        index: usize,
        /// Declared arity
        arity: usize,
    },

    /// Substitution found an input placeholder with no matching argument.
    #[error("input {index} has no binding ({arity} argument(s) supplied)")]
    UnboundInput {
        /// Offending input slot
        index: usize,
        /// Number of supplied arguments
        arity: usize,
    },

    /// Two arrays or matrices have incompatible shapes.
    #[error("{operation}: dimension mismatch ({left} vs {right})")]
    DimensionMismatch {
        /// Operation that was attempted
        operation: &'static str,
        /// Shape of the left operand
        left: String,
        /// Shape of the right operand
        right: String,
    },

    /// An aggregate or shape-dependent operation was applied to an empty operand.
    #[error("{operation}: operand is empty")]
    EmptyOperand {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// No function with this name is registered.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A function with this name is already registered.
    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),
}

/// Errors raised while assembling a program for caching or offboard execution.
///
/// The pipeline fails closed: a program that could not be evaluated to exactly
/// one value is rejected here instead of being cached.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The pipeline produced no instructions.
    #[error("pipeline produced an empty program")]
    EmptyProgram,

    /// Static stack-effect analysis rejected the program.
    #[error("malformed program: {reason}")]
    MalformedProgram {
        /// Description of the first violation found
        reason: String,
    },

    /// The program does not fit the device limits of the GPU backend.
    #[error("GPU limit exceeded: {what} is {value}, limit is {limit}")]
    GpuLimitExceeded {
        /// Which limit was violated
        what: &'static str,
        /// Observed value
        value: usize,
        /// Configured limit
        limit: usize,
    },

    /// A literal would change value when narrowed into a GPU record, so the
    /// device could not reproduce the CPU result bit for bit.
    #[error("constant {value} at instruction {pc} is not exactly representable as f32")]
    InexactGpuConstant {
        /// Program counter of the offending `Constant`
        pc: usize,
        /// The literal as written
        value: f64,
    },

    /// Expression construction failed before compilation.
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Crate-level error covering every taxonomy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Runtime evaluation failure
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// DSL construction failure
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Pipeline assembly failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Convenience alias used across the public API.
pub type Result<T, E = Error> = std::result::Result<T, E>;

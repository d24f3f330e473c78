//! Scalar evaluation implementation for the bytecode evaluator.
//!
//! A [`StackMachine`] executes one instruction at a time against a borrowed
//! input vector. Every fault is returned as an [`EvaluationError`]; nothing
//! here panics on malformed programs or short input vectors.
//!
//! The same machine backs the GPU record replay, so the two execution paths
//! cannot drift apart.

use super::instruction::Instruction;
use crate::error::EvaluationError;
use crate::math;

/// Stack size reserved up front when the caller has no better estimate.
const DEFAULT_STACK_CAPACITY: usize = 16;

/// Value stack plus the input vector it reads from.
pub(crate) struct StackMachine<'a> {
    stack: Vec<f64>,
    inputs: &'a [f64],
}

impl<'a> StackMachine<'a> {
    pub(crate) fn with_capacity(inputs: &'a [f64], capacity: usize) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
            inputs,
        }
    }

    #[inline]
    fn pop(&mut self) -> Result<f64, EvaluationError> {
        self.stack.pop().ok_or(EvaluationError::StackUnderflow)
    }

    /// Execute a single instruction.
    #[inline]
    pub(crate) fn step(&mut self, instr: Instruction) -> Result<(), EvaluationError> {
        match instr {
            Instruction::Input(index) => {
                let value =
                    self.inputs
                        .get(index)
                        .copied()
                        .ok_or(EvaluationError::InvalidInputIndex {
                            index,
                            available: self.inputs.len(),
                        })?;
                self.stack.push(value);
            }
            Instruction::Constant(value) => self.stack.push(value),
            Instruction::Select => {
                // Condition was pushed first, so it is deepest
                let if_false = self.pop()?;
                let if_true = self.pop()?;
                let condition = self.pop()?;
                self.stack.push(math::select(condition, if_true, if_false));
            }
            other => {
                if let Some(op) = other.as_binary() {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.stack.push(math::apply_binary(op, left, right)?);
                } else if let Some(op) = other.as_unary() {
                    let x = self.pop()?;
                    self.stack.push(math::apply_unary(op, x)?);
                }
            }
        }
        Ok(())
    }

    /// Check the terminal contract and return the single residual value.
    pub(crate) fn finish(self) -> Result<f64, EvaluationError> {
        match self.stack.as_slice() {
            [value] => Ok(*value),
            other => Err(EvaluationError::InvalidFinalStack(other.len())),
        }
    }
}

/// Evaluate a program against an input vector.
///
/// # Errors
///
/// - [`EvaluationError::StackUnderflow`] if an operator lacks operands
/// - [`EvaluationError::InvalidInputIndex`] if an `Input` slot is past `inputs.len()`
/// - [`EvaluationError::DivisionByZero`] on an exact zero divisor
/// - [`EvaluationError::InvalidOperation`] for `sqrt`/`log` domain faults
/// - [`EvaluationError::InvalidFinalStack`] unless exactly one value remains
///
/// # Example
///
/// ```
/// use mcexpr::{Expression, compile, evaluate};
///
/// let program = compile(&(Expression::input(0) - Expression::input(1)));
/// assert_eq!(evaluate(&program, &[10.0, 3.0]), Ok(7.0));
/// ```
pub fn evaluate(program: &[Instruction], inputs: &[f64]) -> Result<f64, EvaluationError> {
    execute(program, inputs, DEFAULT_STACK_CAPACITY)
}

/// Evaluate with a pre-sized stack.
pub(crate) fn execute(
    program: &[Instruction],
    inputs: &[f64],
    stack_capacity: usize,
) -> Result<f64, EvaluationError> {
    let mut machine = StackMachine::with_capacity(inputs, stack_capacity);
    for &instr in program {
        machine.step(instr)?;
    }
    machine.finish()
}

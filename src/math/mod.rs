//! Scalar arithmetic shared by every execution path
//!
//! Constant folding, the interpreter and the GPU record replay all apply
//! operators through these functions, so a folded literal is bit-identical
//! to the value the stack machine would have computed at run time.
//!
//! # Domain Validation
//!
//! - **Division**: an exact zero divisor is [`EvaluationError::DivisionByZero`]
//! - **Square root**: negative arguments are an invalid operation
//! - **Logarithm**: non-positive arguments are an invalid operation
//!
//! Everything else follows IEEE-754 `f64` semantics (`pow`, `exp` and `tan`
//! may overflow to infinity; that is a value, not an error).

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::EvaluationError;

mod robustness_tests;

/// Absolute tolerance used by `Equal` and `NotEqual`.
pub const EQUALITY_EPSILON: f64 = 1e-10;

#[inline]
const fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Apply a binary operator to `left` and `right`.
///
/// # Errors
///
/// [`EvaluationError::DivisionByZero`] when dividing by exactly zero.
#[inline]
pub fn apply_binary(op: BinaryOp, left: f64, right: f64) -> Result<f64, EvaluationError> {
    let value = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Subtract => left - right,
        BinaryOp::Multiply => left * right,
        BinaryOp::Divide => {
            if right == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            left / right
        }
        BinaryOp::Power => left.powf(right),
        BinaryOp::Min => left.min(right),
        BinaryOp::Max => left.max(right),
        BinaryOp::LessThan => truth(left < right),
        BinaryOp::GreaterThan => truth(left > right),
        BinaryOp::LessOrEqual => truth(left <= right),
        BinaryOp::GreaterOrEqual => truth(left >= right),
        BinaryOp::Equal => truth((left - right).abs() < EQUALITY_EPSILON),
        BinaryOp::NotEqual => truth((left - right).abs() >= EQUALITY_EPSILON),
    };
    Ok(value)
}

/// Apply a unary operator to `x`.
///
/// # Errors
///
/// [`EvaluationError::InvalidOperation`] for `sqrt` of a negative number or
/// `log` of a non-positive number.
#[inline]
pub fn apply_unary(op: UnaryOp, x: f64) -> Result<f64, EvaluationError> {
    let value = match op {
        UnaryOp::Negate => -x,
        UnaryOp::Abs => x.abs(),
        UnaryOp::Sqrt => {
            if x < 0.0 {
                return Err(EvaluationError::InvalidOperation(format!(
                    "sqrt of negative value {x}"
                )));
            }
            x.sqrt()
        }
        UnaryOp::Log => {
            if x <= 0.0 {
                return Err(EvaluationError::InvalidOperation(format!(
                    "log of non-positive value {x}"
                )));
            }
            x.ln()
        }
        UnaryOp::Exp => x.exp(),
        UnaryOp::Sin => x.sin(),
        UnaryOp::Cos => x.cos(),
        UnaryOp::Tan => x.tan(),
    };
    Ok(value)
}

/// Ternary select: any non-zero condition picks `if_true`.
#[inline]
pub fn select(condition: f64, if_true: f64, if_false: f64) -> f64 {
    if condition != 0.0 { if_true } else { if_false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_order_is_left_then_right() {
        assert_eq!(apply_binary(BinaryOp::Subtract, 10.0, 3.0), Ok(7.0));
        assert_eq!(apply_binary(BinaryOp::Divide, 10.0, 4.0), Ok(2.5));
        assert_eq!(apply_binary(BinaryOp::Power, 2.0, 10.0), Ok(1024.0));
        assert_eq!(apply_binary(BinaryOp::LessThan, 1.0, 2.0), Ok(1.0));
        assert_eq!(apply_binary(BinaryOp::GreaterThan, 1.0, 2.0), Ok(0.0));
    }

    #[test]
    fn test_comparisons_yield_one_or_zero() {
        assert_eq!(apply_binary(BinaryOp::LessOrEqual, 2.0, 2.0), Ok(1.0));
        assert_eq!(apply_binary(BinaryOp::GreaterOrEqual, 1.0, 2.0), Ok(0.0));
        assert_eq!(apply_binary(BinaryOp::Min, 4.0, -1.0), Ok(-1.0));
        assert_eq!(apply_binary(BinaryOp::Max, 4.0, -1.0), Ok(4.0));
    }

    #[test]
    fn test_equality_epsilon() {
        assert_eq!(apply_binary(BinaryOp::Equal, 1.0, 1.0 + 1e-11), Ok(1.0));
        assert_eq!(apply_binary(BinaryOp::Equal, 1.0, 1.0 + 1e-9), Ok(0.0));
        assert_eq!(apply_binary(BinaryOp::NotEqual, 1.0, 1.0 + 1e-11), Ok(0.0));
        assert_eq!(apply_binary(BinaryOp::NotEqual, 1.0, 1.0 + 1e-9), Ok(1.0));
    }

    #[test]
    fn test_domain_errors() {
        assert_eq!(
            apply_binary(BinaryOp::Divide, 1.0, 0.0),
            Err(EvaluationError::DivisionByZero)
        );
        assert_eq!(
            apply_binary(BinaryOp::Divide, 1.0, -0.0),
            Err(EvaluationError::DivisionByZero)
        );
        assert!(matches!(
            apply_unary(UnaryOp::Sqrt, -1.0),
            Err(EvaluationError::InvalidOperation(_))
        ));
        assert!(matches!(
            apply_unary(UnaryOp::Log, 0.0),
            Err(EvaluationError::InvalidOperation(_))
        ));
        assert_eq!(apply_unary(UnaryOp::Sqrt, 0.0), Ok(0.0));
    }

    #[test]
    fn test_select() {
        assert_eq!(select(1.0, 2.0, 3.0), 2.0);
        assert_eq!(select(-0.5, 2.0, 3.0), 2.0);
        assert_eq!(select(0.0, 2.0, 3.0), 3.0);
    }
}

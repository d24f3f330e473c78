//! Operator overloads and math methods.
//!
//! `+ - * /` and unary `-` are implemented for every combination of
//! `Expression`, `&Expression` and `f64`. Functions that Rust has no
//! operator for are methods taking `self`, with the second operand accepted
//! as anything convertible into an expression.
//!
//! ```
//! use mcexpr::Expression;
//!
//! let spot = Expression::input(0);
//! let strike = Expression::input(1);
//! let call = (&spot - &strike).max(0.0);
//! let digital = spot.gt(strike).select(1.0, 0.0);
//! # let _ = (call, digital);
//! ```

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::ast::{BinaryOp, Expression, UnaryOp};

// ===== Macro for generating operator implementations =====

macro_rules! impl_binary_ops {
    ($lhs:ty, $rhs:ty, $to_lhs:expr, $to_rhs:expr) => {
        impl Add<$rhs> for $lhs {
            type Output = Expression;
            fn add(self, rhs: $rhs) -> Expression {
                Expression::binary(BinaryOp::Add, $to_lhs(self), $to_rhs(rhs))
            }
        }
        impl Sub<$rhs> for $lhs {
            type Output = Expression;
            fn sub(self, rhs: $rhs) -> Expression {
                Expression::binary(BinaryOp::Subtract, $to_lhs(self), $to_rhs(rhs))
            }
        }
        impl Mul<$rhs> for $lhs {
            type Output = Expression;
            fn mul(self, rhs: $rhs) -> Expression {
                Expression::binary(BinaryOp::Multiply, $to_lhs(self), $to_rhs(rhs))
            }
        }
        impl Div<$rhs> for $lhs {
            type Output = Expression;
            fn div(self, rhs: $rhs) -> Expression {
                Expression::binary(BinaryOp::Divide, $to_lhs(self), $to_rhs(rhs))
            }
        }
    };
}

impl_binary_ops!(Expression, Expression, |e: Expression| e, |r: Expression| r);
impl_binary_ops!(Expression, &Expression, |e: Expression| e, |r: &Expression| r.clone());
impl_binary_ops!(&Expression, Expression, |e: &Expression| e.clone(), |r: Expression| r);
impl_binary_ops!(&Expression, &Expression, |e: &Expression| e.clone(), |r: &Expression| r.clone());
impl_binary_ops!(Expression, f64, |e: Expression| e, Expression::constant);
impl_binary_ops!(&Expression, f64, |e: &Expression| e.clone(), Expression::constant);
impl_binary_ops!(f64, Expression, Expression::constant, |r: Expression| r);
impl_binary_ops!(f64, &Expression, Expression::constant, |r: &Expression| r.clone());

impl Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        Expression::unary(UnaryOp::Negate, self)
    }
}

impl Neg for &Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        Expression::unary(UnaryOp::Negate, self.clone())
    }
}

// ===== Unary math methods =====

macro_rules! impl_unary_methods {
    ($($fn_name:ident => $op:ident),* $(,)?) => {
        impl Expression {
            $(
                #[must_use]
                pub fn $fn_name(self) -> Expression {
                    Expression::unary(UnaryOp::$op, self)
                }
            )*
        }
    };
}

impl_unary_methods!(
    abs => Abs,
    sqrt => Sqrt,
    log => Log,
    exp => Exp,
    sin => Sin,
    cos => Cos,
    tan => Tan,
);

// ===== Binary methods (no operator symbol in Rust) =====

macro_rules! impl_binary_methods {
    ($($(#[$meta:meta])* $fn_name:ident => $op:ident),* $(,)?) => {
        impl Expression {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $fn_name(self, other: impl Into<Expression>) -> Expression {
                    Expression::binary(BinaryOp::$op, self, other.into())
                }
            )*
        }
    };
}

impl_binary_methods!(
    /// Raise to a power (Rust's `^` is XOR).
    pow => Power,
    min => Min,
    max => Max,
    /// `1.0` if `self < other`, else `0.0`.
    lt => LessThan,
    gt => GreaterThan,
    le => LessOrEqual,
    ge => GreaterOrEqual,
    /// `1.0` if `|self - other| < 1e-10`, else `0.0`.
    eq_to => Equal,
    ne_to => NotEqual,
);

impl Expression {
    /// Natural logarithm; alias for [`Expression::log`].
    #[inline]
    #[must_use]
    pub fn ln(self) -> Expression {
        self.log()
    }

    /// Use `self` as a condition: `if_true` when non-zero, else `if_false`.
    #[must_use]
    pub fn select(
        self,
        if_true: impl Into<Expression>,
        if_false: impl Into<Expression>,
    ) -> Expression {
        Expression::conditional(self, if_true.into(), if_false.into())
    }

    /// Clamp into `[lower, upper]` as `min(max(self, lower), upper)`.
    #[must_use]
    pub fn clamp(self, lower: impl Into<Expression>, upper: impl Into<Expression>) -> Expression {
        self.max(lower).min(upper)
    }
}

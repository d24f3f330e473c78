//! Authoring layer for expression trees.
//!
//! Everything here produces plain [`Expression`](crate::Expression) values;
//! nothing survives into the compiled program. Arrays and matrices unroll
//! into nested binary nodes at construction time, and function calls are
//! inlined by substitution.
//!
//! - [`ops`]: arithmetic operators and math methods on `Expression`
//! - [`array`]: fixed-size vectors of expressions
//! - [`matrix`]: fixed-size matrices of expressions
//! - [`function`]: reusable templates with a declared arity

pub mod array;
pub mod function;
pub mod matrix;
pub mod ops;

pub use array::ExprArray;
pub use function::{ExprFunction, FunctionRegistry};
pub use matrix::ExprMatrix;

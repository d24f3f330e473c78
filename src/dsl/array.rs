//! Fixed-size arrays of expressions.
//!
//! Aggregates fold left (`((a0 + a1) + a2) + ...`), which keeps the
//! compiled program at a stack depth of two no matter how long the array is.

use std::ops::Index;

use crate::ast::{BinaryOp, Expression};
use crate::error::BuildError;

/// An ordered, fixed-length vector of expressions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExprArray {
    elements: Vec<Expression>,
}

impl ExprArray {
    pub fn new(elements: Vec<Expression>) -> Self {
        Self { elements }
    }

    /// `len` consecutive inputs starting at slot `start`.
    pub fn inputs(start: usize, len: usize) -> Self {
        Self::new((start..start + len).map(Expression::input).collect())
    }

    /// One constant per value.
    pub fn constants(values: &[f64]) -> Self {
        Self::new(values.iter().copied().map(Expression::constant).collect())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Expression> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expression> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[Expression] {
        &self.elements
    }

    pub fn into_vec(self) -> Vec<Expression> {
        self.elements
    }

    fn fold(&self, op: BinaryOp, operation: &'static str) -> Result<Expression, BuildError> {
        let mut iter = self.elements.iter().cloned();
        let first = iter.next().ok_or(BuildError::EmptyOperand { operation })?;
        Ok(iter.fold(first, |acc, e| Expression::binary(op, acc, e)))
    }

    fn check_same_len(&self, other: &ExprArray, operation: &'static str) -> Result<(), BuildError> {
        if self.len() == other.len() {
            Ok(())
        } else {
            Err(BuildError::DimensionMismatch {
                operation,
                left: format!("[{}]", self.len()),
                right: format!("[{}]", other.len()),
            })
        }
    }

    fn zip_with(
        &self,
        other: &ExprArray,
        op: BinaryOp,
        operation: &'static str,
    ) -> Result<ExprArray, BuildError> {
        self.check_same_len(other, operation)?;
        Ok(self
            .elements
            .iter()
            .zip(&other.elements)
            .map(|(a, b)| Expression::binary(op, a.clone(), b.clone()))
            .collect())
    }

    // Aggregates

    /// `a0 + a1 + ... + an`
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyOperand`] for an empty array.
    pub fn sum(&self) -> Result<Expression, BuildError> {
        self.fold(BinaryOp::Add, "sum")
    }

    /// `a0 * a1 * ... * an`
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyOperand`] for an empty array.
    pub fn product(&self) -> Result<Expression, BuildError> {
        self.fold(BinaryOp::Multiply, "product")
    }

    /// Arithmetic mean.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyOperand`] for an empty array.
    pub fn mean(&self) -> Result<Expression, BuildError> {
        #[allow(
            clippy::cast_precision_loss,
            reason = "Array lengths are far below 2^52"
        )]
        let n = self.len() as f64;
        self.fold(BinaryOp::Add, "mean").map(|sum| sum / n)
    }

    pub fn min_element(&self) -> Result<Expression, BuildError> {
        self.fold(BinaryOp::Min, "min_element")
    }

    pub fn max_element(&self) -> Result<Expression, BuildError> {
        self.fold(BinaryOp::Max, "max_element")
    }

    /// `sum(a_i * b_i)`
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] if lengths differ,
    /// [`BuildError::EmptyOperand`] if both are empty.
    pub fn dot(&self, other: &ExprArray) -> Result<Expression, BuildError> {
        self.zip_with(other, BinaryOp::Multiply, "dot")?
            .fold(BinaryOp::Add, "dot")
    }

    // Element-wise

    /// Element-wise sum.
    ///
    /// Fallible, so not an `Add` impl.
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] if lengths differ.
    #[allow(
        clippy::should_implement_trait,
        reason = "Shape mismatch is a recoverable error, operator traits cannot return one"
    )]
    pub fn add(&self, other: &ExprArray) -> Result<ExprArray, BuildError> {
        self.zip_with(other, BinaryOp::Add, "add")
    }

    /// Element-wise difference.
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] if lengths differ.
    #[allow(
        clippy::should_implement_trait,
        reason = "Shape mismatch is a recoverable error, operator traits cannot return one"
    )]
    pub fn sub(&self, other: &ExprArray) -> Result<ExprArray, BuildError> {
        self.zip_with(other, BinaryOp::Subtract, "sub")
    }

    /// Multiply every element by `factor`.
    pub fn scale(&self, factor: impl Into<Expression>) -> ExprArray {
        let factor = factor.into();
        self.map(|e| e.clone() * factor.clone())
    }

    pub fn map(&self, f: impl FnMut(&Expression) -> Expression) -> ExprArray {
        self.elements.iter().map(f).collect()
    }
}

impl From<Vec<Expression>> for ExprArray {
    fn from(elements: Vec<Expression>) -> Self {
        Self::new(elements)
    }
}

impl FromIterator<Expression> for ExprArray {
    fn from_iter<I: IntoIterator<Item = Expression>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Index<usize> for ExprArray {
    type Output = Expression;

    fn index(&self, index: usize) -> &Expression {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a ExprArray {
    type Item = &'a Expression;
    type IntoIter = std::slice::Iter<'a, Expression>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl IntoIterator for ExprArray {
    type Item = Expression;
    type IntoIter = std::vec::IntoIter<Expression>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, evaluate, max_stack_depth};

    fn eval(expr: &Expression, inputs: &[f64]) -> f64 {
        evaluate(&compile(expr), inputs).unwrap()
    }

    #[test]
    fn test_aggregates() {
        let xs = ExprArray::inputs(0, 4);
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(eval(&xs.sum().unwrap(), &v), 10.0);
        assert_eq!(eval(&xs.product().unwrap(), &v), 24.0);
        assert_eq!(eval(&xs.mean().unwrap(), &v), 2.5);
        assert_eq!(eval(&xs.min_element().unwrap(), &v), 1.0);
        assert_eq!(eval(&xs.max_element().unwrap(), &v), 4.0);
    }

    #[test]
    fn test_sum_unrolls_left() {
        let xs = ExprArray::inputs(2, 3);
        let expected = (Expression::input(2) + Expression::input(3)) + Expression::input(4);
        assert_eq!(xs.sum().unwrap(), expected);

        let long = ExprArray::inputs(0, 64);
        assert_eq!(max_stack_depth(&compile(&long.sum().unwrap())), 2);
    }

    #[test]
    fn test_single_element_aggregate_is_the_element() {
        let xs = ExprArray::inputs(7, 1);
        assert_eq!(xs.sum().unwrap(), Expression::input(7));
    }

    #[test]
    fn test_empty_aggregates_are_errors() {
        let empty = ExprArray::default();
        assert_eq!(
            empty.sum(),
            Err(BuildError::EmptyOperand { operation: "sum" })
        );
        assert!(empty.mean().is_err());
        assert!(empty.dot(&ExprArray::default()).is_err());
    }

    #[test]
    fn test_dot_and_length_checks() {
        let w = ExprArray::constants(&[0.5, 0.25]);
        let x = ExprArray::inputs(0, 2);
        assert_eq!(eval(&w.dot(&x).unwrap(), &[4.0, 8.0]), 4.0);

        let short = ExprArray::inputs(0, 1);
        assert!(matches!(
            w.dot(&short),
            Err(BuildError::DimensionMismatch { operation: "dot", .. })
        ));
        assert!(w.add(&short).is_err());
        assert!(w.sub(&short).is_err());
    }

    #[test]
    fn test_element_wise() {
        let x = ExprArray::inputs(0, 2);
        let y = ExprArray::constants(&[1.0, 2.0]);
        let diff = x.sub(&y).unwrap().scale(10.0);
        assert_eq!(diff.len(), 2);
        assert_eq!(eval(&diff[0], &[5.0, 5.0]), 40.0);
        assert_eq!(eval(&diff[1], &[5.0, 5.0]), 30.0);

        let squared = x.map(|e| e.clone() * e.clone());
        assert_eq!(eval(&squared.sum().unwrap(), &[3.0, 4.0]), 25.0);
    }
}

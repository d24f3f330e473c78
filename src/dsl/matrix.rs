//! Fixed-size matrices of expressions, stored row-major.
//!
//! Products unroll into explicit dot products at construction time. Zero and
//! one entries (e.g. from [`ExprMatrix::identity`]) are left for the
//! optimizer's identity elimination.

use crate::ast::Expression;
use crate::dsl::array::ExprArray;
use crate::error::BuildError;

/// Rectangular matrix of expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Expression>,
}

impl ExprMatrix {
    /// Build from rows.
    ///
    /// # Errors
    ///
    /// - [`BuildError::EmptyOperand`] if there are no rows or no columns
    /// - [`BuildError::DimensionMismatch`] if rows differ in length
    pub fn new(rows: Vec<Vec<Expression>>) -> Result<Self, BuildError> {
        let cols = rows.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(BuildError::EmptyOperand { operation: "matrix" });
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != cols) {
            return Err(BuildError::DimensionMismatch {
                operation: "matrix",
                left: format!("{cols} columns"),
                right: format!("{} columns", bad.len()),
            });
        }
        let n_rows = rows.len();
        Ok(Self {
            rows: n_rows,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// `n x n` identity of constants.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyOperand`] if `n` is zero.
    pub fn identity(n: usize) -> Result<Self, BuildError> {
        if n == 0 {
            return Err(BuildError::EmptyOperand { operation: "identity" });
        }
        let data = (0..n * n)
            .map(|k| Expression::constant(if k / n == k % n { 1.0 } else { 0.0 }))
            .collect();
        Ok(Self {
            rows: n,
            cols: n,
            data,
        })
    }

    /// `rows x cols` consecutive inputs, row-major, starting at slot `start`.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyOperand`] if either dimension is zero.
    pub fn inputs(start: usize, rows: usize, cols: usize) -> Result<Self, BuildError> {
        if rows == 0 || cols == 0 {
            return Err(BuildError::EmptyOperand { operation: "matrix" });
        }
        Ok(Self {
            rows,
            cols,
            data: (start..start + rows * cols).map(Expression::input).collect(),
        })
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub const fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Expression> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<ExprArray> {
        if row >= self.rows {
            return None;
        }
        self.data
            .get(row * self.cols..(row + 1) * self.cols)
            .map(|slice| ExprArray::new(slice.to_vec()))
    }

    pub fn column(&self, col: usize) -> Option<ExprArray> {
        (col < self.cols).then(|| {
            self.data
                .iter()
                .skip(col)
                .step_by(self.cols)
                .cloned()
                .collect()
        })
    }

    fn shape(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }

    fn rows_iter(&self) -> impl Iterator<Item = ExprArray> + '_ {
        (0..self.rows).filter_map(|r| self.row(r))
    }

    fn columns(&self) -> Vec<ExprArray> {
        (0..self.cols).filter_map(|c| self.column(c)).collect()
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
            data: self.columns().into_iter().flatten().collect(),
        }
    }

    /// Matrix product `self * other`.
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] unless `self.cols() == other.rows()`.
    pub fn multiply(&self, other: &ExprMatrix) -> Result<Self, BuildError> {
        if self.cols != other.rows {
            return Err(BuildError::DimensionMismatch {
                operation: "multiply",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let columns = other.columns();
        let mut data = Vec::with_capacity(self.rows * other.cols);
        for row in self.rows_iter() {
            for column in &columns {
                data.push(row.dot(column)?);
            }
        }
        Ok(Self {
            rows: self.rows,
            cols: other.cols,
            data,
        })
    }

    /// Matrix-vector product `self * v`.
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] unless `v.len() == self.cols()`.
    pub fn mul_vector(&self, v: &ExprArray) -> Result<ExprArray, BuildError> {
        if v.len() != self.cols {
            return Err(BuildError::DimensionMismatch {
                operation: "mul_vector",
                left: self.shape(),
                right: format!("[{}]", v.len()),
            });
        }
        self.rows_iter().map(|row| row.dot(v)).collect()
    }

    /// `wᵀ M w`, e.g. portfolio variance from weights and a covariance matrix.
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] unless the matrix is square with
    /// side `w.len()`.
    pub fn quadratic_form(&self, w: &ExprArray) -> Result<Expression, BuildError> {
        if !self.is_square() || w.len() != self.rows {
            return Err(BuildError::DimensionMismatch {
                operation: "quadratic_form",
                left: self.shape(),
                right: format!("[{}]", w.len()),
            });
        }
        w.dot(&self.mul_vector(w)?)
    }

    /// Sum of the diagonal.
    ///
    /// # Errors
    ///
    /// [`BuildError::DimensionMismatch`] for a non-square matrix.
    pub fn trace(&self) -> Result<Expression, BuildError> {
        if !self.is_square() {
            return Err(BuildError::DimensionMismatch {
                operation: "trace",
                left: format!("{} rows", self.rows),
                right: format!("{} columns", self.cols),
            });
        }
        (0..self.rows)
            .filter_map(|i| self.get(i, i).cloned())
            .collect::<ExprArray>()
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, evaluate, optimize};

    fn eval(expr: &Expression, inputs: &[f64]) -> f64 {
        evaluate(&compile(expr), inputs).unwrap()
    }

    fn constants(rows: &[&[f64]]) -> ExprMatrix {
        ExprMatrix::new(
            rows.iter()
                .map(|r| r.iter().copied().map(Expression::constant).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_checks_shape() {
        assert_eq!(
            ExprMatrix::new(vec![]),
            Err(BuildError::EmptyOperand { operation: "matrix" })
        );
        let ragged = vec![
            vec![Expression::input(0), Expression::input(1)],
            vec![Expression::input(2)],
        ];
        assert!(matches!(
            ExprMatrix::new(ragged),
            Err(BuildError::DimensionMismatch { operation: "matrix", .. })
        ));
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let empty = Err(BuildError::EmptyOperand { operation: "matrix" });
        assert_eq!(ExprMatrix::inputs(0, 2, 0), empty);
        assert_eq!(ExprMatrix::inputs(0, 0, 3), empty);
        assert_eq!(
            ExprMatrix::identity(0),
            Err(BuildError::EmptyOperand { operation: "identity" })
        );
    }

    #[test]
    fn test_products_keep_their_shape() {
        let a = ExprMatrix::inputs(0, 2, 1).unwrap();
        let b = ExprMatrix::inputs(2, 1, 3).unwrap();
        let p = a.multiply(&b).unwrap();
        assert_eq!((p.rows(), p.cols()), (2, 3));
        for r in 0..2 {
            assert_eq!(p.row(r).map(|row| row.len()), Some(3));
        }
        assert!(p.row(2).is_none());

        let v = a.mul_vector(&ExprArray::inputs(9, 1)).unwrap();
        assert_eq!(v.len(), a.rows());
    }

    #[test]
    fn test_inputs_are_row_major() {
        let m = ExprMatrix::inputs(3, 2, 3).unwrap();
        assert_eq!(m.get(0, 2), Some(&Expression::input(5)));
        assert_eq!(m.get(1, 0), Some(&Expression::input(6)));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.column(1).unwrap().as_slice(), &[Expression::input(4), Expression::input(7)]);
    }

    #[test]
    fn test_transpose() {
        let m = ExprMatrix::inputs(0, 2, 3).unwrap();
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (3, 2));
        for r in 0..2 {
            for c in 0..3 {
                assert_eq!(m.get(r, c), t.get(c, r));
            }
        }
    }

    #[test]
    fn test_multiply() {
        let a = constants(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = constants(&[&[5.0], &[6.0]]);
        let p = a.multiply(&b).unwrap();
        assert_eq!((p.rows(), p.cols()), (2, 1));
        assert_eq!(eval(p.get(0, 0).unwrap(), &[]), 17.0);
        assert_eq!(eval(p.get(1, 0).unwrap(), &[]), 39.0);

        assert!(matches!(
            b.multiply(&b),
            Err(BuildError::DimensionMismatch { operation: "multiply", .. })
        ));
    }

    #[test]
    fn test_identity_product_optimizes_away() {
        let x = ExprArray::inputs(0, 3);
        let y = ExprMatrix::identity(3).unwrap().mul_vector(&x).unwrap();
        for (i, e) in y.iter().enumerate() {
            assert_eq!(optimize(&compile(e)), compile(&Expression::input(i)));
        }
    }

    #[test]
    fn test_quadratic_form_is_portfolio_variance() {
        // Two assets, weights 0.6/0.4, vols 0.2/0.3, correlation 0.5
        let cov = constants(&[&[0.04, 0.03], &[0.03, 0.09]]);
        let w = ExprArray::inputs(0, 2);
        let variance = cov.quadratic_form(&w).unwrap();
        let expected = 0.6 * 0.6 * 0.04 + 2.0 * 0.6 * 0.4 * 0.03 + 0.4 * 0.4 * 0.09;
        assert!((eval(&variance, &[0.6, 0.4]) - expected).abs() < 1e-15);

        assert!(cov.quadratic_form(&ExprArray::inputs(0, 3)).is_err());
        assert!(ExprMatrix::inputs(0, 2, 3).unwrap().quadratic_form(&w).is_err());
    }

    #[test]
    fn test_trace() {
        let m = ExprMatrix::inputs(0, 2, 2).unwrap();
        assert_eq!(eval(&m.trace().unwrap(), &[1.0, 2.0, 3.0, 4.0]), 5.0);
        assert!(ExprMatrix::inputs(0, 1, 2).unwrap().trace().is_err());
    }
}

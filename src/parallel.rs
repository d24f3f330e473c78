//! Parallel batch evaluation using Rayon
//!
//! A [`CompiledExpression`] is immutable and `Sync`, so Monte Carlo
//! iterations are evaluated on the Rayon pool without any locking: every row
//! gets its own stack.
//!
//! Enable with the `parallel` feature:
//! ```toml
//! mcexpr = { version = "0.1", features = ["parallel"] }
//! ```

use rayon::prelude::*;

use crate::error::EvaluationError;
use crate::evaluator::CompiledExpression;

/// Evaluate `compiled` against every row in parallel.
///
/// Results are in row order and identical to
/// [`CompiledExpression::evaluate_batch`].
///
/// # Example
/// ```
/// use mcexpr::{CompiledExpression, Expression};
/// use mcexpr::parallel::evaluate_batch_parallel;
///
/// let compiled = CompiledExpression::new(&(Expression::input(0) * 2.0)).unwrap();
/// let rows: Vec<Vec<f64>> = (0..4).map(|i| vec![f64::from(i)]).collect();
/// let results = evaluate_batch_parallel(&compiled, &rows);
/// assert_eq!(results, vec![Ok(0.0), Ok(2.0), Ok(4.0), Ok(6.0)]);
/// ```
pub fn evaluate_batch_parallel<R>(
    compiled: &CompiledExpression,
    rows: &[R],
) -> Vec<Result<f64, EvaluationError>>
where
    R: AsRef<[f64]> + Sync,
{
    rows.par_iter()
        .map(|row| compiled.evaluate(row.as_ref()))
        .collect()
}

/// Evaluate and keep only successful results, failing on the first error
/// in row order.
///
/// # Errors
///
/// The error of the lowest-indexed failing row.
pub fn try_evaluate_batch_parallel<R>(
    compiled: &CompiledExpression,
    rows: &[R],
) -> Result<Vec<f64>, EvaluationError>
where
    R: AsRef<[f64]> + Sync,
{
    evaluate_batch_parallel(compiled, rows).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expression;

    #[test]
    fn test_parallel_matches_sequential() {
        let x = Expression::input(0);
        let y = Expression::input(1);
        let compiled = CompiledExpression::new(&((&x - &y).max(0.0) / &y)).unwrap();
        let rows: Vec<Vec<f64>> = (0..1000)
            .map(|i| vec![f64::from(i), f64::from(i % 7)])
            .collect();
        assert_eq!(
            evaluate_batch_parallel(&compiled, &rows),
            compiled.evaluate_batch(&rows)
        );
    }

    #[test]
    fn test_first_error_in_row_order() {
        let compiled =
            CompiledExpression::new(&(Expression::constant(1.0) / Expression::input(0))).unwrap();
        let rows = vec![vec![1.0], vec![], vec![0.0]];
        assert_eq!(
            try_evaluate_batch_parallel(&compiled, &rows),
            Err(EvaluationError::InvalidInputIndex {
                index: 0,
                available: 0
            })
        );
        let ok = vec![vec![1.0], vec![2.0]];
        assert_eq!(try_evaluate_batch_parallel(&compiled, &ok), Ok(vec![1.0, 0.5]));
    }
}

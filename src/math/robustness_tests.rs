#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, UnaryOp};
    use crate::math::*;

    #[test]
    fn test_non_finite_operands_are_values_not_errors() {
        // Overflow and NaN propagate as IEEE values; only domain faults are errors.
        let big = apply_unary(UnaryOp::Exp, 1000.0).unwrap();
        assert!(big.is_infinite());

        let nan = apply_binary(BinaryOp::Multiply, f64::INFINITY, 0.0).unwrap();
        assert!(nan.is_nan());

        // NaN is not < 0, so sqrt(NaN) is not a domain error
        assert!(apply_unary(UnaryOp::Sqrt, f64::NAN).unwrap().is_nan());
        assert!(apply_unary(UnaryOp::Log, f64::NAN).unwrap().is_nan());
    }

    #[test]
    fn test_every_operator_is_total_on_ordinary_inputs() {
        for op in BinaryOp::ALL {
            assert!(apply_binary(op, 3.5, 1.25).is_ok(), "{}", op.name());
        }
        for op in UnaryOp::ALL {
            assert!(apply_unary(op, 0.75).is_ok(), "{}", op.name());
        }
    }

    #[test]
    fn test_min_max_ignore_single_nan() {
        // f64::min/max return the non-NaN operand
        assert_eq!(apply_binary(BinaryOp::Min, f64::NAN, 2.0), Ok(2.0));
        assert_eq!(apply_binary(BinaryOp::Max, 2.0, f64::NAN), Ok(2.0));
    }
}

use crate::evaluator::Instruction;
use crate::simplification::rules::{Rule, RuleCategory};
use crate::simplification::slot::Slot;

/// Numeric simplification rules
pub(crate) mod rules {
    use super::*;
    use crate::math;

    /// Rule for constant folding: an operator whose operands are all bare
    /// `Constant` literals is replaced by the literal it evaluates to.
    ///
    /// Folding goes through the same arithmetic as the interpreter. An
    /// operation that would fail at run time (division by zero, `sqrt` of a
    /// negative, `log` of a non-positive) is left in place so that it still
    /// fails at run time.
    pub(crate) struct ConstantFoldRule;

    impl Rule for ConstantFoldRule {
        fn name(&self) -> &'static str {
            "constant_fold"
        }

        fn category(&self) -> RuleCategory {
            RuleCategory::Numeric
        }

        fn apply(&self, op: Instruction, operands: &[Slot]) -> Option<Slot> {
            let value = match operands {
                [x] => math::apply_unary(op.as_unary()?, x.constant()?).ok()?,
                [l, r] => math::apply_binary(op.as_binary()?, l.constant()?, r.constant()?).ok()?,
                [c, t, f] if op == Instruction::Select => {
                    math::select(c.constant()?, t.constant()?, f.constant()?)
                }
                _ => return None,
            };
            tracing::trace!(op = op.mnemonic(), value, "folded constant");
            Some(Slot::Literal(Instruction::Constant(value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::rules::ConstantFoldRule;
    use super::*;
    use crate::simplification::rules::fold_constants;

    use Instruction::*;

    fn lit(v: f64) -> Slot {
        Slot::Literal(Constant(v))
    }

    #[test]
    fn test_fold_binary() {
        assert_eq!(
            ConstantFoldRule.apply(Add, &[lit(5.0), lit(3.0)]),
            Some(lit(8.0))
        );
        assert_eq!(
            ConstantFoldRule.apply(Subtract, &[lit(5.0), lit(3.0)]),
            Some(lit(2.0))
        );
        assert_eq!(
            ConstantFoldRule.apply(GreaterThan, &[lit(5.0), lit(3.0)]),
            Some(lit(1.0))
        );
    }

    #[test]
    fn test_fold_requires_bare_constants() {
        assert_eq!(
            ConstantFoldRule.apply(Add, &[Slot::Literal(Input(0)), lit(3.0)]),
            None
        );
        let seq = Slot::Sequence(vec![Constant(1.0), Negate]);
        assert_eq!(ConstantFoldRule.apply(Add, &[seq, lit(3.0)]), None);
    }

    #[test]
    fn test_fold_skips_runtime_faults() {
        assert_eq!(ConstantFoldRule.apply(Divide, &[lit(1.0), lit(0.0)]), None);
        assert_eq!(ConstantFoldRule.apply(Sqrt, &[lit(-1.0)]), None);
        assert_eq!(ConstantFoldRule.apply(Log, &[lit(0.0)]), None);
    }

    #[test]
    fn test_fold_unary_and_select() {
        assert_eq!(ConstantFoldRule.apply(Negate, &[lit(2.0)]), Some(lit(-2.0)));
        assert_eq!(ConstantFoldRule.apply(Sqrt, &[lit(9.0)]), Some(lit(3.0)));
        assert_eq!(
            ConstantFoldRule.apply(Select, &[lit(0.0), lit(1.0), lit(2.0)]),
            Some(lit(2.0))
        );
    }

    #[test]
    fn test_fold_pass_cascades_within_one_scan() {
        // (2 * 3) + (10 / 4) folds bottom-up in a single scan
        let program = [
            Constant(2.0),
            Constant(3.0),
            Multiply,
            Constant(10.0),
            Constant(4.0),
            Divide,
            Add,
        ];
        assert_eq!(fold_constants(&program), Some(vec![Constant(8.5)]));
    }

    #[test]
    fn test_fold_pass_stops_at_inputs() {
        // in0 + (1 + 2)  ->  in0 + 3
        let program = [Input(0), Constant(1.0), Constant(2.0), Add, Add];
        assert_eq!(
            fold_constants(&program),
            Some(vec![Input(0), Constant(3.0), Add])
        );
    }
}

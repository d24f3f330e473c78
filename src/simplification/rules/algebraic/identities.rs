use crate::evaluator::Instruction;
use crate::simplification::slot::Slot;

// Only these eight identities are applied. Power, min, max, comparisons and
// select have no algebraic rewrites.

rule!(AddZeroRule, "add_zero", Algebraic, &[Instruction::Add], |_op: Instruction, operands: &[Slot]| {
    // x + 0 = x, 0 + x = x
    match operands {
        [x, zero] if zero.is_constant(0.0) => Some(x.clone()),
        [zero, x] if zero.is_constant(0.0) => Some(x.clone()),
        _ => None,
    }
});

rule!(SubZeroRule, "sub_zero", Algebraic, &[Instruction::Subtract], |_op: Instruction, operands: &[Slot]| {
    // x - 0 = x
    match operands {
        [x, zero] if zero.is_constant(0.0) => Some(x.clone()),
        _ => None,
    }
});

rule!(MulZeroRule, "mul_zero", Algebraic, &[Instruction::Multiply], |_op: Instruction, operands: &[Slot]| {
    // x * 0 = 0, 0 * x = 0
    match operands {
        [l, r] if l.is_constant(0.0) || r.is_constant(0.0) => {
            Some(Slot::Literal(Instruction::Constant(0.0)))
        }
        _ => None,
    }
});

rule!(MulOneRule, "mul_one", Algebraic, &[Instruction::Multiply], |_op: Instruction, operands: &[Slot]| {
    // x * 1 = x, 1 * x = x
    match operands {
        [x, one] if one.is_constant(1.0) => Some(x.clone()),
        [one, x] if one.is_constant(1.0) => Some(x.clone()),
        _ => None,
    }
});

rule!(DivOneRule, "div_one", Algebraic, &[Instruction::Divide], |_op: Instruction, operands: &[Slot]| {
    // x / 1 = x
    match operands {
        [x, one] if one.is_constant(1.0) => Some(x.clone()),
        _ => None,
    }
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplification::rules::{Rule, simplify_identities};

    use Instruction::*;

    fn input(i: usize) -> Slot {
        Slot::Literal(Input(i))
    }

    fn lit(v: f64) -> Slot {
        Slot::Literal(Constant(v))
    }

    #[test]
    fn test_add_zero_both_sides() {
        assert_eq!(AddZeroRule.apply(Add, &[input(0), lit(0.0)]), Some(input(0)));
        assert_eq!(AddZeroRule.apply(Add, &[lit(0.0), input(0)]), Some(input(0)));
        assert_eq!(AddZeroRule.apply(Add, &[input(0), lit(2.0)]), None);
    }

    #[test]
    fn test_sub_zero_is_one_sided() {
        assert_eq!(SubZeroRule.apply(Subtract, &[input(0), lit(0.0)]), Some(input(0)));
        // 0 - x is -x, not x
        assert_eq!(SubZeroRule.apply(Subtract, &[lit(0.0), input(0)]), None);
    }

    #[test]
    fn test_mul_zero_and_one() {
        assert_eq!(MulZeroRule.apply(Multiply, &[input(0), lit(0.0)]), Some(lit(0.0)));
        assert_eq!(MulZeroRule.apply(Multiply, &[lit(0.0), input(0)]), Some(lit(0.0)));
        assert_eq!(MulOneRule.apply(Multiply, &[input(0), lit(1.0)]), Some(input(0)));
        assert_eq!(MulOneRule.apply(Multiply, &[lit(1.0), input(0)]), Some(input(0)));
    }

    #[test]
    fn test_div_one_is_one_sided() {
        assert_eq!(DivOneRule.apply(Divide, &[input(0), lit(1.0)]), Some(input(0)));
        assert_eq!(DivOneRule.apply(Divide, &[lit(1.0), input(0)]), None);
    }

    #[test]
    fn test_no_rules_for_other_operators() {
        for op in [Power, Min, Max, LessThan, Equal, NotEqual] {
            let program = [Input(0), Constant(1.0), op];
            assert_eq!(simplify_identities(&program), Some(program.to_vec()));
        }
        let program = [Input(0), Constant(0.0), Power];
        assert_eq!(simplify_identities(&program), Some(program.to_vec()));
    }

    #[test]
    fn test_pass_rewrites_nested_sequences() {
        // (in0 + in1) * 1  ->  in0 + in1
        let program = [Input(0), Input(1), Add, Constant(1.0), Multiply];
        assert_eq!(
            simplify_identities(&program),
            Some(vec![Input(0), Input(1), Add])
        );
        // (in0 + 0) * 1 collapses fully in one scan
        let program = [Input(0), Constant(0.0), Add, Constant(1.0), Multiply];
        assert_eq!(simplify_identities(&program), Some(vec![Input(0)]));
    }
}

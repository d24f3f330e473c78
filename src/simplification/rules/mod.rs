use crate::evaluator::Instruction;
use crate::simplification::slot::Slot;

/// Declare a unit-struct [`Rule`] from a name, category, operator filter and body.
macro_rules! rule {
    ($ty:ident, $name:literal, $category:ident, $ops:expr, |$op:ident : Instruction, $operands:ident : &[Slot]| $body:block) => {
        pub(crate) struct $ty;

        impl $crate::simplification::rules::Rule for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn category(&self) -> $crate::simplification::rules::RuleCategory {
                $crate::simplification::rules::RuleCategory::$category
            }

            fn applies_to(&self) -> Option<&'static [Instruction]> {
                Some($ops)
            }

            fn apply(&self, $op: Instruction, $operands: &[Slot]) -> Option<Slot> $body
        }
    };
}

/// Core trait for all program rewrite rules
///
/// A rule sees one operator together with the symbolic slots of its
/// operands (left operand first). Returning `Some` replaces the operator and
/// its operands with the returned slot.
pub(crate) trait Rule {
    fn name(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// Which operator instructions this rule can apply to.
    /// Rules will ONLY be checked against operators in this list.
    /// `None` means every operator.
    fn applies_to(&self) -> Option<&'static [Instruction]> {
        None
    }

    fn apply(&self, op: Instruction, operands: &[Slot]) -> Option<Slot>;
}

/// Categories of rewrite rules
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum RuleCategory {
    /// Constant folding
    Numeric,
    /// Identity elimination
    Algebraic,
}

/// Numeric simplification rules
pub(crate) mod numeric;

/// Algebraic simplification rules
pub(crate) mod algebraic;

/// Run one left-to-right scan of `program`, offering every operator to `rules`.
///
/// Returns `None` if the program underflows its stack; the caller keeps the
/// program unchanged in that case. Any values left over at the end (a
/// malformed program) are flattened back in stack order.
pub(crate) fn apply_pass(program: &[Instruction], rules: &[&dyn Rule]) -> Option<Vec<Instruction>> {
    let mut stack: Vec<Slot> = Vec::with_capacity(16);

    for &instr in program {
        if instr.is_leaf() {
            stack.push(Slot::Literal(instr));
            continue;
        }

        let arity = instr.arity();
        if stack.len() < arity {
            return None;
        }
        let operands = stack.split_off(stack.len() - arity);

        let rewritten = rules
            .iter()
            .filter(|rule| rule.applies_to().is_none_or(|ops| ops.contains(&instr)))
            .find_map(|rule| {
                let slot = rule.apply(instr, &operands)?;
                tracing::trace!(
                    rule = rule.name(),
                    category = ?rule.category(),
                    op = instr.mnemonic(),
                    "rewrite"
                );
                Some(slot)
            });

        stack.push(rewritten.unwrap_or_else(|| Slot::combine(operands, instr)));
    }

    let mut out = Vec::with_capacity(program.len());
    for slot in stack {
        slot.flatten_into(&mut out);
    }
    Some(out)
}

/// The constant-folding pass.
pub(crate) fn fold_constants(program: &[Instruction]) -> Option<Vec<Instruction>> {
    apply_pass(program, &[&numeric::rules::ConstantFoldRule])
}

/// The algebraic-simplification pass.
pub(crate) fn simplify_identities(program: &[Instruction]) -> Option<Vec<Instruction>> {
    use algebraic::identities::{AddZeroRule, DivOneRule, MulOneRule, MulZeroRule, SubZeroRule};
    apply_pass(
        program,
        &[&AddZeroRule, &SubZeroRule, &MulZeroRule, &MulOneRule, &DivOneRule],
    )
}

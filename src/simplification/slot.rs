//! Symbolic stack slots for single-scan program rewriting.
//!
//! A rewrite pass replays the program's stack effect without computing
//! anything. Each logical stack value is either a bare leaf instruction or
//! the already-irreducible instruction sequence that produces it. When an
//! operator is reached its operand slots are inspected by the rules; if no
//! rule fires, the operands and the operator are concatenated back into a
//! single sequence slot.

use crate::evaluator::Instruction;

/// One logical value on the simulated stack.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    /// A bare `Input` or `Constant` instruction.
    Literal(Instruction),
    /// Instructions that together push exactly one value.
    Sequence(Vec<Instruction>),
}

impl Slot {
    /// Literal value if this slot is a bare `Constant`.
    #[inline]
    pub(crate) fn constant(&self) -> Option<f64> {
        match self {
            Slot::Literal(instr) => instr.as_constant(),
            Slot::Sequence(_) => None,
        }
    }

    /// True if this slot is a bare `Constant` numerically equal to `value`.
    #[inline]
    pub(crate) fn is_constant(&self, value: f64) -> bool {
        self.constant().is_some_and(|v| v == value)
    }

    /// Number of instructions this slot flattens to.
    pub(crate) fn len(&self) -> usize {
        match self {
            Slot::Literal(_) => 1,
            Slot::Sequence(seq) => seq.len(),
        }
    }

    /// Append this slot's instructions to `out`.
    pub(crate) fn flatten_into(self, out: &mut Vec<Instruction>) {
        match self {
            Slot::Literal(instr) => out.push(instr),
            Slot::Sequence(seq) => out.extend(seq),
        }
    }

    /// `operands[0] ++ operands[1] ++ ... ++ [op]` as one irreducible slot.
    ///
    /// The first operand's buffer is reused, so left-leaning chains grow in
    /// place.
    pub(crate) fn combine(operands: Vec<Slot>, op: Instruction) -> Slot {
        let rest = operands.iter().skip(1).map(Slot::len).sum::<usize>() + 1;
        let mut operands = operands.into_iter();
        let mut seq = match operands.next() {
            Some(Slot::Sequence(mut seq)) => {
                seq.reserve(rest);
                seq
            }
            Some(Slot::Literal(instr)) => {
                let mut seq = Vec::with_capacity(rest + 1);
                seq.push(instr);
                seq
            }
            None => Vec::with_capacity(rest),
        };
        for operand in operands {
            operand.flatten_into(&mut seq);
        }
        seq.push(op);
        Slot::Sequence(seq)
    }
}

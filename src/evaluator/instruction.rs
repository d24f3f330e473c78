//! Bytecode instruction definitions.
//!
//! One instruction per AST node. Operands travel on an implicit stack; only
//! `Input` and `Constant` carry an immediate.

use std::hash::{Hash, Hasher};

use crate::ast::{BinaryOp, UnaryOp};

/// Stack machine instruction.
///
/// Equality is structural, with `Constant` immediates compared by bit
/// pattern. A program containing a NaN literal therefore compares equal to
/// itself, which the optimizer's fixpoint check depends on.
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    /// Push `inputs[i]`
    Input(usize),
    /// Push a literal
    Constant(f64),

    // Binary operators: pop right, pop left, push result
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Min,
    Max,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,

    // Unary operators: pop one, push result
    Negate,
    Abs,
    Sqrt,
    Log,
    Exp,
    Sin,
    Cos,
    Tan,

    /// Pop false value, pop true value, pop condition, push the selected value
    Select,
}

impl Instruction {
    /// Instruction implementing `op`.
    pub const fn from_binary(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => Instruction::Add,
            BinaryOp::Subtract => Instruction::Subtract,
            BinaryOp::Multiply => Instruction::Multiply,
            BinaryOp::Divide => Instruction::Divide,
            BinaryOp::Power => Instruction::Power,
            BinaryOp::Min => Instruction::Min,
            BinaryOp::Max => Instruction::Max,
            BinaryOp::LessThan => Instruction::LessThan,
            BinaryOp::GreaterThan => Instruction::GreaterThan,
            BinaryOp::LessOrEqual => Instruction::LessOrEqual,
            BinaryOp::GreaterOrEqual => Instruction::GreaterOrEqual,
            BinaryOp::Equal => Instruction::Equal,
            BinaryOp::NotEqual => Instruction::NotEqual,
        }
    }

    /// Instruction implementing `op`.
    pub const fn from_unary(op: UnaryOp) -> Self {
        match op {
            UnaryOp::Negate => Instruction::Negate,
            UnaryOp::Abs => Instruction::Abs,
            UnaryOp::Sqrt => Instruction::Sqrt,
            UnaryOp::Log => Instruction::Log,
            UnaryOp::Exp => Instruction::Exp,
            UnaryOp::Sin => Instruction::Sin,
            UnaryOp::Cos => Instruction::Cos,
            UnaryOp::Tan => Instruction::Tan,
        }
    }

    /// The binary operator this instruction applies, if any.
    pub const fn as_binary(self) -> Option<BinaryOp> {
        Some(match self {
            Instruction::Add => BinaryOp::Add,
            Instruction::Subtract => BinaryOp::Subtract,
            Instruction::Multiply => BinaryOp::Multiply,
            Instruction::Divide => BinaryOp::Divide,
            Instruction::Power => BinaryOp::Power,
            Instruction::Min => BinaryOp::Min,
            Instruction::Max => BinaryOp::Max,
            Instruction::LessThan => BinaryOp::LessThan,
            Instruction::GreaterThan => BinaryOp::GreaterThan,
            Instruction::LessOrEqual => BinaryOp::LessOrEqual,
            Instruction::GreaterOrEqual => BinaryOp::GreaterOrEqual,
            Instruction::Equal => BinaryOp::Equal,
            Instruction::NotEqual => BinaryOp::NotEqual,
            _ => return None,
        })
    }

    /// The unary operator this instruction applies, if any.
    pub const fn as_unary(self) -> Option<UnaryOp> {
        Some(match self {
            Instruction::Negate => UnaryOp::Negate,
            Instruction::Abs => UnaryOp::Abs,
            Instruction::Sqrt => UnaryOp::Sqrt,
            Instruction::Log => UnaryOp::Log,
            Instruction::Exp => UnaryOp::Exp,
            Instruction::Sin => UnaryOp::Sin,
            Instruction::Cos => UnaryOp::Cos,
            Instruction::Tan => UnaryOp::Tan,
            _ => return None,
        })
    }

    /// Literal value if this is a `Constant`.
    #[inline]
    pub const fn as_constant(self) -> Option<f64> {
        match self {
            Instruction::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// True for `Input` and `Constant`.
    #[inline]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Instruction::Input(_) | Instruction::Constant(_))
    }

    /// Number of values popped.
    pub const fn arity(self) -> usize {
        match self {
            Instruction::Input(_) | Instruction::Constant(_) => 0,
            Instruction::Select => 3,
            other => {
                if other.as_binary().is_some() {
                    2
                } else {
                    1
                }
            }
        }
    }

    /// Mnemonic used in program listings.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Instruction::Input(_) => "input",
            Instruction::Constant(_) => "const",
            Instruction::Select => "select",
            other => match other.as_binary() {
                Some(op) => op.name(),
                None => match other.as_unary() {
                    Some(op) => op.name(),
                    None => "?",
                },
            },
        }
    }

    const fn discriminant(self) -> u8 {
        match self {
            Instruction::Input(_) => 0,
            Instruction::Constant(_) => 1,
            Instruction::Add => 2,
            Instruction::Subtract => 3,
            Instruction::Multiply => 4,
            Instruction::Divide => 5,
            Instruction::Power => 6,
            Instruction::Min => 7,
            Instruction::Max => 8,
            Instruction::LessThan => 9,
            Instruction::GreaterThan => 10,
            Instruction::LessOrEqual => 11,
            Instruction::GreaterOrEqual => 12,
            Instruction::Equal => 13,
            Instruction::NotEqual => 14,
            Instruction::Negate => 15,
            Instruction::Abs => 16,
            Instruction::Sqrt => 17,
            Instruction::Log => 18,
            Instruction::Exp => 19,
            Instruction::Sin => 20,
            Instruction::Cos => 21,
            Instruction::Tan => 22,
            Instruction::Select => 23,
        }
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Instruction::Input(a), Instruction::Input(b)) => a == b,
            (Instruction::Constant(a), Instruction::Constant(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a.discriminant() == b.discriminant(),
        }
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Instruction::Input(i) => i.hash(state),
            Instruction::Constant(v) => v.to_bits().hash(state),
            _ => {}
        }
    }
}

/// Highest `Input` slot referenced by a program.
pub fn max_input_index(program: &[Instruction]) -> Option<usize> {
    program
        .iter()
        .filter_map(|instr| match instr {
            Instruction::Input(i) => Some(*i),
            _ => None,
        })
        .max()
}

/// Deepest stack the program reaches, by static stack-effect simulation.
///
/// Malformed programs are measured as far as they go; underflow is clamped
/// at zero rather than reported. Use [`validate_program`](super::validate_program)
/// to reject them.
pub fn max_stack_depth(program: &[Instruction]) -> usize {
    let mut depth = 0_usize;
    let mut max_depth = 0_usize;
    for instr in program {
        depth = depth.saturating_sub(instr.arity()) + 1;
        max_depth = max_depth.max(depth);
    }
    max_depth
}

/// Number of instructions in a program.
#[inline]
pub const fn instruction_count(program: &[Instruction]) -> usize {
    program.len()
}

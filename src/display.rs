// Display formatting for expressions, instructions and GPU records
use std::fmt;

use crate::ast::{Expression, UnaryOp};
use crate::evaluator::Instruction;
use crate::gpu::{GpuRecord, Opcode};

/// Format a literal: integers without a trailing `.0`, IEEE specials by name.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        if n > 0.0 {
            write!(f, "Infinity")
        } else {
            write!(f, "-Infinity")
        }
    } else if n.fract() == 0.0 && n.abs() < 1e10 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Integral and below 1e10, so exactly representable as i64"
        )]
        let int = n as i64;
        if int == 0 && n.is_sign_negative() {
            write!(f, "-0")
        } else {
            write!(f, "{int}")
        }
    } else {
        write!(f, "{n}")
    }
}

enum Piece<'a> {
    Node(&'a Expression),
    Text(&'static str),
}

/// True when a leading `-` would run into the operand's own sign.
fn needs_parens_after_minus(operand: &Expression) -> bool {
    match operand {
        Expression::Unary(UnaryOp::Negate, _) => true,
        Expression::Constant(v) => v.is_sign_negative() && !v.is_nan(),
        _ => false,
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pieces are pushed in reverse of output order
        let mut work = vec![Piece::Node(self)];
        while let Some(piece) = work.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node) => node,
            };
            match node {
                Expression::Input(i) => write!(f, "input[{i}]")?,
                Expression::Constant(n) => write_number(f, *n)?,
                Expression::Binary(op, l, r) => {
                    work.push(Piece::Text(")"));
                    work.push(Piece::Node(r));
                    match op.symbol() {
                        Some(sym) => {
                            work.push(Piece::Text(" "));
                            work.push(Piece::Text(sym));
                            work.push(Piece::Text(" "));
                            f.write_str("(")?;
                        }
                        None => {
                            work.push(Piece::Text(", "));
                            f.write_str(op.name())?;
                            f.write_str("(")?;
                        }
                    }
                    work.push(Piece::Node(l));
                }
                Expression::Unary(UnaryOp::Negate, x) => {
                    if needs_parens_after_minus(x) {
                        f.write_str("-(")?;
                        work.push(Piece::Text(")"));
                    } else {
                        f.write_str("-")?;
                    }
                    work.push(Piece::Node(x));
                }
                Expression::Unary(op, x) => {
                    f.write_str(op.name())?;
                    f.write_str("(")?;
                    work.push(Piece::Text(")"));
                    work.push(Piece::Node(x));
                }
                Expression::Conditional(c, t, e) => {
                    f.write_str("(")?;
                    work.push(Piece::Text(")"));
                    work.push(Piece::Node(e));
                    work.push(Piece::Text(" : "));
                    work.push(Piece::Node(t));
                    work.push(Piece::Text(" ? "));
                    work.push(Piece::Node(c));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({self})")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Input(i) => write!(f, "input {i}"),
            Instruction::Constant(v) => {
                write!(f, "const ")?;
                write_number(f, *v)
            }
            other => write!(f, "{}", other.mnemonic()),
        }
    }
}

impl fmt::Display for GpuRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Opcode::from_i32(self.opcode).map_or("?", |op| op.name());
        write!(
            f,
            "{{ opcode: {:>2} ({name}), arg1: {}, arg2: {} }}",
            self.opcode, self.arg1, self.arg2
        )
    }
}

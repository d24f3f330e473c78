//! Expression compiler for the bytecode evaluator.
//!
//! This module linearizes an [`Expression`] tree into stack-machine
//! [`Instruction`]s in post-order: operands are emitted before their
//! operator, left operand before right. For a conditional the condition is
//! emitted first, then the true branch, then the false branch, then `Select`.
//!
//! # Stack Depth Tracking
//!
//! The compiler tracks the stack depth the emitted program will reach, so a
//! [`CompiledExpression`](super::CompiledExpression) can pre-size its stack
//! and the GPU encoder can check device limits without re-scanning.
//!
//! # Traversal
//!
//! Compilation keeps an explicit work list instead of recursing, so trees of
//! any depth compile without growing the native call stack.
//!
//! # Example
//!
//! ```
//! use mcexpr::{Expression, Instruction};
//! use mcexpr::evaluator::Compiler;
//!
//! let expr = Expression::input(0) - Expression::input(1);
//! let mut compiler = Compiler::new();
//! compiler.compile_expr(&expr);
//! let (program, max_stack) = compiler.into_parts();
//! assert_eq!(
//!     program,
//!     vec![Instruction::Input(0), Instruction::Input(1), Instruction::Subtract]
//! );
//! assert_eq!(max_stack, 2);
//! ```

use super::instruction::Instruction;
use crate::ast::Expression;

/// Pending step of the post-order walk.
enum Task<'a> {
    /// Lower this subtree.
    Visit(&'a Expression),
    /// All operands are on the stack; emit their operator.
    Emit(Instruction),
}

/// Internal compiler state for transforming expressions to bytecode.
///
/// A single pass over the tree emits instructions while tracking the
/// current and maximum stack depth of the program being produced.
#[derive(Debug, Default)]
pub struct Compiler {
    /// Emitted bytecode instructions
    instructions: Vec<Instruction>,
    /// Stack depth after the last emitted instruction
    current_stack: usize,
    /// Maximum stack depth seen during compilation
    max_stack: usize,
}

impl Compiler {
    /// Create an empty compiler.
    pub fn new() -> Self {
        Self {
            instructions: Vec::with_capacity(64),
            current_stack: 0,
            max_stack: 0,
        }
    }

    /// Emit an instruction, applying its stack effect.
    #[inline]
    fn emit(&mut self, instr: Instruction) {
        self.current_stack = self.current_stack.saturating_sub(instr.arity()) + 1;
        self.max_stack = self.max_stack.max(self.current_stack);
        self.instructions.push(instr);
    }

    /// Append the lowering of `expr` to the program.
    ///
    /// A structurally valid expression always compiles; input slots are not
    /// checked here (they are validated against the input vector at
    /// evaluation time).
    pub fn compile_expr(&mut self, expr: &Expression) {
        let mut work: Vec<Task<'_>> = vec![Task::Visit(expr)];

        while let Some(task) = work.pop() {
            match task {
                Task::Emit(instr) => self.emit(instr),
                Task::Visit(node) => match node {
                    Expression::Input(i) => self.emit(Instruction::Input(*i)),
                    Expression::Constant(v) => self.emit(Instruction::Constant(*v)),
                    Expression::Binary(op, l, r) => {
                        // Work list is LIFO: push in reverse of emission order
                        work.push(Task::Emit(Instruction::from_binary(*op)));
                        work.push(Task::Visit(r));
                        work.push(Task::Visit(l));
                    }
                    Expression::Unary(op, x) => {
                        work.push(Task::Emit(Instruction::from_unary(*op)));
                        work.push(Task::Visit(x));
                    }
                    Expression::Conditional(c, t, f) => {
                        work.push(Task::Emit(Instruction::Select));
                        work.push(Task::Visit(f));
                        work.push(Task::Visit(t));
                        work.push(Task::Visit(c));
                    }
                },
            }
        }
    }

    /// Get a reference to the emitted instructions.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Get the maximum stack depth seen during compilation.
    pub const fn max_stack(&self) -> usize {
        self.max_stack
    }

    /// Consume the compiler and return the program and its maximum stack depth.
    #[inline]
    pub fn into_parts(self) -> (Vec<Instruction>, usize) {
        (self.instructions, self.max_stack)
    }
}

/// Lower an expression tree to a stack program.
pub fn compile(expr: &Expression) -> Vec<Instruction> {
    let mut compiler = Compiler::new();
    compiler.compile_expr(expr);
    compiler.into_parts().0
}

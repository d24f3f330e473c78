//! Expression visitor pattern for AST traversal
//!
//! Provides a clean interface for walking the expression tree without
//! manually handling the recursive structure. The walk keeps its own work
//! list, so arbitrarily deep trees never exhaust the native call stack.

use crate::ast::{BinaryOp, Expression, UnaryOp};

/// Trait for visiting expression nodes in the AST
///
/// Each method returns a boolean indicating whether to continue visiting children.
///
/// # Example
/// ```
/// use mcexpr::visitor::{ExprVisitor, walk_expr};
/// use mcexpr::{BinaryOp, Expression, UnaryOp};
///
/// struct ConstantSum(f64);
///
/// impl ExprVisitor for ConstantSum {
///     fn visit_input(&mut self, _index: usize) -> bool { true }
///     fn visit_constant(&mut self, value: f64) -> bool { self.0 += value; true }
///     fn visit_binary(&mut self, _op: BinaryOp, _l: &Expression, _r: &Expression) -> bool { true }
///     fn visit_unary(&mut self, _op: UnaryOp, _x: &Expression) -> bool { true }
///     fn visit_conditional(&mut self, _c: &Expression, _t: &Expression, _f: &Expression) -> bool { true }
/// }
///
/// let expr = Expression::input(0) * 2.0 + 3.0;
/// let mut sum = ConstantSum(0.0);
/// walk_expr(&expr, &mut sum);
/// assert_eq!(sum.0, 5.0);
/// ```
pub trait ExprVisitor {
    /// Visit an input reference, returns true to continue visiting
    fn visit_input(&mut self, index: usize) -> bool;

    /// Visit a numeric literal, returns true to continue visiting
    fn visit_constant(&mut self, value: f64) -> bool;

    /// Visit a binary operation, returns true to visit operands
    fn visit_binary(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> bool;

    /// Visit a unary operation, returns true to visit the operand
    fn visit_unary(&mut self, op: UnaryOp, operand: &Expression) -> bool;

    /// Visit a conditional, returns true to visit condition and branches
    fn visit_conditional(
        &mut self,
        condition: &Expression,
        if_true: &Expression,
        if_false: &Expression,
    ) -> bool;
}

/// Walk an expression tree with a visitor
///
/// Visits nodes in pre-order (parent before children, left before right).
/// The visitor methods return true to continue walking children, false to skip.
pub fn walk_expr<V: ExprVisitor>(expr: &Expression, visitor: &mut V) {
    let mut work: Vec<&Expression> = vec![expr];
    while let Some(node) = work.pop() {
        match node {
            Expression::Input(i) => {
                visitor.visit_input(*i);
            }
            Expression::Constant(v) => {
                visitor.visit_constant(*v);
            }
            Expression::Binary(op, l, r) => {
                if visitor.visit_binary(*op, l, r) {
                    work.push(r);
                    work.push(l);
                }
            }
            Expression::Unary(op, x) => {
                if visitor.visit_unary(*op, x) {
                    work.push(x);
                }
            }
            Expression::Conditional(c, t, f) => {
                if visitor.visit_conditional(c, t, f) {
                    work.push(f);
                    work.push(t);
                    work.push(c);
                }
            }
        }
    }
}

/// A simple visitor that counts nodes
#[derive(Default)]
pub struct NodeCounter {
    /// All nodes, leaves included
    pub nodes: usize,
    /// `Binary`, `Unary` and `Conditional` nodes only
    pub operations: usize,
}

impl ExprVisitor for NodeCounter {
    fn visit_input(&mut self, _index: usize) -> bool {
        self.nodes += 1;
        true
    }

    fn visit_constant(&mut self, _value: f64) -> bool {
        self.nodes += 1;
        true
    }

    fn visit_binary(&mut self, _op: BinaryOp, _left: &Expression, _right: &Expression) -> bool {
        self.nodes += 1;
        self.operations += 1;
        true
    }

    fn visit_unary(&mut self, _op: UnaryOp, _operand: &Expression) -> bool {
        self.nodes += 1;
        self.operations += 1;
        true
    }

    fn visit_conditional(
        &mut self,
        _condition: &Expression,
        _if_true: &Expression,
        _if_false: &Expression,
    ) -> bool {
        self.nodes += 1;
        self.operations += 1;
        true
    }
}

/// A visitor that collects all referenced input slots
#[derive(Default)]
pub struct InputCollector {
    pub inputs: Vec<usize>,
}

impl InputCollector {
    /// Highest collected slot.
    pub fn max(&self) -> Option<usize> {
        self.inputs.iter().copied().max()
    }

    /// Collected slots, sorted and de-duplicated.
    pub fn into_sorted(mut self) -> Vec<usize> {
        self.inputs.sort_unstable();
        self.inputs.dedup();
        self.inputs
    }
}

impl ExprVisitor for InputCollector {
    fn visit_input(&mut self, index: usize) -> bool {
        self.inputs.push(index);
        true
    }

    fn visit_constant(&mut self, _value: f64) -> bool {
        true
    }

    fn visit_binary(&mut self, _op: BinaryOp, _left: &Expression, _right: &Expression) -> bool {
        true
    }

    fn visit_unary(&mut self, _op: UnaryOp, _operand: &Expression) -> bool {
        true
    }

    fn visit_conditional(
        &mut self,
        _condition: &Expression,
        _if_true: &Expression,
        _if_false: &Expression,
    ) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_counter() {
        let x = Expression::input(0);
        let expr = x.clone() + x.pow(2.0); // x + x^2 = 5 nodes, 2 operations
        let mut counter = NodeCounter::default();
        walk_expr(&expr, &mut counter);
        assert_eq!(counter.nodes, 5);
        assert_eq!(counter.operations, 2);
    }

    #[test]
    fn test_input_collector() {
        let expr = Expression::input(3) * Expression::input(1) - Expression::input(3);
        let mut collector = InputCollector::default();
        walk_expr(&expr, &mut collector);
        assert_eq!(collector.inputs, vec![3, 1, 3]);
        assert_eq!(collector.max(), Some(3));
        assert_eq!(collector.into_sorted(), vec![1, 3]);
    }

    #[test]
    fn test_walk_is_pre_order_left_to_right() {
        struct Trace(Vec<String>);

        impl ExprVisitor for Trace {
            fn visit_input(&mut self, index: usize) -> bool {
                self.0.push(format!("in{index}"));
                true
            }
            fn visit_constant(&mut self, value: f64) -> bool {
                self.0.push(format!("{value}"));
                true
            }
            fn visit_binary(&mut self, op: BinaryOp, _l: &Expression, _r: &Expression) -> bool {
                self.0.push(op.name().to_owned());
                true
            }
            fn visit_unary(&mut self, op: UnaryOp, _x: &Expression) -> bool {
                self.0.push(op.name().to_owned());
                true
            }
            fn visit_conditional(
                &mut self,
                _c: &Expression,
                _t: &Expression,
                _f: &Expression,
            ) -> bool {
                self.0.push("select".to_owned());
                true
            }
        }

        let expr = Expression::conditional(
            Expression::input(0),
            Expression::input(1) - 2.0,
            Expression::input(2).sqrt(),
        );
        let mut trace = Trace(Vec::new());
        walk_expr(&expr, &mut trace);
        assert_eq!(
            trace.0,
            vec!["select", "in0", "subtract", "in1", "2", "sqrt", "in2"]
        );
    }
}

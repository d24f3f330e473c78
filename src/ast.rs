//! Abstract Syntax Tree for simulation model expressions
//!
//! An [`Expression`] is a closed, immutable tree over simulation inputs and
//! numeric literals. Children are shared through [`Arc`], so the DSL can reuse
//! a subtree (a matrix element, a function argument) without copying it.

use std::sync::{Arc, LazyLock};

use crate::error::BuildError;
use crate::visitor::{ExprVisitor, InputCollector, NodeCounter, walk_expr};

/// Binary operators. Comparisons yield `1.0` for true and `0.0` for false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
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
}

impl BinaryOp {
    /// Every binary operator, in opcode order.
    pub const ALL: [BinaryOp; 13] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Power,
        BinaryOp::Min,
        BinaryOp::Max,
        BinaryOp::LessThan,
        BinaryOp::GreaterThan,
        BinaryOp::LessOrEqual,
        BinaryOp::GreaterOrEqual,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
    ];

    /// Lower-case name used in debug output.
    pub const fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Power => "power",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::LessThan => "lessThan",
            BinaryOp::GreaterThan => "greaterThan",
            BinaryOp::LessOrEqual => "lessOrEqual",
            BinaryOp::GreaterOrEqual => "greaterOrEqual",
            BinaryOp::Equal => "equal",
            BinaryOp::NotEqual => "notEqual",
        }
    }

    /// Infix symbol, or `None` for operators rendered in call form (`min`, `max`).
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            BinaryOp::Add => Some("+"),
            BinaryOp::Subtract => Some("-"),
            BinaryOp::Multiply => Some("*"),
            BinaryOp::Divide => Some("/"),
            BinaryOp::Power => Some("^"),
            BinaryOp::Min | BinaryOp::Max => None,
            BinaryOp::LessThan => Some("<"),
            BinaryOp::GreaterThan => Some(">"),
            BinaryOp::LessOrEqual => Some("<="),
            BinaryOp::GreaterOrEqual => Some(">="),
            BinaryOp::Equal => Some("=="),
            BinaryOp::NotEqual => Some("!="),
        }
    }

    /// True for the six relational operators.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::GreaterThan
                | BinaryOp::LessOrEqual
                | BinaryOp::GreaterOrEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }

    /// True when swapping the operands never changes the result.
    pub const fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Multiply
                | BinaryOp::Min
                | BinaryOp::Max
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Abs,
    Sqrt,
    /// Natural logarithm
    Log,
    Exp,
    Sin,
    Cos,
    Tan,
}

impl UnaryOp {
    /// Every unary operator, in opcode order.
    pub const ALL: [UnaryOp; 8] = [
        UnaryOp::Negate,
        UnaryOp::Abs,
        UnaryOp::Sqrt,
        UnaryOp::Log,
        UnaryOp::Exp,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
    ];

    /// Lower-case name, also used as the call form in debug output.
    pub const fn name(self) -> &'static str {
        match self {
            UnaryOp::Negate => "negate",
            UnaryOp::Abs => "abs",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Log => "log",
            UnaryOp::Exp => "exp",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
        }
    }
}

/// Expression tree over simulation inputs.
///
/// Equality is structural. Two trees built independently through the DSL
/// compare equal when they have the same shape, operators and literals.
///
/// Equality, formatting, rewriting and dropping all walk the tree with an
/// explicit work-list, so a left-folded sum over 100k inputs is as safe as a
/// shallow tree.
#[derive(Clone)]
pub enum Expression {
    /// Reference to the i-th simulation input.
    Input(usize),
    /// Numeric literal.
    Constant(f64),
    /// `left op right`
    Binary(BinaryOp, Arc<Expression>, Arc<Expression>),
    /// `op(operand)`
    Unary(UnaryOp, Arc<Expression>),
    /// `condition != 0 ? if_true : if_false`
    Conditional(Arc<Expression>, Arc<Expression>, Arc<Expression>),
}

impl Expression {
    // Constructors

    /// Reference input slot `index`.
    #[inline]
    #[must_use]
    pub const fn input(index: usize) -> Self {
        Expression::Input(index)
    }

    /// Numeric literal.
    #[inline]
    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Expression::Constant(value)
    }

    /// Binary node.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary(op, Arc::new(left), Arc::new(right))
    }

    /// Unary node.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary(op, Arc::new(operand))
    }

    /// Ternary select: `if_true` when `condition` is non-zero, else `if_false`.
    ///
    /// Both branches are always evaluated by the stack machine; only the
    /// result is selected.
    #[must_use]
    pub fn conditional(condition: Expression, if_true: Expression, if_false: Expression) -> Self {
        Expression::Conditional(Arc::new(condition), Arc::new(if_true), Arc::new(if_false))
    }

    // Accessors

    /// Literal value if this node is a `Constant`.
    #[inline]
    pub const fn as_constant(&self) -> Option<f64> {
        match self {
            Expression::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// Input slot if this node is an `Input`.
    #[inline]
    pub const fn as_input(&self) -> Option<usize> {
        match self {
            Expression::Input(i) => Some(*i),
            _ => None,
        }
    }

    // Analysis

    /// Highest referenced input slot, or `None` if the tree references no input.
    pub fn max_input_index(&self) -> Option<usize> {
        let mut collector = InputCollector::default();
        walk_expr(self, &mut collector);
        collector.max()
    }

    /// Sorted, de-duplicated list of referenced input slots.
    pub fn inputs(&self) -> Vec<usize> {
        let mut collector = InputCollector::default();
        walk_expr(self, &mut collector);
        collector.into_sorted()
    }

    /// Minimum input vector length needed to evaluate this tree.
    pub fn required_inputs(&self) -> usize {
        self.max_input_index().map_or(0, |i| i + 1)
    }

    /// Number of `Binary`, `Unary` and `Conditional` nodes.
    pub fn operation_count(&self) -> usize {
        let mut counter = NodeCounter::default();
        walk_expr(self, &mut counter);
        counter.operations
    }

    /// Total number of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        let mut counter = NodeCounter::default();
        walk_expr(self, &mut counter);
        counter.nodes
    }

    /// True iff no `Input` node is reachable.
    pub fn is_constant(&self) -> bool {
        struct InputFinder {
            found: bool,
        }

        impl ExprVisitor for InputFinder {
            fn visit_input(&mut self, _index: usize) -> bool {
                self.found = true;
                false
            }
            fn visit_constant(&mut self, _value: f64) -> bool {
                !self.found
            }
            fn visit_binary(&mut self, _op: BinaryOp, _l: &Expression, _r: &Expression) -> bool {
                !self.found
            }
            fn visit_unary(&mut self, _op: UnaryOp, _operand: &Expression) -> bool {
                !self.found
            }
            fn visit_conditional(
                &mut self,
                _condition: &Expression,
                _if_true: &Expression,
                _if_false: &Expression,
            ) -> bool {
                !self.found
            }
        }

        let mut finder = InputFinder { found: false };
        walk_expr(self, &mut finder);
        !finder.found
    }

    /// Length of the longest root-to-leaf path (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut work: Vec<(&Expression, usize)> = vec![(self, 1)];
        while let Some((node, depth)) = work.pop() {
            max_depth = max_depth.max(depth);
            match node {
                Expression::Input(_) | Expression::Constant(_) => {}
                Expression::Binary(_, l, r) => {
                    work.push((l, depth + 1));
                    work.push((r, depth + 1));
                }
                Expression::Unary(_, x) => work.push((x, depth + 1)),
                Expression::Conditional(c, t, f) => {
                    work.push((c, depth + 1));
                    work.push((t, depth + 1));
                    work.push((f, depth + 1));
                }
            }
        }
        max_depth
    }

    // Rewriting

    /// Replace every `Input(i)` with `args[i]`.
    ///
    /// This is the inlining step behind reusable functions: the template's
    /// input slots act as formal parameters. The rebuild is post-order over
    /// an explicit work-list.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnboundInput`] if the tree references a slot
    /// `i >= args.len()`.
    pub fn substitute_inputs(&self, args: &[Expression]) -> Result<Expression, BuildError> {
        enum Task<'a> {
            Visit(&'a Expression),
            Rebuild(&'a Expression),
        }

        let mut work: Vec<Task<'_>> = vec![Task::Visit(self)];
        let mut built: Vec<Arc<Expression>> = Vec::new();

        while let Some(task) = work.pop() {
            match task {
                Task::Visit(node) => match node {
                    Expression::Input(i) => {
                        let arg = args.get(*i).ok_or(BuildError::UnboundInput {
                            index: *i,
                            arity: args.len(),
                        })?;
                        built.push(Arc::new(arg.clone()));
                    }
                    Expression::Constant(v) => built.push(Arc::new(Expression::Constant(*v))),
                    Expression::Binary(_, l, r) => {
                        work.push(Task::Rebuild(node));
                        work.push(Task::Visit(r));
                        work.push(Task::Visit(l));
                    }
                    Expression::Unary(_, x) => {
                        work.push(Task::Rebuild(node));
                        work.push(Task::Visit(x));
                    }
                    Expression::Conditional(c, t, f) => {
                        work.push(Task::Rebuild(node));
                        work.push(Task::Visit(f));
                        work.push(Task::Visit(t));
                        work.push(Task::Visit(c));
                    }
                },
                Task::Rebuild(node) => {
                    let operands = built.split_off(built.len().saturating_sub(node.child_count()));
                    let rebuilt = match (node, operands.as_slice()) {
                        (Expression::Binary(op, ..), [l, r]) => {
                            Expression::Binary(*op, Arc::clone(l), Arc::clone(r))
                        }
                        (Expression::Unary(op, _), [x]) => Expression::Unary(*op, Arc::clone(x)),
                        (Expression::Conditional(..), [c, t, f]) => {
                            Expression::Conditional(Arc::clone(c), Arc::clone(t), Arc::clone(f))
                        }
                        _ => {
                            debug_assert!(false, "rebuild of {node} without its operands");
                            node.clone()
                        }
                    };
                    built.push(Arc::new(rebuilt));
                }
            }
        }

        Ok(built.pop().map_or_else(|| self.clone(), Arc::unwrap_or_clone))
    }

    /// Number of direct children.
    const fn child_count(&self) -> usize {
        match self {
            Expression::Input(_) | Expression::Constant(_) => 0,
            Expression::Unary(..) => 1,
            Expression::Binary(..) => 2,
            Expression::Conditional(..) => 3,
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        let mut work: Vec<(&Expression, &Expression)> = vec![(self, other)];
        while let Some(pair) = work.pop() {
            match pair {
                (Expression::Input(a), Expression::Input(b)) if a == b => {}
                (Expression::Constant(a), Expression::Constant(b)) if a == b => {}
                (Expression::Binary(op_a, la, ra), Expression::Binary(op_b, lb, rb))
                    if op_a == op_b =>
                {
                    work.push((&**ra, &**rb));
                    work.push((&**la, &**lb));
                }
                (Expression::Unary(op_a, xa), Expression::Unary(op_b, xb)) if op_a == op_b => {
                    work.push((&**xa, &**xb));
                }
                (Expression::Conditional(ca, ta, fa), Expression::Conditional(cb, tb, fb)) => {
                    work.push((&**fa, &**fb));
                    work.push((&**ta, &**tb));
                    work.push((&**ca, &**cb));
                }
                _ => return false,
            }
        }
        true
    }
}

/// Stand-in left in a detached child slot while a tree is torn down.
static DETACHED: LazyLock<Arc<Expression>> =
    LazyLock::new(|| Arc::new(Expression::Constant(0.0)));

/// Move every uniquely owned interior child of `node` onto `pending`.
///
/// Shared children stay in place: dropping them only decrements a count.
fn detach_children(node: &mut Expression, pending: &mut Vec<Arc<Expression>>) {
    let mut detach = |slot: &mut Arc<Expression>| {
        if Arc::get_mut(slot).is_some_and(|child| child.child_count() > 0) {
            pending.push(std::mem::replace(slot, Arc::clone(&DETACHED)));
        }
    };
    match node {
        Expression::Input(_) | Expression::Constant(_) => {}
        Expression::Binary(_, l, r) => {
            detach(l);
            detach(r);
        }
        Expression::Unary(_, x) => detach(x),
        Expression::Conditional(c, t, f) => {
            detach(c);
            detach(t);
            detach(f);
        }
    }
}

impl Drop for Expression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        // Each popped node is emptied before it drops, so drop never nests
        while let Some(mut child) = pending.pop() {
            if let Some(node) = Arc::get_mut(&mut child) {
                detach_children(node, &mut pending);
            }
        }
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Constant(value)
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::Constant(f64::from(value))
    }
}

impl From<&Expression> for Expression {
    fn from(expr: &Expression) -> Self {
        expr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(i: usize) -> Expression {
        Expression::input(i)
    }

    fn c(v: f64) -> Expression {
        Expression::constant(v)
    }

    #[test]
    fn test_max_input_index() {
        assert_eq!(c(1.0).max_input_index(), None);
        assert_eq!(input(3).max_input_index(), Some(3));

        let expr = Expression::binary(
            BinaryOp::Add,
            input(2),
            Expression::unary(UnaryOp::Sqrt, input(7)),
        );
        assert_eq!(expr.max_input_index(), Some(7));
        assert_eq!(expr.required_inputs(), 8);
        assert_eq!(expr.inputs(), vec![2, 7]);
    }

    #[test]
    fn test_operation_count_ignores_leaves() {
        assert_eq!(input(0).operation_count(), 0);

        // (x0 + 1) > 2 ? -x1 : 3
        let expr = Expression::conditional(
            Expression::binary(
                BinaryOp::GreaterThan,
                Expression::binary(BinaryOp::Add, input(0), c(1.0)),
                c(2.0),
            ),
            Expression::unary(UnaryOp::Negate, input(1)),
            c(3.0),
        );
        assert_eq!(expr.operation_count(), 4);
        assert_eq!(expr.node_count(), 9);
        assert_eq!(expr.depth(), 4);
    }

    #[test]
    fn test_is_constant() {
        assert!(c(2.0).is_constant());
        assert!(Expression::binary(BinaryOp::Power, c(2.0), c(3.0)).is_constant());
        assert!(!Expression::binary(BinaryOp::Power, c(2.0), input(0)).is_constant());
        assert!(
            !Expression::conditional(c(1.0), c(2.0), Expression::unary(UnaryOp::Exp, input(4)))
                .is_constant()
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = Expression::binary(BinaryOp::Subtract, input(0), input(1));
        let b = Expression::binary(BinaryOp::Subtract, input(0), input(1));
        let swapped = Expression::binary(BinaryOp::Subtract, input(1), input(0));
        assert_eq!(a, b);
        assert_ne!(a, swapped);
    }

    #[test]
    fn test_substitute_inputs() {
        // template: in0 * in1 + in0
        let template = Expression::binary(
            BinaryOp::Add,
            Expression::binary(BinaryOp::Multiply, input(0), input(1)),
            input(0),
        );
        let result = template
            .substitute_inputs(&[input(5), c(2.0)])
            .expect("both slots are bound");
        let expected = Expression::binary(
            BinaryOp::Add,
            Expression::binary(BinaryOp::Multiply, input(5), c(2.0)),
            input(5),
        );
        assert_eq!(result, expected);
    }

    #[test]
    fn test_substitute_unbound_input() {
        let template = Expression::binary(BinaryOp::Add, input(0), input(2));
        let err = template.substitute_inputs(&[c(1.0)]).unwrap_err();
        assert_eq!(err, BuildError::UnboundInput { index: 2, arity: 1 });
    }

    #[test]
    fn test_deep_tree_analysis_does_not_recurse() {
        let mut expr = input(0);
        for i in 0..20_000 {
            expr = Expression::binary(BinaryOp::Add, expr, c(f64::from(i)));
        }
        assert_eq!(expr.operation_count(), 20_000);
        assert_eq!(expr.max_input_index(), Some(0));
        assert_eq!(expr.depth(), 20_001);
        assert!(!expr.is_constant());
    }

    fn left_chain(depth: usize) -> Expression {
        let mut expr = input(0);
        for _ in 0..depth {
            expr = Expression::binary(BinaryOp::Add, expr, input(1));
        }
        expr
    }

    #[test]
    fn test_deep_tree_drops_without_overflow() {
        drop(left_chain(100_000));

        // Right-leaning and unary chains too
        let mut expr = input(0);
        for _ in 0..100_000 {
            expr = Expression::unary(
                UnaryOp::Negate,
                Expression::binary(BinaryOp::Multiply, c(2.0), expr),
            );
        }
        drop(expr);
    }

    #[test]
    fn test_deep_tree_with_shared_subtree_drops_cleanly() {
        let shared = left_chain(100_000);
        let both = Expression::binary(BinaryOp::Add, shared.clone(), shared.clone());
        drop(both);
        // The surviving handle still owns an intact tree
        assert_eq!(shared.depth(), 100_001);
        drop(shared);
    }

    #[test]
    fn test_deep_tree_equality_and_substitution() {
        let a = left_chain(100_000);
        let b = left_chain(100_000);
        assert_eq!(a, b);
        assert_ne!(a, left_chain(99_999));

        let substituted = a.substitute_inputs(&[c(1.0), input(7)]).unwrap();
        assert_eq!(substituted.depth(), 100_001);
        assert_eq!(substituted.inputs(), vec![7]);
    }

    #[test]
    fn test_equality_keeps_nan_semantics() {
        let nan = c(f64::NAN);
        assert_ne!(nan, nan.clone());
        assert_eq!(c(0.0), c(-0.0));
    }

    #[test]
    fn test_substitution_outlives_template() {
        let template = Expression::unary(UnaryOp::Sqrt, input(0));
        let first = template.substitute_inputs(&[c(4.0)]).unwrap();
        drop(template);
        assert_eq!(first, Expression::unary(UnaryOp::Sqrt, c(4.0)));
    }
}

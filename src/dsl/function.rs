//! Reusable expression templates.
//!
//! A function is a template expression plus a declared arity; the
//! template's `Input(i)` nodes are its formal parameters. Calling it inlines
//! the template with every `Input(i)` replaced by the i-th argument. There
//! is no runtime call: the compiled program only ever sees the expanded tree.

use rustc_hash::FxHashMap;

use crate::ast::Expression;
use crate::error::BuildError;

/// Named template with a fixed number of parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunction {
    name: String,
    arity: usize,
    template: Expression,
}

impl ExprFunction {
    /// Define a function.
    ///
    /// # Errors
    ///
    /// [`BuildError::TemplateInputOutOfRange`] if the template references a
    /// parameter slot `>= arity`.
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        template: Expression,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        if let Some(index) = template.max_input_index().filter(|&i| i >= arity) {
            return Err(BuildError::TemplateInputOutOfRange { name, index, arity });
        }
        Ok(Self {
            name,
            arity,
            template,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn arity(&self) -> usize {
        self.arity
    }

    pub const fn template(&self) -> &Expression {
        &self.template
    }

    /// Inline the template with `args` bound to its parameters.
    ///
    /// # Errors
    ///
    /// [`BuildError::ArityMismatch`] unless exactly `arity` arguments are supplied.
    ///
    /// # Example
    ///
    /// ```
    /// use mcexpr::{Expression, ExprFunction};
    ///
    /// // margin(revenue, cost) = (revenue - cost) / revenue
    /// let margin = ExprFunction::new(
    ///     "margin",
    ///     2,
    ///     (Expression::input(0) - Expression::input(1)) / Expression::input(0),
    /// )
    /// .expect("template fits arity");
    ///
    /// let expr = margin
    ///     .call(&[Expression::input(3), Expression::input(4) * 1.1])
    ///     .expect("two arguments");
    /// assert_eq!(expr.max_input_index(), Some(4));
    /// ```
    pub fn call(&self, args: &[Expression]) -> Result<Expression, BuildError> {
        if args.len() != self.arity {
            return Err(BuildError::ArityMismatch {
                name: self.name.clone(),
                expected: self.arity,
                got: args.len(),
            });
        }
        self.template.substitute_inputs(args)
    }
}

/// Functions addressable by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, ExprFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function.
    ///
    /// # Errors
    ///
    /// [`BuildError::DuplicateFunction`] if the name is taken.
    pub fn register(&mut self, function: ExprFunction) -> Result<(), BuildError> {
        if self.functions.contains_key(function.name()) {
            return Err(BuildError::DuplicateFunction(function.name.clone()));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    /// Define and register in one step.
    ///
    /// # Errors
    ///
    /// See [`ExprFunction::new`] and [`FunctionRegistry::register`].
    pub fn define(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        template: Expression,
    ) -> Result<(), BuildError> {
        self.register(ExprFunction::new(name, arity, template)?)
    }

    pub fn get(&self, name: &str) -> Option<&ExprFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call a registered function by name.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnknownFunction`] or any error of [`ExprFunction::call`].
    pub fn call(&self, name: &str, args: &[Expression]) -> Result<Expression, BuildError> {
        self.get(name)
            .ok_or_else(|| BuildError::UnknownFunction(name.to_owned()))?
            .call(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, evaluate};

    fn eval(expr: &Expression, inputs: &[f64]) -> f64 {
        evaluate(&compile(expr), inputs).unwrap()
    }

    fn growth() -> ExprFunction {
        // base * (1 + rate)
        ExprFunction::new("growth", 2, Expression::input(0) * (1.0 + Expression::input(1))).unwrap()
    }

    #[test]
    fn test_call_substitutes_arguments() {
        let f = growth();
        let expr = f
            .call(&[Expression::input(5), Expression::constant(0.1)])
            .unwrap();
        assert_eq!(
            expr,
            Expression::input(5) * (1.0 + Expression::constant(0.1))
        );
        assert!((eval(&expr, &[0.0, 0.0, 0.0, 0.0, 0.0, 100.0]) - 110.0).abs() < 1e-12);
    }

    #[test]
    fn test_calls_compose() {
        let f = growth();
        let once = f.call(&[Expression::input(0), Expression::input(1)]).unwrap();
        let twice = f.call(&[once, Expression::input(1)]).unwrap();
        assert_eq!(eval(&twice, &[100.0, 0.5]), 225.0);
    }

    #[test]
    fn test_arity_mismatch_is_an_error() {
        let f = growth();
        assert_eq!(
            f.call(&[Expression::input(0)]),
            Err(BuildError::ArityMismatch {
                name: "growth".into(),
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_template_must_fit_arity() {
        assert_eq!(
            ExprFunction::new("bad", 1, Expression::input(0) + Expression::input(2)),
            Err(BuildError::TemplateInputOutOfRange {
                name: "bad".into(),
                index: 2,
                arity: 1
            })
        );
        // Zero-arity constants are fine
        let pi = ExprFunction::new("pi", 0, Expression::constant(std::f64::consts::PI)).unwrap();
        assert_eq!(pi.call(&[]).unwrap(), Expression::constant(std::f64::consts::PI));
    }

    #[test]
    fn test_registry() {
        let mut registry = FunctionRegistry::new();
        registry.register(growth()).unwrap();
        registry
            .define("spread", 2, Expression::input(0) - Expression::input(1))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["growth", "spread"]);
        assert_eq!(
            registry.register(growth()),
            Err(BuildError::DuplicateFunction("growth".into()))
        );
        assert_eq!(
            registry.call("missing", &[]),
            Err(BuildError::UnknownFunction("missing".into()))
        );

        let expr = registry
            .call("spread", &[Expression::input(1), Expression::input(0)])
            .unwrap();
        assert_eq!(eval(&expr, &[10.0, 3.0]), -7.0);
    }
}

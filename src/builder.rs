//! Builder pattern API for the compile/optimize/encode pipeline
//!
//! Provides a fluent interface for configuring how an expression becomes a
//! cached [`CompiledExpression`].
//!
//! # Example
//! ```
//! use mcexpr::{Expression, GpuLimits, Pipeline};
//!
//! let x = Expression::input(0);
//! let compiled = Pipeline::new()
//!     .max_passes(4)
//!     .gpu_limits(GpuLimits::metal_default())
//!     .validate_gpu(true)
//!     .build(&(x * 1.0 + 0.0))?;
//!
//! assert_eq!(compiled.instruction_count(), 1);
//! # Ok::<(), mcexpr::PipelineError>(())
//! ```

use tracing::debug;

use crate::ast::Expression;
use crate::dsl::FunctionRegistry;
use crate::error::PipelineError;
use crate::evaluator::{CompiledExpression, compile};
use crate::gpu::GpuLimits;
use crate::simplification::{OPTIMIZER_MAX_PASSES, Optimizer};

/// Builder for model construction
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    optimize: bool,
    max_passes: usize,
    gpu_limits: GpuLimits,
    validate_gpu: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            optimize: true,
            max_passes: OPTIMIZER_MAX_PASSES,
            gpu_limits: GpuLimits::metal_default(),
            validate_gpu: false,
        }
    }
}

impl Pipeline {
    /// Create a pipeline with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the optimizer (enabled by default)
    pub const fn optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    /// Set the optimizer iteration cap
    pub const fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    /// Set the device limits checked when GPU validation is on
    pub const fn gpu_limits(mut self, limits: GpuLimits) -> Self {
        self.gpu_limits = limits;
        self
    }

    /// Reject programs that do not fit the device limits (off by default)
    pub const fn validate_gpu(mut self, enabled: bool) -> Self {
        self.validate_gpu = enabled;
        self
    }

    /// Compile, optimize and encode an expression.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyProgram`] / [`PipelineError::MalformedProgram`]
    ///   if the final program would not evaluate to exactly one value
    /// - [`PipelineError::GpuLimitExceeded`] if GPU validation is on and the
    ///   program does not fit, or an input index does not fit a record
    /// - [`PipelineError::InexactGpuConstant`] if GPU validation is on and a
    ///   literal would lose precision in its record
    pub fn build(&self, expr: &Expression) -> Result<CompiledExpression, PipelineError> {
        let raw = compile(expr);
        let raw_len = raw.len();

        let (program, outcome) = if self.optimize {
            let report = Optimizer::new().with_max_passes(self.max_passes).run(&raw);
            (report.program, Some(report.outcome))
        } else {
            (raw, None)
        };

        let compiled =
            CompiledExpression::from_parts(raw_len, program, expr.max_input_index(), outcome)?;
        if self.validate_gpu {
            compiled.gpu().validate(&self.gpu_limits)?;
        }

        debug!(
            raw = raw_len,
            optimized = compiled.instruction_count(),
            max_stack = compiled.max_stack_depth(),
            required_inputs = compiled.required_inputs(),
            passes = outcome.map_or(0, |o| o.passes()),
            "built expression"
        );
        Ok(compiled)
    }

    /// Expand a registered function and build the result.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Build`] if the call cannot be expanded, otherwise as
    /// [`Pipeline::build`].
    pub fn build_call(
        &self,
        registry: &FunctionRegistry,
        name: &str,
        args: &[Expression],
    ) -> Result<CompiledExpression, PipelineError> {
        let expr = registry.call(name, args)?;
        self.build(&expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::evaluator::Instruction;
    use crate::simplification::OptimizationOutcome;

    #[test]
    fn test_defaults_optimize() {
        let expr = Expression::constant(5.0) + Expression::constant(3.0);
        let compiled = Pipeline::new().build(&expr).unwrap();
        assert_eq!(compiled.instructions(), &[Instruction::Constant(8.0)]);
        assert_eq!(
            compiled.outcome(),
            Some(OptimizationOutcome::Converged { passes: 2 })
        );
    }

    #[test]
    fn test_optimizer_can_be_disabled() {
        let expr = Expression::input(0) * 1.0;
        let compiled = Pipeline::new().optimize(false).build(&expr).unwrap();
        assert_eq!(compiled.instruction_count(), 3);
        assert_eq!(compiled.outcome(), None);
        assert_eq!(compiled.evaluate(&[4.0]), Ok(4.0));
    }

    #[test]
    fn test_pass_cap_is_forwarded() {
        let expr = Expression::constant(1.0) + Expression::constant(1.0);
        let compiled = Pipeline::new().max_passes(1).build(&expr).unwrap();
        assert_eq!(
            compiled.outcome(),
            Some(OptimizationOutcome::MaxPassesReached { passes: 1 })
        );
    }

    #[test]
    fn test_gpu_validation_is_opt_in() {
        let wide = Expression::input(40) + 1.0;
        assert!(Pipeline::new().build(&wide).is_ok());
        assert_eq!(
            Pipeline::new().validate_gpu(true).build(&wide).unwrap_err(),
            PipelineError::GpuLimitExceeded {
                what: "input count",
                value: 41,
                limit: 32
            }
        );

        let tight = GpuLimits {
            max_inputs: 32,
            max_stack: 1,
            max_ops: 128,
        };
        let deep = Expression::input(0) + Expression::input(1);
        assert!(matches!(
            Pipeline::new().gpu_limits(tight).validate_gpu(true).build(&deep),
            Err(PipelineError::GpuLimitExceeded { what: "stack depth", .. })
        ));
    }

    #[test]
    fn test_gpu_validation_rejects_inexact_literals() {
        let markup = Expression::input(0) * 1.1;
        let compiled = Pipeline::new().build(&markup).unwrap();
        assert_ne!(compiled.gpu().replay(&[100.0]), compiled.evaluate(&[100.0]));
        assert_eq!(
            Pipeline::new().validate_gpu(true).build(&markup).unwrap_err(),
            PipelineError::InexactGpuConstant { pc: 1, value: 1.1 }
        );

        // A literal that only appears before folding is judged after it
        let halves = Expression::input(0) * (Expression::constant(0.1) + 0.4);
        let compiled = Pipeline::new().validate_gpu(true).build(&halves).unwrap();
        assert_eq!(compiled.gpu().replay(&[3.0]), compiled.evaluate(&[3.0]));
    }

    #[test]
    fn test_build_call() {
        let mut registry = FunctionRegistry::new();
        registry
            .define("excess", 2, (Expression::input(0) - Expression::input(1)).max(0.0))
            .unwrap();

        let compiled = Pipeline::new()
            .build_call(&registry, "excess", &[Expression::input(1), Expression::constant(10.0)])
            .unwrap();
        assert_eq!(compiled.evaluate(&[0.0, 25.0]), Ok(15.0));

        assert_eq!(
            Pipeline::new()
                .build_call(&registry, "excess", &[])
                .unwrap_err(),
            PipelineError::Build(BuildError::ArityMismatch {
                name: "excess".into(),
                expected: 2,
                got: 0
            })
        );
    }
}

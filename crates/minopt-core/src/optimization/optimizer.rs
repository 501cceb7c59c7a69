//! Core optimizer traits and types for unconstrained minimization.
//!
//! This module provides the abstractions shared by every optimization
//! algorithm in the workspace: the result of a run, the reason it stopped,
//! the stopping criterion supplied by the caller and the [`Optimizer`] trait.
//!
//! # Optimization Framework
//!
//! Minimization of a smooth `f: R^n -> R` follows this general structure:
//!
//! 1. **Initialization**: Start with `x₀` supplied by the caller
//! 2. **Gradient computation**: Compute `∇f(xₖ)` and test `‖∇f(xₖ)‖ < ε_grad`
//! 3. **Step computation**: Line search along a descent direction, or
//!    approximate minimization of a local model inside a trust region
//! 4. **Update**: Overwrite the caller's iterate with the accepted point
//! 5. **Budget**: Stop when the iteration or evaluation budget is exhausted
//!
//! # Iteration budget
//!
//! `StoppingCriterion::max_iterations == None` means "run until convergence".
//! Optimizers still bound such runs by [`UNBOUNDED_ITERATION_CAP`] so that a
//! stagnating run always returns.
//!
//! # Examples
//!
//! ```rust
//! # use minopt_core::prelude::*;
//! let criterion = StoppingCriterion::<f64>::new()
//!     .with_gradient_tolerance(1e-8)
//!     .with_max_iterations(500);
//!
//! assert_eq!(criterion.iteration_limit(), 500);
//! assert_eq!(
//!     StoppingCriterion::<f64>::new().run_to_convergence().iteration_limit(),
//!     UNBOUNDED_ITERATION_CAP
//! );
//! ```

use crate::{
    error::Result,
    types::{DVector, Scalar},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// Iteration cap applied when the caller asks to run until convergence.
pub const UNBOUNDED_ITERATION_CAP: usize = 100_000;

/// Result of an optimization run.
///
/// # Computational Diagnostics
///
/// - **Function evaluations**: Total calls to `f(x)`
/// - **Gradient evaluations**: Total calls to `∇f(x)`
/// - **Hessian evaluations**: Total calls to the Hessian approximation
/// - **Duration**: Wall-clock time for the run
/// - **Iterations**: Number of completed iterations
#[derive(Debug, Clone)]
pub struct OptimizationResult<T>
where
    T: Scalar,
{
    /// The final iterate
    pub point: DVector<T>,

    /// The objective value at the final iterate
    pub value: T,

    /// Gradient norm at the final iterate (if computed)
    pub gradient_norm: Option<T>,

    /// Number of completed iterations
    pub iterations: usize,

    /// Number of objective evaluations
    pub function_evaluations: usize,

    /// Number of gradient evaluations
    pub gradient_evaluations: usize,

    /// Number of Hessian evaluations
    pub hessian_evaluations: usize,

    /// Wall-clock time elapsed during optimization
    pub duration: Duration,

    /// Why the run stopped
    pub termination_reason: TerminationReason,

    /// True only when the gradient tolerance was met
    pub converged: bool,
}

impl<T> OptimizationResult<T>
where
    T: Scalar,
{
    /// Creates a new optimization result.
    pub fn new(
        point: DVector<T>,
        value: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            point,
            value,
            gradient_norm: None,
            iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            hessian_evaluations: 0,
            duration,
            termination_reason,
            converged: termination_reason.is_converged(),
        }
    }

    /// Sets the gradient norm at the final point.
    pub fn with_gradient_norm(mut self, norm: T) -> Self {
        self.gradient_norm = Some(norm);
        self
    }

    /// Copies all evaluation counts from `counts`.
    pub fn with_counts(mut self, counts: EvaluationCounts) -> Self {
        self.function_evaluations = counts.function;
        self.gradient_evaluations = counts.gradient;
        self.hessian_evaluations = counts.hessian;
        self
    }



}

/// Reasons an optimization run stops.
///
/// None of these is an error: a run that exhausts its budget or stagnates
/// still returns its best point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// Gradient norm fell below the tolerance: ‖∇f(x)‖ < ε_grad
    Converged,
    /// Maximum iteration count exhausted without convergence
    MaxIterations,
    /// Function evaluation budget exhausted
    MaxFunctionEvaluations,
    /// Line search failed twice in a row, the second time along steepest descent
    LineSearchFailed,
    /// A step was rejected while the trust-region radius sat at its floor
    StepRejectedRepeatedly,
}

impl TerminationReason {
    /// Returns true for [`TerminationReason::Converged`].
    pub fn is_converged(self) -> bool {
        matches!(self, Self::Converged)
    }
}

/// Lifecycle of an optimizer instance.
///
/// `Initialized → Running → Finished(reason)`. A finished optimizer may be
/// run again, which resets its counters and history. A run that returns an
/// error puts the optimizer back in `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OptimizerStatus {
    /// Constructed and validated, or the last run returned an error
    Initialized,
    /// Inside `optimize`
    Running,
    /// The last run stopped for the given reason
    Finished(TerminationReason),
}

/// Evaluation counters accumulated during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationCounts {
    /// Objective evaluations
    pub function: usize,
    /// Gradient evaluations
    pub gradient: usize,
    /// Hessian evaluations
    pub hessian: usize,
}

/// Stopping criteria supplied by the caller of `optimize`.
///
/// - **gradient_tolerance**: stop with `Converged` once `‖∇f(x)‖ < ε_grad`
/// - **max_iterations**: upper bound on iterations, `None` runs until
///   convergence (capped by [`UNBOUNDED_ITERATION_CAP`])
/// - **max_function_evaluations**: optional limit on `f(x)` evaluations
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoppingCriterion<T>
where
    T: Scalar,
{
    /// Maximum number of iterations
    pub max_iterations: Option<usize>,

    /// Maximum number of objective evaluations
    pub max_function_evaluations: Option<usize>,

    /// Tolerance for the gradient norm
    pub gradient_tolerance: T,
}

impl<T> Default for StoppingCriterion<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            max_iterations: Some(1000),
            max_function_evaluations: None,
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
        }
    }
}

impl<T> StoppingCriterion<T>
where
    T: Scalar,
{
    /// Creates a new stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = Some(max_iter);
        self
    }

    /// Removes the iteration bound; the run stops on convergence or another
    /// terminal condition.
    pub fn run_to_convergence(mut self) -> Self {
        self.max_iterations = None;
        self
    }

    /// Sets the maximum number of objective evaluations.
    pub fn with_max_function_evaluations(mut self, max_evals: usize) -> Self {
        self.max_function_evaluations = Some(max_evals);
        self
    }

    /// Sets the gradient norm tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// The iteration bound actually enforced.
    pub fn iteration_limit(&self) -> usize {
        self.max_iterations.unwrap_or(UNBOUNDED_ITERATION_CAP)
    }

    /// Returns true when `gradient_norm` satisfies the tolerance.
    pub fn gradient_converged(&self, gradient_norm: T) -> bool {
        gradient_norm < self.gradient_tolerance
    }

    /// Returns true when the function evaluation budget is spent.
    pub fn function_budget_exhausted(&self, counts: &EvaluationCounts) -> bool {
        self.max_function_evaluations
            .is_some_and(|max| counts.function >= max)
    }
}

/// Interface shared by every optimization algorithm.
///
/// An optimizer is bound to its objective function at construction and
/// validates its configuration there. `optimize` mutates the caller's iterate
/// in place and leaves it holding the final point; the same point is also
/// returned in the result.
pub trait Optimizer<T>: Debug
where
    T: Scalar,
{
    /// Returns a human-readable name identifying the optimization algorithm.
    fn name(&self) -> &str;

    /// Returns the lifecycle state of the optimizer.
    fn status(&self) -> OptimizerStatus;

    /// Minimizes the bound objective starting from `iterate`.
    ///
    /// # Errors
    ///
    /// Returns errors for:
    /// - An iterate whose dimension differs from the objective's
    /// - Non-finite objective value or gradient at the starting point
    /// - Errors raised by the objective function itself
    fn optimize(
        &mut self,
        iterate: &mut DVector<T>,
        criterion: &StoppingCriterion<T>,
    ) -> Result<OptimizationResult<T>>;
}

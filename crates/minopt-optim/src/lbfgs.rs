//! Limited-memory BFGS optimizer.
//!
//! L-BFGS (Limited-memory Broyden-Fletcher-Goldfarb-Shanno) is a quasi-Newton optimization
//! algorithm that approximates the inverse Hessian using a limited history of past gradient
//! and position updates.
//!
//! # Algorithm Overview
//!
//! 1. Stores the m most recent position and gradient differences
//! 2. Approximates the inverse Hessian-vector product using two-loop recursion
//! 3. Computes the search direction as the negative approximate Newton direction
//! 4. Performs a strong Wolfe line search to find a suitable step size
//!
//! ## Two-Loop Recursion Algorithm
//!
//! ```text
//! q = grad_f(x_k)
//! for i = k-1, k-2, ..., k-m:
//!     α_i = ρ_i * <s_i, q>
//!     q = q - α_i * y_i
//!
//! r = γ_k * q  // γ_k = <s_{k-1}, y_{k-1}> / <y_{k-1}, y_{k-1}>
//!
//! for i = k-m, k-m+1, ..., k-1:
//!     β = ρ_i * <y_i, r>
//!     r = r + (α_i - β) * s_i
//!
//! return -r  // Search direction
//! ```
//!
//! ## Safeguards
//!
//! - Pairs with `<s, y>` at or below the curvature threshold are never stored,
//!   which keeps the implicit inverse Hessian positive definite
//! - A direction that is not a descent direction is replaced by steepest descent
//! - When the line search fails, the history is discarded and the search is
//!   retried once along the normalized negative gradient
//!
//! # References
//!
//! - Nocedal & Wright, "Numerical Optimization" (2006), Algorithms 7.4 and 7.5
//! - Liu & Nocedal, "On the limited memory BFGS method for large scale optimization" (1989)

use log::{debug, trace, warn};
use minopt_core::{
    error::{OptimizerError, Result},
    line_search::{LineSearch, LineSearchParams, LineSearchResult, StrongWolfeLineSearch},
    objective::{check_dimension, ObjectiveFunction},
    optimizer::{
        EvaluationCounts, OptimizationResult, Optimizer, OptimizerStatus, StoppingCriterion,
        TerminationReason,
    },
    types::{DVector, Scalar},
};
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, Clone)]
struct CurvaturePair<T: Scalar> {
    s: DVector<T>,
    y: DVector<T>,
    rho: T,
}

/// Bounded history of curvature pairs `(s, y)`.
///
/// `s = x_{k+1} - x_k` and `y = g_{k+1} - g_k` come from consecutive accepted
/// iterates. The oldest pair is evicted when a push exceeds the capacity.
#[derive(Debug, Clone)]
pub struct CurvatureHistory<T: Scalar> {
    capacity: usize,
    curvature_threshold: T,
    pairs: VecDeque<CurvaturePair<T>>,
}

impl<T: Scalar> CurvatureHistory<T> {
    /// Creates an empty history holding at most `capacity` pairs.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            curvature_threshold: T::CURVATURE_THRESHOLD,
            pairs: VecDeque::with_capacity(capacity),
        }
    }

    /// Sets the smallest `<s, y>` a stored pair may have.
    pub fn with_curvature_threshold(mut self, threshold: T) -> Self {
        self.curvature_threshold = threshold;
        self
    }

    /// Stores the pair if `<s, y>` exceeds the curvature threshold.
    ///
    /// Returns whether the pair was stored.
    pub fn push(&mut self, s: DVector<T>, y: DVector<T>) -> bool {
        let sy = s.dot(&y);
        if self.capacity == 0 || !<T as Float>::is_finite(sy) || sy <= self.curvature_threshold {
            trace!("curvature pair skipped: <s, y> = {sy}");
            return false;
        }

        if self.pairs.len() == self.capacity {
            self.pairs.pop_front();
        }
        self.pairs.push_back(CurvaturePair {
            s,
            y,
            rho: T::one() / sy,
        });
        true
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Maximum number of stored pairs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Discards every stored pair.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Scaling `γ = <s, y> / <y, y>` of the initial inverse Hessian, taken from
    /// the newest pair.
    pub fn initial_scaling(&self) -> Option<T> {
        self.pairs.back().map(|pair| {
            let yy = pair.y.dot(&pair.y);
            T::one() / (pair.rho * yy)
        })
    }

    /// Computes `H·v` with the two-loop recursion, where `H` is the L-BFGS
    /// approximation of the inverse Hessian.
    ///
    /// With an empty history `H` is the identity.
    pub fn apply_inverse_hessian(&self, v: &DVector<T>) -> DVector<T> {
        let mut q = v.clone();
        let mut alphas = vec![T::zero(); self.pairs.len()];

        for (alpha, pair) in alphas.iter_mut().zip(self.pairs.iter()).rev() {
            *alpha = pair.rho * pair.s.dot(&q);
            q.axpy(-*alpha, &pair.y, T::one());
        }

        if let Some(gamma) = self.initial_scaling() {
            q *= gamma;
        }

        for (alpha, pair) in alphas.iter().zip(self.pairs.iter()) {
            let beta = pair.rho * pair.y.dot(&q);
            q.axpy(*alpha - beta, &pair.s, T::one());
        }
        q
    }
}

/// Configuration for the L-BFGS optimizer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LbfgsConfig<T: Scalar> {
    /// Number of curvature pairs to store (typically 5-20)
    pub memory_size: usize,
    /// Parameters of the strong Wolfe line search
    pub line_search_params: LineSearchParams<T>,
    /// Smallest `<s, y>` accepted for a curvature pair
    pub curvature_threshold: T,
    /// Retry a failed line search once along steepest descent
    pub steepest_descent_fallback: bool,
}

impl<T: Scalar> Default for LbfgsConfig<T> {
    fn default() -> Self {
        Self {
            memory_size: 10,
            line_search_params: LineSearchParams::strong_wolfe(),
            curvature_threshold: T::CURVATURE_THRESHOLD,
            steepest_descent_fallback: true,
        }
    }
}

impl<T: Scalar> LbfgsConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memory size (number of curvature pairs to store).
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Sets the line search parameters.
    pub fn with_line_search_params(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search_params = params;
        self
    }

    /// Sets the initial step size tried by the line search.
    pub fn with_initial_step_size(mut self, step_size: T) -> Self {
        self.line_search_params.initial_step_size = step_size;
        self
    }

    /// Sets the curvature threshold for storing pairs.
    pub fn with_curvature_threshold(mut self, threshold: T) -> Self {
        self.curvature_threshold = threshold;
        self
    }

    /// Enables or disables the steepest-descent retry after a failed line search.
    pub fn with_steepest_descent_fallback(mut self, enabled: bool) -> Self {
        self.steepest_descent_fallback = enabled;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an empty history, invalid line
    /// search parameters or a non-positive curvature threshold.
    pub fn validate(&self) -> Result<()> {
        if self.memory_size == 0 {
            return Err(OptimizerError::invalid_configuration(
                "L-BFGS must store at least one curvature pair",
                "memory_size",
                "0",
            ));
        }
        self.line_search_params.validate()?;
        if !(self.curvature_threshold > T::zero()) || !<T as Float>::is_finite(self.curvature_threshold) {
            return Err(OptimizerError::invalid_configuration(
                "curvature threshold must be positive and finite",
                "curvature_threshold",
                self.curvature_threshold.to_string(),
            ));
        }
        Ok(())
    }
}

/// L-BFGS optimizer bound to an objective function.
///
/// # Examples
///
/// ```rust
/// use minopt_core::prelude::*;
/// use minopt_optim::{Lbfgs, LbfgsConfig};
///
/// let f = QuadraticFunction::<f64>::isotropic(3);
/// let mut lbfgs = Lbfgs::new(&f, LbfgsConfig::new().with_memory_size(5)).unwrap();
///
/// let mut x = DVector::from_element(3, 2.0);
/// let result = lbfgs.optimize(&mut x, &StoppingCriterion::new()).unwrap();
/// assert!(result.converged);
/// assert!(x.norm() < 1e-6);
/// ```
#[derive(Debug)]
pub struct Lbfgs<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    function: &'a F,
    config: LbfgsConfig<T>,
    history: CurvatureHistory<T>,
    line_search: StrongWolfeLineSearch,
    status: OptimizerStatus,
}

impl<'a, T, F> Lbfgs<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    /// Creates an optimizer for `function` after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the configuration is invalid.
    pub fn new(function: &'a F, config: LbfgsConfig<T>) -> Result<Self> {
        config.validate()?;
        let history =
            CurvatureHistory::new(config.memory_size).with_curvature_threshold(config.curvature_threshold);
        Ok(Self {
            function,
            config,
            history,
            line_search: StrongWolfeLineSearch::new(),
            status: OptimizerStatus::Initialized,
        })
    }

    /// Creates an optimizer with the default configuration.
    pub fn with_default_config(function: &'a F) -> Result<Self> {
        Self::new(function, LbfgsConfig::default())
    }

    /// Returns the optimizer configuration.
    pub fn config(&self) -> &LbfgsConfig<T> {
        &self.config
    }

    /// Returns the curvature history left by the last run.
    pub fn history(&self) -> &CurvatureHistory<T> {
        &self.history
    }

    /// Quasi-Newton direction `-H·g`, or `-g/‖g‖` without curvature information.
    fn search_direction(&mut self, gradient: &DVector<T>, gradient_norm: T) -> DVector<T> {
        if self.history.is_empty() {
            return steepest_descent(gradient, gradient_norm);
        }

        let direction = -self.history.apply_inverse_hessian(gradient);
        let slope = gradient.dot(&direction);
        if slope < T::zero() && <T as Float>::is_finite(slope) {
            direction
        } else {
            warn!("L-BFGS direction is not a descent direction (slope = {slope}), using steepest descent");
            self.history.clear();
            steepest_descent(gradient, gradient_norm)
        }
    }

    /// Runs the line search along `direction`, retrying along steepest descent
    /// once on failure. `None` means the search failed for good.
    fn line_search_with_fallback(
        &mut self,
        iterate: &DVector<T>,
        value: T,
        gradient: &DVector<T>,
        gradient_norm: T,
        direction: &DVector<T>,
        counts: &mut EvaluationCounts,
    ) -> Result<Option<LineSearchResult<T>>> {
        let params = &self.config.line_search_params;
        let first = self.line_search.search(self.function, iterate, value, gradient, direction, params);
        let err = match first {
            Ok(step) => return Ok(Some(step)),
            Err(err) if err.is_line_search_failure() => err,
            Err(err) => return Err(err),
        };
        record_failed_search(&err, counts);

        // An empty history means `direction` already was steepest descent
        if !self.config.steepest_descent_fallback || self.history.is_empty() {
            debug!("L-BFGS line search failed: {err}");
            return Ok(None);
        }

        warn!("L-BFGS line search failed ({err}), clearing history and retrying along steepest descent");
        self.history.clear();
        let fallback = steepest_descent(gradient, gradient_norm);
        match self.line_search.search(self.function, iterate, value, gradient, &fallback, params) {
            Ok(step) => Ok(Some(step)),
            Err(err) if err.is_line_search_failure() => {
                record_failed_search(&err, counts);
                debug!("L-BFGS steepest-descent retry failed: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Body of `optimize` once the iterate dimension has been checked.
    fn run(
        &mut self,
        iterate: &mut DVector<T>,
        criterion: &StoppingCriterion<T>,
    ) -> Result<OptimizationResult<T>> {
        let start_time = Instant::now();
        self.history.clear();

        let mut counts = EvaluationCounts::default();
        let mut gradient = DVector::zeros(iterate.len());
        let mut value = self.function.evaluate_with_gradient(iterate, &mut gradient)?;
        counts.function += 1;
        counts.gradient += 1;
        if !<T as Float>::is_finite(value) || gradient.iter().any(|g| !<T as Float>::is_finite(*g)) {
            return Err(OptimizerError::numerical_error(
                "objective value or gradient is not finite at the starting point",
            ));
        }

        let max_iterations = criterion.iteration_limit();
        let mut iterations = 0;

        loop {
            let gradient_norm = gradient.norm();
            let reason = if criterion.gradient_converged(gradient_norm) {
                Some(TerminationReason::Converged)
            } else if iterations >= max_iterations {
                Some(TerminationReason::MaxIterations)
            } else if criterion.function_budget_exhausted(&counts) {
                Some(TerminationReason::MaxFunctionEvaluations)
            } else {
                None
            };
            if let Some(reason) = reason {
                return Ok(self.finish(iterate, value, gradient_norm, iterations, counts, start_time, reason));
            }

            let direction = self.search_direction(&gradient, gradient_norm);
            let Some(step) = self.line_search_with_fallback(
                iterate,
                value,
                &gradient,
                gradient_norm,
                &direction,
                &mut counts,
            )?
            else {
                return Ok(self.finish(
                    iterate,
                    value,
                    gradient_norm,
                    iterations,
                    counts,
                    start_time,
                    TerminationReason::LineSearchFailed,
                ));
            };

            counts.function += step.function_evals;
            counts.gradient += step.gradient_evals;
            let new_gradient = match step.new_gradient {
                Some(g) => g,
                None => {
                    let mut g = DVector::zeros(iterate.len());
                    self.function.gradient(&step.new_point, &mut g)?;
                    counts.gradient += 1;
                    g
                }
            };

            let s = &step.new_point - &*iterate;
            let y = &new_gradient - &gradient;
            let stored = self.history.push(s, y);
            debug!(
                "L-BFGS iteration {}: step = {}, f = {} -> {}, pair stored = {stored} ({}/{})",
                iterations + 1,
                step.step_size,
                value,
                step.new_value,
                self.history.len(),
                self.history.capacity()
            );

            iterate.copy_from(&step.new_point);
            value = step.new_value;
            gradient = new_gradient;
            iterations += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &mut self,
        iterate: &DVector<T>,
        value: T,
        gradient_norm: T,
        iterations: usize,
        counts: EvaluationCounts,
        start_time: Instant,
        reason: TerminationReason,
    ) -> OptimizationResult<T> {
        self.status = OptimizerStatus::Finished(reason);
        debug!(
            "L-BFGS finished after {iterations} iterations: {reason:?}, f = {value}, |g| = {gradient_norm}"
        );
        OptimizationResult::new(iterate.clone(), value, iterations, start_time.elapsed(), reason)
            .with_gradient_norm(gradient_norm)
            .with_counts(counts)
    }
}

fn steepest_descent<T: Scalar>(gradient: &DVector<T>, gradient_norm: T) -> DVector<T> {
    gradient * (-T::one() / gradient_norm)
}

// Strong Wolfe trials evaluate value and gradient together.
fn record_failed_search(err: &OptimizerError, counts: &mut EvaluationCounts) {
    if let OptimizerError::LineSearchFailed { iterations, .. } = err {
        counts.function += iterations;
        counts.gradient += iterations;
    }
}

impl<'a, T, F> Optimizer<T> for Lbfgs<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    fn name(&self) -> &str {
        "L-BFGS"
    }

    fn status(&self) -> OptimizerStatus {
        self.status
    }

    fn optimize(
        &mut self,
        iterate: &mut DVector<T>,
        criterion: &StoppingCriterion<T>,
    ) -> Result<OptimizationResult<T>> {
        check_dimension(self.function, iterate)?;
        self.status = OptimizerStatus::Running;
        let outcome = self.run(iterate, criterion);
        if outcome.is_err() {
            self.status = OptimizerStatus::Initialized;
        }
        outcome
    }
}

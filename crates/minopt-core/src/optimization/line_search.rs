//! Line search algorithms for unconstrained optimization.
//!
//! This module implements step size strategies along a descent direction.
//! They are the globalization component of line-search methods such as
//! L-BFGS.
//!
//! # Mathematical Foundation
//!
//! Given:
//! - A point x ∈ ℝⁿ with value f(x) and gradient g = ∇f(x)
//! - A descent direction d with ⟨g, d⟩ < 0
//!
//! find a step α > 0 along φ(α) = f(x + α d).
//!
//! ## Armijo Condition (Sufficient Decrease)
//! f(x + α d) ≤ f(x) + c₁ α ⟨g, d⟩
//!
//! ## Strong Wolfe Conditions
//! 1. Armijo: f(x + α d) ≤ f(x) + c₁ α ⟨g, d⟩
//! 2. Strong curvature: |⟨∇f(x + α d), d⟩| ≤ c₂ |⟨g, d⟩|
//!
//! where 0 < c₁ < c₂ < 1, typically c₁ = 10⁻⁴ and c₂ = 0.9. The strong
//! curvature condition implies the weak one, ⟨∇f(x + α d), d⟩ ≥ c₂ ⟨g, d⟩,
//! which guarantees ⟨s, y⟩ > 0 for the quasi-Newton pair produced by the step.
//!
//! # Algorithm Variants
//!
//! ## Backtracking Line Search
//! - **Strategy**: Start with the initial step, multiply by ρ until the
//!   Armijo condition holds
//! - **Cost**: One function evaluation per trial, no gradients
//!
//! ## Strong Wolfe Line Search
//! - **Strategy**: Bracketing phase that doubles the step until an interval
//!   containing acceptable steps is found, then a zoom phase that shrinks
//!   the interval with safeguarded cubic interpolation
//! - **Cost**: One function and one gradient evaluation per trial
//!
//! # Failure
//!
//! Both searches share one trial budget (`max_iterations`). Exhausting it,
//! collapsing the bracket or underflowing below `min_step_size` returns
//! [`OptimizerError::LineSearchFailed`]. A trial with a non-finite value is
//! treated as a failed sufficient-decrease test.
//!
//! # Examples
//!
//! ```rust
//! # use minopt_core::prelude::*;
//! let f = QuadraticFunction::<f64>::isotropic(2);
//! let x = DVector::from_vec(vec![1.0, 1.0]);
//! let mut g = DVector::zeros(2);
//! let value = f.evaluate_with_gradient(&x, &mut g)?;
//! let direction = -&g;
//!
//! let mut line_search = StrongWolfeLineSearch::new();
//! let result = line_search.search(
//!     &f, &x, value, &g, &direction, &LineSearchParams::strong_wolfe(),
//! )?;
//! assert!(result.new_value < value);
//! # Ok::<(), minopt_core::error::OptimizerError>(())
//! ```

use crate::{
    core::objective::ObjectiveFunction,
    error::{OptimizerError, Result},
    types::{DVector, Scalar},
};
use log::trace;
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Result of a successful line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult<T>
where
    T: Scalar,
{
    /// The accepted step size α
    pub step_size: T,

    /// The accepted point x + α d
    pub new_point: DVector<T>,

    /// The objective value at the accepted point
    pub new_value: T,

    /// The gradient at the accepted point (if computed during the search)
    pub new_gradient: Option<DVector<T>>,

    /// Number of objective evaluations performed
    pub function_evals: usize,

    /// Number of gradient evaluations performed
    pub gradient_evals: usize,
}

/// Parameters for line search algorithms.
///
/// # Wolfe Condition Constants
/// - **c₁ (Armijo parameter)**: range (0, 1), typically 10⁻⁴
/// - **c₂ (curvature parameter)**: range (c₁, 1), typically 0.9 for
///   quasi-Newton methods
///
/// # Step Size Management
/// - **initial_step_size**: Starting step size α₀
/// - **max_step_size**: Upper bound for the bracketing phase
/// - **min_step_size**: Lower bound before declaring failure
/// - **rho**: Backtracking reduction factor ∈ (0, 1)
/// - **max_iterations**: Trial budget shared by all phases
///
/// ```rust
/// # use minopt_core::prelude::*;
/// let params = LineSearchParams {
///     c2: 0.5,
///     max_iterations: 60,
///     ..LineSearchParams::<f64>::strong_wolfe()
/// };
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchParams<T>
where
    T: Scalar,
{
    /// Initial step size α₀
    pub initial_step_size: T,

    /// Maximum allowable step size
    pub max_step_size: T,

    /// Minimum step size before declaring failure
    pub min_step_size: T,

    /// Maximum number of trial steps
    pub max_iterations: usize,

    /// Armijo parameter c₁ ∈ (0,1)
    pub c1: T,

    /// Wolfe parameter c₂ ∈ (c₁,1)
    pub c2: T,

    /// Backtracking reduction factor ρ ∈ (0,1)
    pub rho: T,
}

impl<T> Default for LineSearchParams<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            initial_step_size: T::one(),
            max_step_size: T::MAX_STEP_SIZE,
            min_step_size: T::MIN_STEP_SIZE,
            max_iterations: 40,
            c1: <T as Scalar>::from_f64(1e-4),
            c2: <T as Scalar>::from_f64(0.9),
            rho: <T as Scalar>::from_f64(0.5),
        }
    }
}

impl<T> LineSearchParams<T>
where
    T: Scalar,
{
    /// Validates line search parameters.
    ///
    /// # Errors
    ///
    /// Returns `OptimizerError::InvalidConfiguration` if:
    /// - Step sizes violate positivity or ordering constraints
    /// - Wolfe constants don't satisfy 0 < c₁ < c₂ < 1
    /// - Backtracking factor ρ ∉ (0, 1)
    /// - Maximum iterations is zero
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_step_size > T::zero()) {
            return Err(invalid("Initial step size must be positive", "initial_step_size", self.initial_step_size));
        }

        if !(self.min_step_size > T::zero()) {
            return Err(invalid("Minimum step size must be positive", "min_step_size", self.min_step_size));
        }

        if !(self.max_step_size > self.min_step_size) {
            return Err(invalid(
                "Maximum step size must be greater than minimum step size",
                "max_step_size",
                self.max_step_size,
            ));
        }

        if !(self.c1 > T::zero() && self.c1 < T::one()) {
            return Err(invalid("Armijo constant c1 must be in (0, 1)", "c1", self.c1));
        }

        if !(self.c2 > self.c1 && self.c2 < T::one()) {
            return Err(invalid("Wolfe constant c2 must satisfy c1 < c2 < 1", "c2", self.c2));
        }

        if !(self.rho > T::zero() && self.rho < T::one()) {
            return Err(invalid("Backtracking factor rho must be in (0, 1)", "rho", self.rho));
        }

        if self.max_iterations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Maximum iterations must be at least 1",
                "max_iterations",
                "0",
            ));
        }

        Ok(())
    }

    /// Parameters for strong Wolfe line search (c₁ = 10⁻⁴, c₂ = 0.9).
    pub fn strong_wolfe() -> Self {
        Self::default()
    }

    /// Parameters for backtracking line search.
    ///
    /// Halves the step on every failed trial and allows enough trials to
    /// shrink a unit step by fifteen orders of magnitude.
    pub fn backtracking() -> Self {
        Self {
            rho: <T as Scalar>::from_f64(0.5),
            max_iterations: 50,
            ..Self::default()
        }
    }
}

fn invalid<T: Scalar>(reason: &str, parameter: &str, value: T) -> OptimizerError {
    OptimizerError::invalid_configuration(reason, parameter, value.to_string())
}

/// Trait for line search algorithms.
pub trait LineSearch<T>: Debug
where
    T: Scalar,
{
    /// Searches for a step along `direction` from `x`.
    ///
    /// `value` and `gradient` are f(x) and ∇f(x); they are not recomputed.
    ///
    /// # Errors
    ///
    /// - `InvalidSearchDirection` if ⟨gradient, direction⟩ ≥ 0
    /// - `LineSearchFailed` if no acceptable step is found
    /// - Any error raised by the objective function
    fn search<F>(
        &mut self,
        function: &F,
        x: &DVector<T>,
        value: T,
        gradient: &DVector<T>,
        direction: &DVector<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized;

    /// Returns the name of this line search.
    fn name(&self) -> &str;
}

/// Returns ⟨gradient, direction⟩ if it is negative.
fn descent_slope<T: Scalar>(gradient: &DVector<T>, direction: &DVector<T>) -> Result<T> {
    let slope = gradient.dot(direction);
    if slope < T::zero() {
        Ok(slope)
    } else {
        Err(OptimizerError::InvalidSearchDirection)
    }
}

/// Backtracking line search enforcing the Armijo condition.
///
/// Starting from `initial_step_size`, the step is multiplied by `rho` until
/// f(x + α d) ≤ f(x) + c₁ α ⟨g, d⟩. No gradients are evaluated.
#[derive(Debug, Clone, Default)]
pub struct BacktrackingLineSearch;

impl BacktrackingLineSearch {
    /// Creates a new backtracking line search.
    pub fn new() -> Self {
        Self
    }
}

impl<T> LineSearch<T> for BacktrackingLineSearch
where
    T: Scalar,
{
    fn search<F>(
        &mut self,
        function: &F,
        x: &DVector<T>,
        value: T,
        gradient: &DVector<T>,
        direction: &DVector<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let slope = descent_slope(gradient, direction)?;
        let mut step = <T as Float>::min(params.initial_step_size, params.max_step_size);
        let mut trial = x.clone();

        for evals in 1..=params.max_iterations {
            trial.copy_from(x);
            trial.axpy(step, direction, T::one());
            let trial_value = function.evaluate(&trial)?;
            trace!("backtracking trial {evals}: step = {step}, value = {trial_value}");

            if <T as Float>::is_finite(trial_value) && trial_value <= value + params.c1 * step * slope {
                return Ok(LineSearchResult {
                    step_size: step,
                    new_point: trial,
                    new_value: trial_value,
                    new_gradient: None,
                    function_evals: evals,
                    gradient_evals: 0,
                });
            }

            step *= params.rho;
            if step < params.min_step_size {
                return Err(OptimizerError::line_search_failed(
                    "step size fell below the minimum",
                    evals,
                    step.to_f64(),
                    value.to_f64(),
                ));
            }
        }

        Err(OptimizerError::line_search_failed(
            "Armijo condition not satisfied within the trial budget",
            params.max_iterations,
            step.to_f64(),
            value.to_f64(),
        ))
    }

    fn name(&self) -> &str {
        "Backtracking"
    }
}

/// One evaluated trial step: φ(α) and φ'(α).
#[derive(Debug, Clone, Copy)]
struct Trial<T> {
    step: T,
    value: T,
    slope: T,
}

impl<T: Scalar> Trial<T> {
    fn is_finite(&self) -> bool {
        <T as Float>::is_finite(self.value) && <T as Float>::is_finite(self.slope)
    }
}

/// Line search satisfying the strong Wolfe conditions.
///
/// The bracketing phase starts at `initial_step_size` and doubles the step
/// (capped at `max_step_size`) until either an acceptable step is found or
/// an interval containing one is identified. The zoom phase then shrinks
/// that interval, keeping the endpoint with the lowest value as `lo` and
/// choosing the next trial by the minimizer of the cubic interpolating
/// φ and φ' at both ends. The cubic step is rejected in favour of bisection
/// when it falls within 10% of either end of the interval.
///
/// Every trial costs one function and one gradient evaluation; the gradient
/// of the accepted point is returned so the caller does not recompute it.
#[derive(Debug, Clone, Default)]
pub struct StrongWolfeLineSearch;

impl StrongWolfeLineSearch {
    /// Creates a new strong Wolfe line search.
    pub fn new() -> Self {
        Self
    }

    fn evaluate<T, F>(
        function: &F,
        x: &DVector<T>,
        direction: &DVector<T>,
        step: T,
        point: &mut DVector<T>,
        gradient: &mut DVector<T>,
    ) -> Result<Trial<T>>
    where
        T: Scalar,
        F: ObjectiveFunction<T> + ?Sized,
    {
        point.copy_from(x);
        point.axpy(step, direction, T::one());
        let value = function.evaluate_with_gradient(point, gradient)?;
        Ok(Trial {
            step,
            value,
            slope: gradient.dot(direction),
        })
    }
}

/// Minimizer of the cubic interpolating (α, φ, φ') at both ends of a bracket.
fn cubic_minimizer<T: Scalar>(lo: &Trial<T>, hi: &Trial<T>) -> Option<T> {
    if !lo.is_finite() || !hi.is_finite() || lo.step == hi.step {
        return None;
    }
    let three = <T as Scalar>::from_f64(3.0);
    let two = <T as Scalar>::from_f64(2.0);

    let d1 = lo.slope + hi.slope - three * (lo.value - hi.value) / (lo.step - hi.step);
    let discriminant = d1 * d1 - lo.slope * hi.slope;
    if discriminant < T::zero() {
        return None;
    }
    let d2 = <T as Float>::copysign(<T as Float>::sqrt(discriminant), hi.step - lo.step);
    let t = hi.step - (hi.step - lo.step) * (hi.slope + d2 - d1) / (hi.slope - lo.slope + two * d2);

    <T as Float>::is_finite(t).then_some(t)
}

impl<T> LineSearch<T> for StrongWolfeLineSearch
where
    T: Scalar,
{
    fn search<F>(
        &mut self,
        function: &F,
        x: &DVector<T>,
        value: T,
        gradient: &DVector<T>,
        direction: &DVector<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let slope0 = descent_slope(gradient, direction)?;

        let mut point = DVector::zeros(x.len());
        let mut trial_gradient = DVector::zeros(x.len());
        let armijo = |trial: &Trial<T>| trial.value <= value + params.c1 * trial.step * slope0;
        let curvature = |trial: &Trial<T>| <T as Float>::abs(trial.slope) <= -params.c2 * slope0;

        let mut evals = 0;
        let mut previous = Trial {
            step: T::zero(),
            value,
            slope: slope0,
        };
        let mut step = <T as Float>::min(params.initial_step_size, params.max_step_size);

        // Bracketing phase
        let (mut lo, mut hi) = loop {
            if evals >= params.max_iterations {
                return Err(OptimizerError::line_search_failed(
                    "no bracket found within the trial budget",
                    evals,
                    step.to_f64(),
                    value.to_f64(),
                ));
            }

            let current = Self::evaluate(function, x, direction, step, &mut point, &mut trial_gradient)?;
            evals += 1;
            trace!(
                "wolfe bracket trial {evals}: step = {}, value = {}, slope = {}",
                current.step,
                current.value,
                current.slope
            );

            if !current.is_finite() || !armijo(&current) || (evals > 1 && current.value >= previous.value) {
                break (previous, current);
            }
            if curvature(&current) {
                return Ok(accepted(current, point, trial_gradient, evals));
            }
            if current.slope >= T::zero() {
                break (current, previous);
            }

            previous = current;
            step = <T as Float>::min(step + step, params.max_step_size);
        };

        // Zoom phase: lo has the lowest value seen and satisfies Armijo;
        // the interval between lo and hi contains acceptable steps.
        let tenth = <T as Scalar>::from_f64(0.1);
        let half = <T as Scalar>::from_f64(0.5);
        loop {
            if evals >= params.max_iterations {
                return Err(OptimizerError::line_search_failed(
                    "zoom did not satisfy the strong Wolfe conditions within the trial budget",
                    evals,
                    lo.step.to_f64(),
                    value.to_f64(),
                ));
            }

            let left = <T as Float>::min(lo.step, hi.step);
            let right = <T as Float>::max(lo.step, hi.step);
            let width = right - left;
            if width <= <T as Float>::max(params.min_step_size, T::EPSILON * right) {
                return Err(OptimizerError::line_search_failed(
                    "bracket collapsed",
                    evals,
                    lo.step.to_f64(),
                    value.to_f64(),
                ));
            }

            let step = cubic_minimizer(&lo, &hi)
                .filter(|t| *t >= left + tenth * width && *t <= right - tenth * width)
                .unwrap_or_else(|| half * (lo.step + hi.step));
            if step < params.min_step_size {
                return Err(OptimizerError::line_search_failed(
                    "step size fell below the minimum",
                    evals,
                    step.to_f64(),
                    value.to_f64(),
                ));
            }

            let current = Self::evaluate(function, x, direction, step, &mut point, &mut trial_gradient)?;
            evals += 1;
            trace!(
                "wolfe zoom trial {evals}: step = {}, value = {}, slope = {}",
                current.step,
                current.value,
                current.slope
            );

            if !current.is_finite() || !armijo(&current) || current.value >= lo.value {
                hi = current;
            } else {
                if curvature(&current) {
                    return Ok(accepted(current, point, trial_gradient, evals));
                }
                if current.slope * (hi.step - lo.step) >= T::zero() {
                    hi = lo;
                }
                lo = current;
            }
        }
    }

    fn name(&self) -> &str {
        "StrongWolfe"
    }
}

fn accepted<T: Scalar>(
    trial: Trial<T>,
    point: DVector<T>,
    gradient: DVector<T>,
    evals: usize,
) -> LineSearchResult<T> {
    LineSearchResult {
        step_size: trial.step,
        new_point: point,
        new_value: trial.value,
        new_gradient: Some(gradient),
        function_evals: evals,
        gradient_evals: evals,
    }
}

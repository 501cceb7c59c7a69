//! Trust Region optimizer.
//!
//! Trust region methods are robust second-order optimization algorithms that use a
//! local quadratic model of the objective function within a "trust region" where
//! the model is assumed to be accurate.
//!
//! # Algorithm Overview
//!
//! At each iteration, the trust region method:
//! 1. Builds a quadratic model from the value, gradient and reported curvature
//! 2. Solves the subproblem for the best step within the trust region
//! 3. Evaluates the actual vs predicted reduction `ρ`
//! 4. Accepts the step if `ρ` exceeds the acceptance ratio
//! 5. Updates the trust region radius based on `ρ`
//!
//! ## Radius update
//!
//! ```text
//! ρ < decrease_threshold                → Δ = max(Δ · decrease_factor, Δ_min)
//! ρ > increase_threshold and ‖p‖ = Δ    → Δ = min(Δ · increase_factor, Δ_max)
//! otherwise                             → Δ unchanged
//! ```
//!
//! A step rejected while the radius is already at `Δ_min` ends the run with
//! [`TerminationReason::StepRejectedRepeatedly`].
//!
//! # References
//!
//! - Conn et al., "Trust Region Methods" (2000)
//! - Nocedal & Wright, "Numerical Optimization" (2006), Chapter 4

use crate::subproblem::{QuadraticModel, TrustRegionSearchMethod};
use log::debug;
use minopt_core::{
    error::{OptimizerError, Result},
    objective::{check_dimension, ObjectiveFunction},
    optimizer::{
        EvaluationCounts, OptimizationResult, Optimizer, OptimizerStatus, StoppingCriterion,
        TerminationReason,
    },
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Configuration for the Trust Region optimizer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrustRegionConfig<T: Scalar> {
    /// Subproblem solver
    pub search_method: TrustRegionSearchMethod,
    /// Initial trust region radius
    pub initial_radius: T,
    /// Maximum trust region radius
    pub max_radius: T,
    /// Minimum trust region radius; a step rejected at this radius ends the
    /// run with `StepRejectedRepeatedly`
    pub min_radius: T,
    /// Ratio threshold for accepting a step (eta in literature)
    pub acceptance_ratio: T,
    /// Ratio threshold for increasing the trust region (typically 0.75)
    pub increase_threshold: T,
    /// Ratio threshold for decreasing the trust region (typically 0.25)
    pub decrease_threshold: T,
    /// Factor for increasing the trust region radius (typically 2.0)
    pub increase_factor: T,
    /// Factor for decreasing the trust region radius (typically 0.25)
    pub decrease_factor: T,
}

impl<T: Scalar> Default for TrustRegionConfig<T> {
    fn default() -> Self {
        Self {
            search_method: TrustRegionSearchMethod::Cauchy,
            initial_radius: <T as Scalar>::from_f64(1.0),
            max_radius: <T as Scalar>::from_f64(10.0),
            min_radius: T::MIN_TRUST_RADIUS,
            acceptance_ratio: <T as Scalar>::from_f64(0.1),
            increase_threshold: <T as Scalar>::from_f64(0.75),
            decrease_threshold: <T as Scalar>::from_f64(0.25),
            increase_factor: <T as Scalar>::from_f64(2.0),
            decrease_factor: <T as Scalar>::from_f64(0.25),
        }
    }
}

impl<T: Scalar> TrustRegionConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subproblem solver.
    pub fn with_search_method(mut self, method: TrustRegionSearchMethod) -> Self {
        self.search_method = method;
        self
    }

    /// Sets the initial trust region radius.
    pub fn with_initial_radius(mut self, radius: T) -> Self {
        self.initial_radius = radius;
        self
    }

    /// Sets the maximum trust region radius.
    pub fn with_max_radius(mut self, radius: T) -> Self {
        self.max_radius = radius;
        self
    }

    /// Sets the minimum trust region radius.
    pub fn with_min_radius(mut self, radius: T) -> Self {
        self.min_radius = radius;
        self
    }

    /// Sets the acceptance ratio threshold.
    pub fn with_acceptance_ratio(mut self, ratio: T) -> Self {
        self.acceptance_ratio = ratio;
        self
    }

    /// Sets the ratio thresholds below which the radius shrinks and above
    /// which it grows.
    pub fn with_thresholds(mut self, decrease: T, increase: T) -> Self {
        self.decrease_threshold = decrease;
        self.increase_threshold = increase;
        self
    }

    /// Sets the shrink and growth factors of the radius.
    pub fn with_factors(mut self, decrease: T, increase: T) -> Self {
        self.decrease_factor = decrease;
        self.increase_factor = increase;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the radius bounds, ratio thresholds
    /// or factors are inconsistent.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str, parameter: &str, value: T| {
            Err(OptimizerError::invalid_configuration(reason, parameter, value.to_string()))
        };

        if !(self.min_radius > T::zero()) {
            return invalid("minimum radius must be positive", "min_radius", self.min_radius);
        }
        if !(self.max_radius > self.min_radius) || !<T as Float>::is_finite(self.max_radius) {
            return invalid(
                "maximum radius must be finite and exceed the minimum radius",
                "max_radius",
                self.max_radius,
            );
        }
        if !(self.initial_radius >= self.min_radius && self.initial_radius <= self.max_radius) {
            return invalid(
                "initial radius must lie between the minimum and maximum radius",
                "initial_radius",
                self.initial_radius,
            );
        }
        if !(self.acceptance_ratio >= T::zero() && self.acceptance_ratio < self.decrease_threshold) {
            return invalid(
                "acceptance ratio must be non-negative and below the decrease threshold",
                "acceptance_ratio",
                self.acceptance_ratio,
            );
        }
        if !(self.decrease_threshold < self.increase_threshold) {
            return invalid(
                "decrease threshold must be below the increase threshold",
                "decrease_threshold",
                self.decrease_threshold,
            );
        }
        if !(self.decrease_factor > T::zero() && self.decrease_factor < T::one()) {
            return invalid("decrease factor must lie in (0, 1)", "decrease_factor", self.decrease_factor);
        }
        if !(self.increase_factor > T::one()) || !<T as Float>::is_finite(self.increase_factor) {
            return invalid("increase factor must exceed 1", "increase_factor", self.increase_factor);
        }
        Ok(())
    }
}

/// Radius and rejection count carried across iterations.
#[derive(Debug, Clone, Copy)]
struct TrustRegionState<T: Scalar> {
    /// Current trust region radius
    radius: T,
    /// Number of rejected steps in a row
    consecutive_rejections: usize,
}

impl<T: Scalar> TrustRegionState<T> {
    fn new(initial_radius: T) -> Self {
        Self {
            radius: initial_radius,
            consecutive_rejections: 0,
        }
    }

    /// Updates the trust region radius based on the reduction ratio.
    fn update_radius(&mut self, ratio: T, hit_boundary: bool, config: &TrustRegionConfig<T>) {
        let previous = self.radius;
        if ratio < config.decrease_threshold {
            // Poor agreement: shrink trust region
            self.radius = <T as Float>::max(self.radius * config.decrease_factor, config.min_radius);
        } else if ratio > config.increase_threshold && hit_boundary {
            // Good agreement on the boundary: expand trust region
            self.radius = <T as Float>::min(self.radius * config.increase_factor, config.max_radius);
        }
        if self.radius != previous {
            debug!("trust region radius {previous} -> {}", self.radius);
        }
    }
}

/// Trust Region optimizer bound to an objective function.
///
/// The curvature of the local model is whatever
/// [`ObjectiveFunction::hessian`] reports; with the default zero Hessian the
/// Cauchy solver steps along steepest descent to the region boundary.
///
/// A linear model cannot predict the decrease of a curved objective
/// accurately once the gradient is small compared to the radius, so steps
/// keep getting rejected near a minimizer. With a zero or otherwise poor
/// Hessian a run therefore usually ends with
/// [`TerminationReason::StepRejectedRepeatedly`] next to the minimizer
/// rather than with `Converged`. Raise `min_radius` to stop earlier, or
/// report a better Hessian to reach the gradient tolerance.
///
/// # Examples
///
/// ```rust
/// use minopt_core::prelude::*;
/// use minopt_optim::{TrustRegion, TrustRegionConfig, TrustRegionSearchMethod};
///
/// let f = QuadraticFunction::<f64>::isotropic(2);
/// let config = TrustRegionConfig::new().with_search_method(TrustRegionSearchMethod::Dogleg);
/// let mut trust_region = TrustRegion::new(&f, config).unwrap();
///
/// let mut x = DVector::from_vec(vec![3.0, -4.0]);
/// let result = trust_region.optimize(&mut x, &StoppingCriterion::new()).unwrap();
/// assert!(result.converged);
/// ```
#[derive(Debug)]
pub struct TrustRegion<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    function: &'a F,
    config: TrustRegionConfig<T>,
    state: TrustRegionState<T>,
    status: OptimizerStatus,
}

impl<'a, T, F> TrustRegion<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    /// Creates an optimizer for `function` after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the configuration is invalid.
    pub fn new(function: &'a F, config: TrustRegionConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            function,
            state: TrustRegionState::new(config.initial_radius),
            config,
            status: OptimizerStatus::Initialized,
        })
    }

    /// Creates an optimizer with the default configuration.
    pub fn with_default_config(function: &'a F) -> Result<Self> {
        Self::new(function, TrustRegionConfig::default())
    }

    /// Returns the optimizer configuration.
    pub fn config(&self) -> &TrustRegionConfig<T> {
        &self.config
    }

    /// Current trust region radius.
    pub fn radius(&self) -> T {
        self.state.radius
    }

    /// Number of steps rejected in a row at the end of the last run.
    pub fn consecutive_rejections(&self) -> usize {
        self.state.consecutive_rejections
    }

    /// Body of `optimize` once the iterate dimension has been checked.
    fn run(
        &mut self,
        iterate: &mut DVector<T>,
        criterion: &StoppingCriterion<T>,
    ) -> Result<OptimizationResult<T>> {
        let start_time = Instant::now();
        let n = iterate.len();
        self.state = TrustRegionState::new(self.config.initial_radius);

        let mut counts = EvaluationCounts::default();
        let mut gradient = DVector::zeros(n);
        let mut value = self.function.evaluate_with_gradient(iterate, &mut gradient)?;
        counts.function += 1;
        counts.gradient += 1;
        if !<T as Float>::is_finite(value) || gradient.iter().any(|g| !<T as Float>::is_finite(*g)) {
            return Err(OptimizerError::numerical_error(
                "objective value or gradient is not finite at the starting point",
            ));
        }

        let method = self.config.search_method;
        let mut hessian = DMatrix::zeros(n, n);
        let mut hessian_is_current = false;
        let mut trial = DVector::zeros(n);
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

            // Curvature only changes with the iterate
            if !hessian_is_current {
                self.function.hessian(iterate, &mut hessian)?;
                counts.hessian += 1;
                hessian_is_current = true;
            }

            let model = QuadraticModel::new(value, &gradient, &hessian)?;
            let solution = method.solve(&model, self.state.radius)?;

            trial.copy_from(iterate);
            trial += &solution.step;
            let trial_value = self.function.evaluate(&trial)?;
            counts.function += 1;
            iterations += 1;

            let predicted = solution.predicted_decrease;
            let ratio = if predicted > T::zero() && <T as Float>::is_finite(trial_value) {
                let ratio = (value - trial_value) / predicted;
                if <T as Float>::is_finite(ratio) {
                    ratio
                } else {
                    T::zero()
                }
            } else {
                T::zero()
            };

            if ratio > self.config.acceptance_ratio {
                debug!(
                    "trust region iteration {iterations}: accepted {:?} step, ratio = {ratio}, f = {value} -> {trial_value}",
                    solution.kind
                );
                iterate.copy_from(&trial);
                value = trial_value;
                self.function.gradient(iterate, &mut gradient)?;
                counts.gradient += 1;
                hessian_is_current = false;
                self.state.consecutive_rejections = 0;
            } else {
                self.state.consecutive_rejections += 1;
                debug!(
                    "trust region iteration {iterations}: rejected {:?} step, ratio = {ratio}, rejections = {}",
                    solution.kind, self.state.consecutive_rejections
                );
                if self.state.radius <= self.config.min_radius {
                    return Ok(self.finish(
                        iterate,
                        value,
                        gradient_norm,
                        iterations,
                        counts,
                        start_time,
                        TerminationReason::StepRejectedRepeatedly,
                    ));
                }
            }

            self.state.update_radius(ratio, solution.hit_boundary, &self.config);
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
            "trust region finished after {iterations} iterations: {reason:?}, f = {value}, |g| = {gradient_norm}, radius = {}",
            self.state.radius
        );
        OptimizationResult::new(iterate.clone(), value, iterations, start_time.elapsed(), reason)
            .with_gradient_norm(gradient_norm)
            .with_counts(counts)
    }
}

impl<'a, T, F> Optimizer<T> for TrustRegion<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    fn name(&self) -> &str {
        "Trust Region"
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use minopt_core::objective::{CountingFunction, QuadraticFunction};

    #[test]
    fn test_trust_region_config() {
        let config = TrustRegionConfig::<f64>::new()
            .with_initial_radius(0.5)
            .with_max_radius(5.0)
            .with_search_method(TrustRegionSearchMethod::Dogleg);

        assert_eq!(config.initial_radius, 0.5);
        assert_eq!(config.max_radius, 5.0);
        assert_eq!(config.search_method, TrustRegionSearchMethod::Dogleg);
        assert_eq!(config.min_radius, 1e-8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let invalid = [
            TrustRegionConfig::<f64>::new().with_min_radius(0.0),
            TrustRegionConfig::new().with_max_radius(1e-9),
            TrustRegionConfig::new().with_initial_radius(20.0),
            TrustRegionConfig::new().with_acceptance_ratio(0.5),
            TrustRegionConfig::new().with_thresholds(0.8, 0.5),
            TrustRegionConfig::new().with_factors(1.5, 2.0),
            TrustRegionConfig::new().with_factors(0.25, 1.0),
            TrustRegionConfig::new().with_max_radius(f64::INFINITY),
        ];
        for config in invalid {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }), "{config:?}");
        }
    }

    #[test]
    fn test_trust_region_state_update() {
        let config = TrustRegionConfig::<f64>::default();
        let mut state = TrustRegionState::new(1.0);

        // Test radius decrease
        state.update_radius(0.1, true, &config);
        assert_eq!(state.radius, 0.25);

        // Test radius increase
        state.radius = 1.0;
        state.update_radius(0.9, true, &config);
        assert_eq!(state.radius, 2.0);

        // Interior steps never grow the radius
        state.radius = 1.0;
        state.update_radius(0.9, false, &config);
        assert_eq!(state.radius, 1.0);

        // Test radius unchanged
        state.update_radius(0.5, true, &config);
        assert_eq!(state.radius, 1.0);
    }

    #[test]
    fn test_radius_clamped() {
        let config = TrustRegionConfig::<f64>::default();
        let mut state = TrustRegionState::new(8.0);
        state.update_radius(1.0, true, &config);
        assert_eq!(state.radius, 10.0);

        state.radius = 2e-8;
        state.update_radius(0.0, true, &config);
        assert_eq!(state.radius, config.min_radius);
    }

    #[test]
    fn test_dogleg_solves_quadratic_in_one_step() {
        let a = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]);
        let minimizer = DVector::from_vec(vec![0.5, -0.5]);
        let f = QuadraticFunction::with_minimizer(a, &minimizer).unwrap();

        let config = TrustRegionConfig::new().with_search_method(TrustRegionSearchMethod::Dogleg);
        let mut optimizer = TrustRegion::new(&f, config).unwrap();
        let mut x = DVector::from_vec(vec![0.0, 0.0]);
        let result = optimizer.optimize(&mut x, &StoppingCriterion::new()).unwrap();

        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_relative_eq!(x, minimizer, epsilon = 1e-10);
    }

    #[test]
    fn test_hessian_evaluated_once_per_accepted_iterate() {
        let f = CountingFunction::new(QuadraticFunction::<f64>::isotropic(3));
        let mut optimizer = TrustRegion::with_default_config(&f).unwrap();
        let mut x = DVector::from_element(3, 10.0);
        let result = optimizer.optimize(&mut x, &StoppingCriterion::new()).unwrap();

        assert!(result.converged);
        let (_, _, hessian) = f.counts();
        assert_eq!(result.hessian_evaluations, hessian);
        assert!(result.hessian_evaluations <= result.iterations);
    }

    #[test]
    fn test_dimension_mismatch() {
        let f = QuadraticFunction::<f64>::isotropic(3);
        let mut optimizer = TrustRegion::with_default_config(&f).unwrap();
        let mut x = DVector::zeros(4);
        let err = optimizer.optimize(&mut x, &StoppingCriterion::new()).unwrap_err();
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_accessors() {
        let f = QuadraticFunction::<f64>::isotropic(2);
        let optimizer = TrustRegion::new(&f, TrustRegionConfig::new().with_initial_radius(0.5)).unwrap();
        assert_eq!(optimizer.name(), "Trust Region");
        assert_eq!(optimizer.radius(), 0.5);
        assert_eq!(optimizer.consecutive_rejections(), 0);
        assert_eq!(optimizer.status(), OptimizerStatus::Initialized);
        assert_eq!(optimizer.config().search_method, TrustRegionSearchMethod::Cauchy);
    }
}

//! Trust-region subproblem solvers.
//!
//! Each solver approximately minimizes the local quadratic model
//!
//! ```text
//! m(p) = f + <g, p> + ½ <p, H p>    s.t.  ‖p‖ ≤ Δ
//! ```
//!
//! where `H` is whatever curvature the objective reports (possibly zero or
//! indefinite).
//!
//! - [`CauchyPoint`]: minimizer of the model along `-g` inside the region
//! - [`Dogleg`]: piecewise path from the Cauchy point to the Newton step,
//!   valid when `H` is positive definite

use log::debug;
use minopt_core::{
    error::{OptimizerError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Quadratic model of the objective around the current iterate.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticModel<'a, T: Scalar> {
    value: T,
    gradient: &'a DVector<T>,
    hessian: &'a DMatrix<T>,
}

impl<'a, T: Scalar> QuadraticModel<'a, T> {
    /// Builds the model from `f(x)`, `∇f(x)` and the curvature approximation.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the Hessian is not `n × n`.
    pub fn new(value: T, gradient: &'a DVector<T>, hessian: &'a DMatrix<T>) -> Result<Self> {
        let n = gradient.len();
        if hessian.shape() != (n, n) {
            return Err(OptimizerError::dimension_mismatch(
                format!("{n}x{n}"),
                format!("{}x{}", hessian.nrows(), hessian.ncols()),
            ));
        }
        Ok(Self {
            value,
            gradient,
            hessian,
        })
    }

    /// Objective value at the model center.
    pub fn value(&self) -> T {
        self.value
    }

    /// Gradient at the model center.
    pub fn gradient(&self) -> &'a DVector<T> {
        self.gradient
    }

    /// Curvature matrix of the model.
    pub fn hessian(&self) -> &'a DMatrix<T> {
        self.hessian
    }

    /// `m(p) = f + <g, p> + ½ <p, H p>`.
    pub fn model_value(&self, step: &DVector<T>) -> T {
        self.value - self.predicted_decrease(step)
    }

    /// `m(0) - m(p) = -(<g, p> + ½ <p, H p>)`.
    pub fn predicted_decrease(&self, step: &DVector<T>) -> T {
        let half = <T as Scalar>::from_f64(0.5);
        -(self.gradient.dot(step) + half * self.curvature_along(step))
    }

    /// `<v, H v>`.
    pub fn curvature_along(&self, v: &DVector<T>) -> T {
        v.dot(&(self.hessian * v))
    }
}

/// Strategy used to solve the trust-region subproblem.
///
/// Both methods read the model curvature: the Cauchy step length depends on
/// `<g, H g>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrustRegionSearchMethod {
    /// Cauchy point along steepest descent
    #[default]
    Cauchy,
    /// Dogleg path between the Cauchy point and the Newton step
    Dogleg,
}

impl TrustRegionSearchMethod {
    /// Solves the subproblem with the corresponding solver.
    pub fn solve<T: Scalar>(self, model: &QuadraticModel<'_, T>, radius: T) -> Result<SubproblemSolution<T>> {
        match self {
            Self::Cauchy => CauchyPoint.solve(model, radius),
            Self::Dogleg => Dogleg.solve(model, radius),
        }
    }
}

/// Kind of step produced by a subproblem solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Full Newton step strictly inside the region
    Newton,
    /// Model minimizer along `-g` inside the region
    Cauchy,
    /// Steepest descent to the region boundary
    BoundaryCauchy,
    /// Intersection of the dogleg path with the boundary
    Dogleg,
}

/// Approximate solution of the trust-region subproblem.
#[derive(Debug, Clone)]
pub struct SubproblemSolution<T: Scalar> {
    /// Step `p` with `‖p‖ ≤ Δ`
    pub step: DVector<T>,
    /// `m(0) - m(p)`
    pub predicted_decrease: T,
    /// Whether `p` lies on the region boundary
    pub hit_boundary: bool,
    /// How the step was obtained
    pub kind: StepKind,
}

impl<T: Scalar> SubproblemSolution<T> {
    fn new(model: &QuadraticModel<'_, T>, step: DVector<T>, kind: StepKind) -> Self {
        Self {
            predicted_decrease: model.predicted_decrease(&step),
            hit_boundary: matches!(kind, StepKind::BoundaryCauchy | StepKind::Dogleg),
            step,
            kind,
        }
    }

    fn zero(dimension: usize) -> Self {
        Self {
            step: DVector::zeros(dimension),
            predicted_decrease: T::zero(),
            hit_boundary: false,
            kind: StepKind::Cauchy,
        }
    }
}

/// Trait for trust-region subproblem solvers.
pub trait SubproblemSolver<T: Scalar>: Debug {
    /// Approximately minimizes `model` inside the ball of radius `radius`.
    ///
    /// A zero gradient yields the zero step with zero predicted decrease.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `radius` is not positive and finite.
    fn solve(&self, model: &QuadraticModel<'_, T>, radius: T) -> Result<SubproblemSolution<T>>;

    /// Returns the name of this solver.
    fn name(&self) -> &str;
}

fn check_radius<T: Scalar>(radius: T) -> Result<()> {
    if radius > T::zero() && <T as Float>::is_finite(radius) {
        Ok(())
    } else {
        Err(OptimizerError::invalid_configuration(
            "trust-region radius must be positive and finite",
            "radius",
            radius.to_string(),
        ))
    }
}

/// Cauchy point solver.
///
/// `τ = 1` if `<g, H g> ≤ 0`, else `τ = min(‖g‖³ / (Δ <g, H g>), 1)`, and
/// `p = -τ Δ g / ‖g‖`. With zero or negative curvature along `g` this is a
/// steepest-descent step to the boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CauchyPoint;

impl<T: Scalar> SubproblemSolver<T> for CauchyPoint {
    fn solve(&self, model: &QuadraticModel<'_, T>, radius: T) -> Result<SubproblemSolution<T>> {
        check_radius(radius)?;
        let g = model.gradient();
        let g_norm = g.norm();
        if g_norm == T::zero() {
            return Ok(SubproblemSolution::zero(g.len()));
        }

        let g_hg = model.curvature_along(g);
        let tau = if g_hg > T::zero() {
            <T as Float>::min(g_norm * g_norm * g_norm / (radius * g_hg), T::one())
        } else {
            T::one()
        };

        let step = g * (-tau * radius / g_norm);
        let kind = if tau < T::one() {
            StepKind::Cauchy
        } else {
            StepKind::BoundaryCauchy
        };
        Ok(SubproblemSolution::new(model, step, kind))
    }

    fn name(&self) -> &str {
        "Cauchy"
    }
}

/// Dogleg solver.
///
/// Requires a positive definite `H`; otherwise the Cauchy point is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dogleg;

impl<T: Scalar> SubproblemSolver<T> for Dogleg {
    fn solve(&self, model: &QuadraticModel<'_, T>, radius: T) -> Result<SubproblemSolution<T>> {
        check_radius(radius)?;
        let g = model.gradient();
        let g_norm = g.norm();
        if g_norm == T::zero() {
            return Ok(SubproblemSolution::zero(g.len()));
        }

        let Some(cholesky) = model.hessian().clone().cholesky() else {
            debug!("model curvature is not positive definite, using the Cauchy point");
            return CauchyPoint.solve(model, radius);
        };

        let newton = -cholesky.solve(g);
        let newton_norm = newton.norm();
        if newton_norm <= radius {
            debug!("take full Newton step, |p| = {newton_norm}");
            return Ok(SubproblemSolution::new(model, newton, StepKind::Newton));
        }

        // Unconstrained minimizer along -g; positive curvature is guaranteed here.
        let cauchy = g * (-g.dot(g) / model.curvature_along(g));
        let cauchy_norm = cauchy.norm();
        if cauchy_norm >= radius {
            let step = g * (-radius / g_norm);
            debug!("take steepest descent to the boundary, |p_U| = {cauchy_norm}");
            return Ok(SubproblemSolution::new(model, step, StepKind::BoundaryCauchy));
        }

        // Solve ‖p_U + τ (p_B - p_U)‖ = Δ for τ ∈ (0, 1):
        // a τ² + 2b τ - c = 0 with a = ‖p_B - p_U‖², b = <p_U, p_B - p_U>,
        // c = Δ² - ‖p_U‖² > 0. Only the positive root is needed.
        let diff = &newton - &cauchy;
        let a = diff.norm_squared();
        let b = cauchy.dot(&diff);
        let c = radius * radius - cauchy_norm * cauchy_norm;
        let d = <T as Float>::sqrt(b * b + a * c);
        let tau = if b <= T::zero() { (d - b) / a } else { c / (b + d) };

        let mut step = cauchy;
        step.axpy(tau, &diff, T::one());
        debug!("take dogleg step (factor = {tau})");
        Ok(SubproblemSolution::new(model, step, StepKind::Dogleg))
    }

    fn name(&self) -> &str {
        "Dogleg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn diagonal(entries: &[f64]) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_row_slice(entries))
    }

    #[test]
    fn test_model_quantities() {
        let g = DVector::from_vec(vec![1.0, -1.0]);
        let h = diagonal(&[2.0, 4.0]);
        let m = QuadraticModel::new(3.0, &g, &h).unwrap();
        let p = DVector::from_vec(vec![1.0, 1.0]);

        assert_relative_eq!(m.curvature_along(&p), 6.0);
        assert_relative_eq!(m.predicted_decrease(&p), -3.0);
        assert_relative_eq!(m.model_value(&p), 6.0);
    }

    #[test]
    fn test_model_shape_checked() {
        let g = DVector::<f64>::zeros(3);
        let h = DMatrix::zeros(2, 3);
        let err = QuadraticModel::new(0.0, &g, &h).unwrap_err();
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_cauchy_zero_hessian_hits_boundary() {
        let g = DVector::from_vec(vec![3.0, 4.0]);
        let h = DMatrix::zeros(2, 2);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        let solution = CauchyPoint.solve(&m, 2.0).unwrap();

        assert_eq!(solution.kind, StepKind::BoundaryCauchy);
        assert!(solution.hit_boundary);
        assert_relative_eq!(solution.step.norm(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(solution.step, DVector::from_vec(vec![-1.2, -1.6]), epsilon = 1e-12);
        assert_relative_eq!(solution.predicted_decrease, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cauchy_interior_minimizer() {
        let g = DVector::from_vec(vec![1.0, 0.0]);
        let h = DMatrix::identity(2, 2) * 10.0;
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        let solution = CauchyPoint.solve(&m, 1.0).unwrap();

        assert_eq!(solution.kind, StepKind::Cauchy);
        assert!(!solution.hit_boundary);
        assert_relative_eq!(solution.step, DVector::from_vec(vec![-0.1, 0.0]), epsilon = 1e-12);
        assert_relative_eq!(solution.predicted_decrease, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_cauchy_negative_curvature() {
        let g = DVector::from_vec(vec![1.0, 0.0]);
        let h = DMatrix::identity(2, 2) * -1.0;
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        let solution = CauchyPoint.solve(&m, 0.5).unwrap();
        assert_eq!(solution.kind, StepKind::BoundaryCauchy);
        assert_relative_eq!(solution.step[0], -0.5);
    }

    #[test]
    fn test_zero_gradient_gives_zero_step() {
        let g = DVector::zeros(2);
        let h = DMatrix::identity(2, 2);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        for solution in [CauchyPoint.solve(&m, 1.0).unwrap(), Dogleg.solve(&m, 1.0).unwrap()] {
            assert_eq!(solution.step, DVector::zeros(2));
            assert_eq!(solution.predicted_decrease, 0.0);
            assert!(!solution.hit_boundary);
        }
    }

    #[test]
    fn test_invalid_radius() {
        let g = DVector::from_vec(vec![1.0]);
        let h = DMatrix::identity(1, 1);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        assert!(CauchyPoint.solve(&m, 0.0).is_err());
        assert!(Dogleg.solve(&m, f64::NAN).is_err());
    }

    #[test]
    fn test_dogleg_newton_inside() {
        let g = DVector::from_vec(vec![2.0, 4.0]);
        let h = diagonal(&[2.0, 4.0]);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        let solution = Dogleg.solve(&m, 2.0).unwrap();

        assert_eq!(solution.kind, StepKind::Newton);
        assert!(!solution.hit_boundary);
        assert_relative_eq!(solution.step, DVector::from_vec(vec![-1.0, -1.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_dogleg_boundary_cases() {
        let g = DVector::from_vec(vec![2.0, 4.0]);
        let h = diagonal(&[2.0, 4.0]);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();

        // |p_U| ≈ 1.242, |p_B| ≈ 1.414
        let solution = Dogleg.solve(&m, 1.2).unwrap();
        assert_eq!(solution.kind, StepKind::BoundaryCauchy);
        assert_relative_eq!(solution.step.norm(), 1.2, epsilon = 1e-12);

        let solution = Dogleg.solve(&m, 1.3).unwrap();
        assert_eq!(solution.kind, StepKind::Dogleg);
        assert!(solution.hit_boundary);
        assert_relative_eq!(solution.step.norm(), 1.3, epsilon = 1e-10);
        assert!(solution.predicted_decrease > 0.0);
    }

    #[test]
    fn test_dogleg_falls_back_to_cauchy() {
        let g = DVector::from_vec(vec![1.0, 1.0]);
        let h = diagonal(&[1.0, -1.0]);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        let dogleg = Dogleg.solve(&m, 0.5).unwrap();
        let cauchy = CauchyPoint.solve(&m, 0.5).unwrap();

        assert_eq!(dogleg.kind, StepKind::BoundaryCauchy);
        assert_eq!(dogleg.step, cauchy.step);
    }

    #[test]
    fn test_search_method() {
        assert_eq!(TrustRegionSearchMethod::default(), TrustRegionSearchMethod::Cauchy);

        let g = DVector::from_vec(vec![2.0, 4.0]);
        let h = diagonal(&[2.0, 4.0]);
        let m = QuadraticModel::new(0.0, &g, &h).unwrap();
        let solution = TrustRegionSearchMethod::Dogleg.solve(&m, 2.0).unwrap();
        assert_eq!(solution.kind, StepKind::Newton);
        assert_eq!(SubproblemSolver::<f64>::name(&Dogleg), "Dogleg");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn solutions_stay_inside_and_decrease_model(
            g in prop::collection::vec(-10.0f64..10.0, 3),
            diag in prop::collection::vec(-2.0f64..5.0, 3),
            radius in 0.1f64..5.0,
        ) {
            let g = DVector::from_vec(g);
            let h = diagonal(&diag);
            let m = QuadraticModel::new(0.0, &g, &h).unwrap();
            for method in [TrustRegionSearchMethod::Cauchy, TrustRegionSearchMethod::Dogleg] {
                let solution = method.solve(&m, radius).unwrap();
                prop_assert!(solution.step.norm() <= radius * (1.0 + 1e-10));
                prop_assert!(solution.predicted_decrease >= -1e-12);
            }
        }
    }
}

//! Integration tests for the objective function interface.
//!
//! This module tests:
//! - User-defined objectives relying on the trait defaults
//! - Evaluation counting through the counting wrapper
//! - Derivative checking against finite differences
//! - Objectives used through shared references

use approx::assert_relative_eq;
use minopt_core::prelude::*;
use pretty_assertions::assert_eq;

/// Shifted quadratic f(x) = 0.5 * ||x - target||^2 without a Hessian override.
#[derive(Debug, Clone)]
struct ShiftedQuadratic<T: Scalar> {
    target: DVector<T>,
}

impl<T: Scalar> ObjectiveFunction<T> for ShiftedQuadratic<T> {
    fn evaluate(&self, x: &DVector<T>) -> Result<T> {
        let diff = x - &self.target;
        Ok(<T as Scalar>::from_f64(0.5) * diff.dot(&diff))
    }

    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()> {
        out_gradient.copy_from(&(x - &self.target));
        Ok(())
    }

    fn num_dimensions(&self) -> usize {
        self.target.len()
    }
}

/// Exponential sum f(x) = Σ exp(a_i x_i), used to check non-polynomial derivatives.
#[derive(Debug)]
struct ExponentialSum {
    rates: Vec<f64>,
}

impl ObjectiveFunction<f64> for ExponentialSum {
    fn evaluate(&self, x: &DVector<f64>) -> Result<f64> {
        Ok(self.rates.iter().zip(x.iter()).map(|(a, xi)| (a * xi).exp()).sum())
    }

    fn gradient(&self, x: &DVector<f64>, out_gradient: &mut DVector<f64>) -> Result<()> {
        for (i, (a, xi)) in self.rates.iter().zip(x.iter()).enumerate() {
            out_gradient[i] = a * (a * xi).exp();
        }
        Ok(())
    }

    fn hessian(&self, x: &DVector<f64>, out_hessian: &mut DMatrix<f64>) -> Result<()> {
        out_hessian.fill(0.0);
        for (i, (a, xi)) in self.rates.iter().zip(x.iter()).enumerate() {
            out_hessian[(i, i)] = a * a * (a * xi).exp();
        }
        Ok(())
    }

    fn num_dimensions(&self) -> usize {
        self.rates.len()
    }
}

#[test]
fn test_default_methods() {
    let f = ShiftedQuadratic {
        target: DVector::from_vec(vec![1.0, -2.0, 0.5]),
    };
    let x = DVector::from_vec(vec![0.0, 0.0, 0.0]);

    let mut g = DVector::zeros(3);
    let value = f.evaluate_with_gradient(&x, &mut g).unwrap();
    assert_relative_eq!(value, 0.5 * (1.0 + 4.0 + 0.25));
    assert_relative_eq!(g, DVector::from_vec(vec![-1.0, 2.0, -0.5]));

    let mut h = DMatrix::identity(3, 3);
    f.hessian(&x, &mut h).unwrap();
    assert_eq!(h, DMatrix::zeros(3, 3));
}

#[test]
fn test_f32_objective() {
    let f = ShiftedQuadratic::<f32> {
        target: DVector::from_vec(vec![2.0, 2.0]),
    };
    let x = DVector::from_vec(vec![0.0f32, 0.0]);
    assert_relative_eq!(f.evaluate(&x).unwrap(), 4.0f32);
}

#[test]
fn test_counting_through_reference() {
    let counted = CountingFunction::new(QuadraticFunction::<f64>::isotropic(4));
    let x = DVector::from_element(4, 1.0);
    let mut g = DVector::zeros(4);

    {
        let shared: &dyn ObjectiveFunction<f64> = &counted;
        for _ in 0..3 {
            shared.evaluate(&x).unwrap();
        }
        shared.gradient(&x, &mut g).unwrap();
    }

    assert_eq!(counted.counts(), (3, 1, 0));
    counted.reset_counts();
    assert_eq!(counted.counts(), (0, 0, 0));
}

#[test]
fn test_finite_differences_match_analytic() {
    let f = ExponentialSum {
        rates: vec![0.5, -1.0, 2.0],
    };
    let x = DVector::from_vec(vec![0.3, -0.2, 0.1]);

    let mut analytic = DVector::zeros(3);
    let mut approximate = DVector::zeros(3);
    f.gradient(&x, &mut analytic).unwrap();
    finite_difference_gradient(&f, &x, &mut approximate).unwrap();
    assert_relative_eq!(analytic, approximate, epsilon = 1e-6);

    let (passes, _) = DerivativeChecker::check_gradient(&f, &x, 1e-6).unwrap();
    assert!(passes);
    let (passes, error) = DerivativeChecker::check_hessian(&f, &x, 1e-5).unwrap();
    assert!(passes, "hessian error {error}");
}

#[test]
fn test_finite_difference_rejects_wrong_buffer() {
    let f = QuadraticFunction::<f64>::isotropic(3);
    let x = DVector::<f64>::zeros(3);
    let mut g = DVector::<f64>::zeros(2);
    let err = finite_difference_gradient(&f, &x, &mut g).unwrap_err();
    assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
}

#[test]
fn test_quadratic_with_minimizer_gradient_vanishes() {
    let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
    let minimizer = DVector::from_vec(vec![1.0, 2.0, 3.0]);
    let f = QuadraticFunction::with_minimizer(a.clone(), &minimizer).unwrap();

    let mut g = DVector::zeros(3);
    f.gradient(&minimizer, &mut g).unwrap();
    assert_relative_eq!(g.norm(), 0.0, epsilon = 1e-12);

    let mut h = DMatrix::zeros(3, 3);
    f.hessian(&minimizer, &mut h).unwrap();
    assert_eq!(h, a);
}

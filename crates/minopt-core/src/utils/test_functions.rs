//! Classic unconstrained test problems shared by tests and benchmarks.
//!
//! Both problems have the global minimizer `(1, ..., 1)` with value zero.
//! By default they report the zero Hessian, so the trust-region Cauchy
//! solver degenerates into a steepest-descent step to the region boundary.

#![cfg(any(test, feature = "test-utils"))]

use crate::{
    core::objective::{check_dimension, ObjectiveFunction},
    error::{OptimizerError, Result},
    types::{DMatrix, DVector, Scalar},
};
use rand::Rng;

fn c<T: Scalar>(v: f64) -> T {
    <T as Scalar>::from_f64(v)
}

fn check_buffer<T: Scalar>(expected: usize, buffer: &DVector<T>) -> Result<()> {
    if buffer.len() != expected {
        return Err(OptimizerError::function_evaluation(format!(
            "gradient buffer has length {}, expected {expected}",
            buffer.len()
        )));
    }
    Ok(())
}

/// Extended Rosenbrock function.
///
/// `f(x) = Σ_{i=0}^{n-2} 100 (x_i² - x_{i+1})² + (x_i - 1)²`
#[derive(Debug, Clone)]
pub struct ExtendedRosenbrock {
    dimension: usize,
    exact_hessian: bool,
}

impl ExtendedRosenbrock {
    /// Creates the function in `dimension >= 2` variables.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension < 2 {
            return Err(OptimizerError::invalid_configuration(
                "Rosenbrock needs at least two variables",
                "dimension",
                dimension.to_string(),
            ));
        }
        Ok(Self {
            dimension,
            exact_hessian: false,
        })
    }

    /// Creates the function with a random even dimension `2k`, `k ∈ [2, 100]`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            dimension: 2 * rng.gen_range(2..=100),
            exact_hessian: false,
        }
    }

    /// Reports the analytic (tridiagonal) Hessian instead of the zero matrix.
    pub fn with_exact_hessian(mut self) -> Self {
        self.exact_hessian = true;
        self
    }

    /// The standard start `(-1.2, 1, -1.2, 1, ...)`.
    pub fn starting_iterate<T: Scalar>(&self) -> DVector<T> {
        DVector::from_fn(self.dimension, |i, _| {
            if i % 2 == 0 {
                c(-1.2)
            } else {
                T::one()
            }
        })
    }
}

impl<T: Scalar> ObjectiveFunction<T> for ExtendedRosenbrock {
    fn evaluate(&self, x: &DVector<T>) -> Result<T> {
        check_dimension(self, x)?;
        let hundred = c::<T>(100.0);
        Ok(x.as_slice().windows(2).fold(T::zero(), |acc, pair| {
            let a = pair[0] * pair[0] - pair[1];
            let b = pair[0] - T::one();
            acc + hundred * a * a + b * b
        }))
    }

    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()> {
        check_dimension(self, x)?;
        check_buffer(self.dimension, out_gradient)?;
        let n = self.dimension;

        out_gradient.fill(T::zero());
        for k in 0..n - 1 {
            out_gradient[k] = c::<T>(400.0) * x[k] * (x[k] * x[k] - x[k + 1]) + c::<T>(2.0) * (x[k] - T::one());
            if k > 0 {
                out_gradient[k] += c::<T>(200.0) * (x[k] - x[k - 1] * x[k - 1]);
            }
        }
        out_gradient[n - 1] = c::<T>(200.0) * (x[n - 1] - x[n - 2] * x[n - 2]);
        Ok(())
    }

    fn hessian(&self, x: &DVector<T>, out_hessian: &mut DMatrix<T>) -> Result<()> {
        out_hessian.fill(T::zero());
        if !self.exact_hessian {
            return Ok(());
        }
        check_dimension(self, x)?;

        let n = self.dimension;
        for i in 0..n - 1 {
            out_hessian[(i, i)] += c::<T>(1200.0) * x[i] * x[i] - c::<T>(400.0) * x[i + 1] + c::<T>(2.0);
            out_hessian[(i + 1, i + 1)] += c::<T>(200.0);
            let off = c::<T>(-400.0) * x[i];
            out_hessian[(i, i + 1)] = off;
            out_hessian[(i + 1, i)] = off;
        }
        Ok(())
    }

    fn num_dimensions(&self) -> usize {
        self.dimension
    }
}

/// Wood function in four variables.
///
/// `f(x) = 100 (x₀² - x₁)² + (1 - x₀)² + 90 (x₂² - x₃)² + (1 - x₂)²
///         + 10.1 ((1 - x₁)² + (1 - x₃)²) + 19.8 (1 - x₁)(1 - x₃)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Wood;

impl Wood {
    /// Creates the Wood function.
    pub fn new() -> Self {
        Self
    }

    /// The standard start `(-3, -1, -3, -1)`.
    pub fn starting_iterate<T: Scalar>(&self) -> DVector<T> {
        DVector::from_vec(vec![c(-3.0), c(-1.0), c(-3.0), c(-1.0)])
    }
}

impl<T: Scalar> ObjectiveFunction<T> for Wood {
    fn evaluate(&self, x: &DVector<T>) -> Result<T> {
        check_dimension(self, x)?;
        let one = T::one();
        let a = x[0] * x[0] - x[1];
        let b = x[2] * x[2] - x[3];
        Ok(c::<T>(100.0) * a * a
            + (one - x[0]) * (one - x[0])
            + c::<T>(90.0) * b * b
            + (one - x[2]) * (one - x[2])
            + c::<T>(10.1) * ((one - x[1]) * (one - x[1]) + (one - x[3]) * (one - x[3]))
            + c::<T>(19.8) * (one - x[1]) * (one - x[3]))
    }

    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()> {
        check_dimension(self, x)?;
        check_buffer(4, out_gradient)?;
        let one = T::one();

        out_gradient[0] = c::<T>(400.0) * x[0] * (x[0] * x[0] - x[1]) + c::<T>(2.0) * (x[0] - one);
        out_gradient[1] =
            c::<T>(200.0) * (x[1] - x[0] * x[0]) + c::<T>(20.2) * (x[1] - one) + c::<T>(19.8) * (x[3] - one);
        out_gradient[2] = c::<T>(360.0) * x[2] * (x[2] * x[2] - x[3]) + c::<T>(2.0) * (x[2] - one);
        out_gradient[3] =
            c::<T>(180.0) * (x[3] - x[2] * x[2]) + c::<T>(20.2) * (x[3] - one) + c::<T>(19.8) * (x[1] - one);
        Ok(())
    }

    fn num_dimensions(&self) -> usize {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::objective::DerivativeChecker;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_rosenbrock_minimum() {
        let f = ExtendedRosenbrock::new(6).unwrap();
        let ones = DVector::from_element(6, 1.0);
        assert_relative_eq!(ObjectiveFunction::<f64>::evaluate(&f, &ones).unwrap(), 0.0);

        let mut g = DVector::zeros(6);
        f.gradient(&ones, &mut g).unwrap();
        assert_relative_eq!(g.norm(), 0.0);
    }

    #[test]
    fn test_rosenbrock_start() {
        let f = ExtendedRosenbrock::new(4).unwrap();
        let x0: DVector<f64> = f.starting_iterate();
        assert_eq!(x0.as_slice(), &[-1.2, 1.0, -1.2, 1.0]);
        // 24.2 for each (-1.2, 1) pair, 484 for the (1, -1.2) pair between them
        assert_relative_eq!(f.evaluate(&x0).unwrap(), 532.4, epsilon = 1e-10);
    }

    #[test]
    fn test_rosenbrock_derivatives() {
        let f = ExtendedRosenbrock::new(5).unwrap().with_exact_hessian();
        let x = DVector::from_vec(vec![-1.2, 1.0, 0.3, -0.7, 2.0]);

        let (passes, error) = DerivativeChecker::check_gradient(&f, &x, 1e-3).unwrap();
        assert!(passes, "gradient error {error}");

        let (passes, error) = DerivativeChecker::check_hessian(&f, &x, 1e-3).unwrap();
        assert!(passes, "hessian error {error}");

        let (symmetric, _) = DerivativeChecker::check_hessian_symmetry(&f, &x, 1e-12).unwrap();
        assert!(symmetric);
    }

    #[test]
    fn test_rosenbrock_zero_hessian_by_default() {
        let f = ExtendedRosenbrock::new(3).unwrap();
        let x = DVector::from_element(3, 2.0);
        let mut h = DMatrix::from_element(3, 3, 1.0);
        f.hessian(&x, &mut h).unwrap();
        assert_eq!(h, DMatrix::zeros(3, 3));
    }

    #[test]
    fn test_rosenbrock_random_dimension() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let f = ExtendedRosenbrock::random(&mut rng);
            let n = ObjectiveFunction::<f64>::num_dimensions(&f);
            assert_eq!(n % 2, 0);
            assert!((4..=200).contains(&n));
        }
    }

    #[test]
    fn test_rosenbrock_rejects_small_dimension() {
        assert!(ExtendedRosenbrock::new(1).is_err());
    }

    #[test]
    fn test_wood() {
        let f = Wood::new();
        let ones = DVector::from_element(4, 1.0);
        assert_relative_eq!(f.evaluate(&ones).unwrap(), 0.0, epsilon = 1e-12);

        let x0: DVector<f64> = f.starting_iterate();
        assert_relative_eq!(f.evaluate(&x0).unwrap(), 19192.0, epsilon = 1e-9);

        let (passes, error) = DerivativeChecker::check_gradient(&f, &x0, 1e-2).unwrap();
        assert!(passes, "gradient error {error}");
    }

    #[test]
    fn test_gradient_buffer_checked() {
        let f = Wood::new();
        let x = DVector::from_element(4, 0.0);
        let mut short = DVector::zeros(3);
        let err = f.gradient(&x, &mut short).unwrap_err();
        assert!(matches!(err, OptimizerError::FunctionEvaluation { .. }));
    }
}

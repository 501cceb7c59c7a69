//! Objective function interface for optimization algorithms.
//!
//! An objective is a smooth function `f: R^n -> R` that can evaluate itself,
//! write its gradient into a caller-provided buffer and, optionally, write an
//! `n x n` Hessian approximation. Optimizers hold a shared reference to the
//! function and never mutate it, so one function object can drive several
//! independent runs.
//!
//! # Contract
//!
//! - `evaluate` is deterministic and free of observable side effects.
//! - `gradient` is consistent with `evaluate` (checked by [`DerivativeChecker`]).
//! - `hessian` writes a symmetric matrix. The default implementation writes
//!   the zero matrix, a surrogate that turns the trust-region Cauchy step into
//!   a steepest-descent step to the region boundary.
//! - The dimension reported by `num_dimensions` never changes.

use crate::{
    error::{OptimizerError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::Debug;

/// Trait for objective functions over `R^n`.
///
/// This is the main trait that optimization algorithms use to evaluate
/// the objective function and its derivatives.
pub trait ObjectiveFunction<T: Scalar>: Debug {
    /// Evaluates the objective at `x`.
    fn evaluate(&self, x: &DVector<T>) -> Result<T>;

    /// Writes the gradient at `x` into `out_gradient`.
    ///
    /// `out_gradient` has length `num_dimensions()`.
    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()>;

    /// Writes a Hessian approximation at `x` into `out_hessian`.
    ///
    /// # Default Implementation
    ///
    /// Writes the zero matrix.
    fn hessian(&self, _x: &DVector<T>, out_hessian: &mut DMatrix<T>) -> Result<()> {
        out_hessian.fill(T::zero());
        Ok(())
    }

    /// Returns the dimension `n` of the domain.
    fn num_dimensions(&self) -> usize;

    /// Evaluates the objective and writes the gradient in one call.
    ///
    /// Override when value and gradient share intermediate work.
    fn evaluate_with_gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<T> {
        self.gradient(x, out_gradient)?;
        self.evaluate(x)
    }
}

impl<T: Scalar, F: ObjectiveFunction<T> + ?Sized> ObjectiveFunction<T> for &F {
    fn evaluate(&self, x: &DVector<T>) -> Result<T> {
        (**self).evaluate(x)
    }

    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()> {
        (**self).gradient(x, out_gradient)
    }

    fn hessian(&self, x: &DVector<T>, out_hessian: &mut DMatrix<T>) -> Result<()> {
        (**self).hessian(x, out_hessian)
    }

    fn num_dimensions(&self) -> usize {
        (**self).num_dimensions()
    }

    fn evaluate_with_gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<T> {
        (**self).evaluate_with_gradient(x, out_gradient)
    }
}

/// Checks that `x` has the dimension the function expects.
pub fn check_dimension<T, F>(function: &F, x: &DVector<T>) -> Result<()>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    let expected = function.num_dimensions();
    if x.len() != expected {
        return Err(OptimizerError::dimension_mismatch(expected, x.len()));
    }
    Ok(())
}

/// Approximates the gradient of `function` at `x` by central differences.
///
/// Uses the step `h = sqrt(eps)` on every coordinate, which costs `2n`
/// function evaluations.
pub fn finite_difference_gradient<T, F>(
    function: &F,
    x: &DVector<T>,
    out_gradient: &mut DVector<T>,
) -> Result<()>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    check_dimension(function, x)?;
    if out_gradient.len() != x.len() {
        return Err(OptimizerError::dimension_mismatch(x.len(), out_gradient.len()));
    }

    let h = <T as Float>::sqrt(T::EPSILON);
    let mut shifted = x.clone();

    for i in 0..x.len() {
        let original = shifted[i];

        shifted[i] = original + h;
        let f_plus = function.evaluate(&shifted)?;
        shifted[i] = original - h;
        let f_minus = function.evaluate(&shifted)?;
        shifted[i] = original;

        out_gradient[i] = (f_plus - f_minus) / (h + h);
    }

    Ok(())
}

/// A quadratic objective for testing.
///
/// Computes `f(x) = 0.5 * x^T * A * x + b^T * x + c`. The Hessian is `A`,
/// which should be symmetric.
#[derive(Debug, Clone)]
pub struct QuadraticFunction<T: Scalar> {
    /// The quadratic form matrix (should be symmetric)
    pub a: DMatrix<T>,
    /// The linear term
    pub b: DVector<T>,
    /// The constant term
    pub c: T,
}

impl<T: Scalar> QuadraticFunction<T> {
    /// Creates a new quadratic objective.
    ///
    /// Fails if `a` is not square or `b` does not match its size.
    pub fn new(a: DMatrix<T>, b: DVector<T>, c: T) -> Result<Self> {
        if a.nrows() != a.ncols() {
            return Err(OptimizerError::dimension_mismatch(
                format!("{0}x{0}", a.nrows()),
                format!("{}x{}", a.nrows(), a.ncols()),
            ));
        }
        if b.len() != a.nrows() {
            return Err(OptimizerError::dimension_mismatch(a.nrows(), b.len()));
        }
        Ok(Self { a, b, c })
    }

    /// Creates `f(x) = 0.5 * ||x||^2`.
    pub fn isotropic(dim: usize) -> Self {
        Self {
            a: DMatrix::identity(dim, dim),
            b: DVector::zeros(dim),
            c: T::zero(),
        }
    }

    /// Creates `f(x) = 0.5 * (x - x*)^T A (x - x*)` whose minimizer is `x*`
    /// when `A` is positive definite. The minimum value is zero.
    pub fn with_minimizer(a: DMatrix<T>, minimizer: &DVector<T>) -> Result<Self> {
        let ax = &a * minimizer;
        let c = minimizer.dot(&ax) * <T as Scalar>::from_f64(0.5);
        Self::new(a, -ax, c)
    }
}

impl<T: Scalar> ObjectiveFunction<T> for QuadraticFunction<T> {
    fn evaluate(&self, x: &DVector<T>) -> Result<T> {
        check_dimension(self, x)?;
        let ax = &self.a * x;
        Ok(x.dot(&ax) * <T as Scalar>::from_f64(0.5) + self.b.dot(x) + self.c)
    }

    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()> {
        check_dimension(self, x)?;
        out_gradient.copy_from(&self.b);
        out_gradient.gemv(T::one(), &self.a, x, T::one());
        Ok(())
    }

    fn hessian(&self, _x: &DVector<T>, out_hessian: &mut DMatrix<T>) -> Result<()> {
        out_hessian.copy_from(&self.a);
        Ok(())
    }

    fn num_dimensions(&self) -> usize {
        self.b.len()
    }

    fn evaluate_with_gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<T> {
        check_dimension(self, x)?;
        let ax = &self.a * x;
        let value = x.dot(&ax) * <T as Scalar>::from_f64(0.5) + self.b.dot(x) + self.c;
        out_gradient.copy_from(&(ax + &self.b));
        Ok(value)
    }
}

/// Wrapper to count function evaluations for testing and debugging.
#[derive(Debug)]
pub struct CountingFunction<F> {
    /// The wrapped objective
    pub inner: F,
    evaluations: Cell<usize>,
    gradients: Cell<usize>,
    hessians: Cell<usize>,
}

impl<F> CountingFunction<F> {
    /// Creates a new counting wrapper around an objective.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            evaluations: Cell::new(0),
            gradients: Cell::new(0),
            hessians: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.evaluations.set(0);
        self.gradients.set(0);
        self.hessians.set(0);
    }

    /// Returns `(evaluations, gradients, hessians)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.evaluations.get(),
            self.gradients.get(),
            self.hessians.get(),
        )
    }
}

impl<T: Scalar, F: ObjectiveFunction<T>> ObjectiveFunction<T> for CountingFunction<F> {
    fn evaluate(&self, x: &DVector<T>) -> Result<T> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.inner.evaluate(x)
    }

    fn gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<()> {
        self.gradients.set(self.gradients.get() + 1);
        self.inner.gradient(x, out_gradient)
    }

    fn hessian(&self, x: &DVector<T>, out_hessian: &mut DMatrix<T>) -> Result<()> {
        self.hessians.set(self.hessians.get() + 1);
        self.inner.hessian(x, out_hessian)
    }

    fn num_dimensions(&self) -> usize {
        self.inner.num_dimensions()
    }

    fn evaluate_with_gradient(&self, x: &DVector<T>, out_gradient: &mut DVector<T>) -> Result<T> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.gradients.set(self.gradients.get() + 1);
        self.inner.evaluate_with_gradient(x, out_gradient)
    }
}

/// Utilities for checking gradient and Hessian implementations.
pub struct DerivativeChecker;

impl DerivativeChecker {
    /// Checks if the gradient implementation matches finite differences.
    ///
    /// # Returns
    ///
    /// A tuple of (passes, max_error) where passes indicates if the
    /// gradient is correct within tolerance, and max_error is the
    /// maximum component-wise error.
    pub fn check_gradient<T, F>(function: &F, x: &DVector<T>, tol: T) -> Result<(bool, T)>
    where
        T: Scalar,
        F: ObjectiveFunction<T> + ?Sized,
    {
        let n = function.num_dimensions();
        let mut analytical = DVector::zeros(n);
        let mut approximate = DVector::zeros(n);
        function.gradient(x, &mut analytical)?;
        finite_difference_gradient(function, x, &mut approximate)?;

        let max_error = max_abs(analytical.iter().zip(approximate.iter()).map(|(a, b)| *a - *b));
        Ok((max_error < tol, max_error))
    }

    /// Checks if the Hessian implementation matches finite differences of
    /// the gradient.
    ///
    /// # Returns
    ///
    /// A tuple of (passes, max_error).
    pub fn check_hessian<T, F>(function: &F, x: &DVector<T>, tol: T) -> Result<(bool, T)>
    where
        T: Scalar,
        F: ObjectiveFunction<T> + ?Sized,
    {
        check_dimension(function, x)?;
        let n = x.len();
        let mut hessian = DMatrix::zeros(n, n);
        function.hessian(x, &mut hessian)?;

        let h = <T as Float>::sqrt(T::EPSILON);
        let mut shifted = x.clone();
        let mut grad_plus = DVector::zeros(n);
        let mut grad_minus = DVector::zeros(n);
        let mut max_error = T::zero();

        for i in 0..n {
            let original = shifted[i];
            shifted[i] = original + h;
            function.gradient(&shifted, &mut grad_plus)?;
            shifted[i] = original - h;
            function.gradient(&shifted, &mut grad_minus)?;
            shifted[i] = original;

            for j in 0..n {
                let column_fd = (grad_plus[j] - grad_minus[j]) / (h + h);
                let error = <T as Float>::abs(hessian[(j, i)] - column_fd);
                max_error = <T as Float>::max(max_error, error);
            }
        }

        Ok((max_error < tol, max_error))
    }

    /// Checks if the Hessian is symmetric.
    ///
    /// # Returns
    ///
    /// A tuple of (is_symmetric, max_asymmetry).
    pub fn check_hessian_symmetry<T, F>(function: &F, x: &DVector<T>, tol: T) -> Result<(bool, T)>
    where
        T: Scalar,
        F: ObjectiveFunction<T> + ?Sized,
    {
        let n = function.num_dimensions();
        let mut hessian = DMatrix::zeros(n, n);
        function.hessian(x, &mut hessian)?;

        let mut max_asymmetry = T::zero();
        for i in 0..n {
            for j in i + 1..n {
                let asymmetry = <T as Float>::abs(hessian[(i, j)] - hessian[(j, i)]);
                max_asymmetry = <T as Float>::max(max_asymmetry, asymmetry);
            }
        }

        Ok((max_asymmetry < tol, max_asymmetry))
    }
}

fn max_abs<T: Scalar>(values: impl Iterator<Item = T>) -> T {
    values
        .map(|v| <T as Float>::abs(v))
        .fold(T::zero(), |a, b| <T as Float>::max(a, b))
}

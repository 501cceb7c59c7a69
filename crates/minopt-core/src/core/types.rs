//! Scalar trait and dense linear algebra aliases.
//!
//! Every optimizer in the workspace is generic over `T: Scalar`, which is
//! implemented for `f32` and `f64`. The associated constants provide the
//! precision-dependent defaults of the line search, the stopping criterion,
//! the L-BFGS curvature filter and the trust-region radius floor.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Floating point type an objective can be minimized over.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon; also sets the finite-difference step `sqrt(EPSILON)`.
    const EPSILON: Self;

    /// Default `gradient_tolerance` of a `StoppingCriterion`.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Smallest `<s, y>` accepted for an L-BFGS curvature pair.
    const CURVATURE_THRESHOLD: Self;

    /// Default trust-region radius floor.
    const MIN_TRUST_RADIUS: Self;

    /// Largest step a line search may try.
    const MAX_STEP_SIZE: Self;

    /// Step below which a line search gives up.
    const MIN_STEP_SIZE: Self;

    /// Converts an `f64` literal.
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Converts to `f64` for log messages.
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-4;
    const CURVATURE_THRESHOLD: Self = 1e-6;
    const MIN_TRUST_RADIUS: Self = 1e-4;
    const MAX_STEP_SIZE: Self = 1e10;
    const MIN_STEP_SIZE: Self = 1e-12;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-6;
    const CURVATURE_THRESHOLD: Self = 1e-10;
    const MIN_TRUST_RADIUS: Self = 1e-8;
    const MAX_STEP_SIZE: Self = 1e10;
    const MIN_STEP_SIZE: Self = 1e-20;
}

/// Dynamically sized column-major matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Dynamically sized column vector.
pub type DVector<T> = OVector<T, Dyn>;

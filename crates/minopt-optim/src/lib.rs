//! minopt Optimization - Optimization algorithms for smooth unconstrained problems.
//!
//! This crate provides concrete implementations of two classical methods for
//! minimizing `f: ℝⁿ → ℝ`, both implementing
//! [`Optimizer`](minopt_core::optimizer::Optimizer).
//!
//! # Available Optimizers
//!
//! - **L-BFGS**: Limited memory Broyden-Fletcher-Goldfarb-Shanno with a strong
//!   Wolfe line search
//! - **Trust Region**: Trust region method with Cauchy point and dogleg
//!   subproblem solvers
//!
//! # Examples
//!
//! ```rust
//! use minopt_core::prelude::*;
//! use minopt_optim::{Lbfgs, LbfgsConfig};
//!
//! let f = QuadraticFunction::<f64>::isotropic(4);
//! let mut optimizer = Lbfgs::new(&f, LbfgsConfig::new().with_memory_size(5)).unwrap();
//!
//! let stopping_criterion = StoppingCriterion::new()
//!     .with_max_iterations(1000)
//!     .with_gradient_tolerance(1e-8);
//!
//! let mut x = DVector::from_element(4, 1.0);
//! let result = optimizer.optimize(&mut x, &stopping_criterion).unwrap();
//! assert!(result.converged);
//! ```

pub mod lbfgs;
pub mod subproblem;
pub mod trust_region;

// Re-export main optimizers for convenience
pub use lbfgs::{CurvatureHistory, Lbfgs, LbfgsConfig};
pub use subproblem::{
    CauchyPoint, Dogleg, QuadraticModel, StepKind, SubproblemSolution, SubproblemSolver,
    TrustRegionSearchMethod,
};
pub use trust_region::{TrustRegion, TrustRegionConfig};

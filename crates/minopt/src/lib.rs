//! # minopt
//!
//! Minimization of smooth functions `f: ℝⁿ → ℝ` without constraints.
//!
//! This crate bundles [`minopt_core`] (objective interface, line searches,
//! stopping criteria) and [`minopt_optim`] (the L-BFGS and trust-region
//! optimizers) behind a single dependency.
//!
//! ## Quick start
//!
//! ```rust
//! use minopt::prelude::*;
//!
//! // f(x) = ½‖x‖²
//! let f = QuadraticFunction::<f64>::isotropic(3);
//! let mut optimizer = Lbfgs::with_default_config(&f)?;
//!
//! let mut x = DVector::from_vec(vec![1.0, -2.0, 3.0]);
//! let result = optimizer.optimize(&mut x, &StoppingCriterion::new())?;
//!
//! assert!(result.converged);
//! assert!(x.norm() < 1e-6);
//! # Ok::<(), minopt::OptimizerError>(())
//! ```
//!
//! ## Features
//!
//! - `serde`: serialization of configurations and results
//! - `test-utils`: the Extended Rosenbrock and Wood test problems

pub use minopt_optim as optim;

pub use minopt_core::{error, line_search, objective, optimizer, types};
pub use minopt_core::{OptimizerError, Result};

#[cfg(feature = "test-utils")]
pub use minopt_core::utils::test_functions;

pub use nalgebra;

/// Commonly used items.
pub mod prelude {
    pub use minopt_core::prelude::*;

    pub use minopt_optim::{
        CauchyPoint, CurvatureHistory, Dogleg, Lbfgs, LbfgsConfig, QuadraticModel,
        SubproblemSolution, SubproblemSolver, TrustRegion, TrustRegionConfig,
        TrustRegionSearchMethod,
    };
}

/// Minimizes `function` from `x` with L-BFGS using the default configuration.
///
/// `x` holds the final iterate on return.
pub fn minimize_lbfgs<T, F>(
    function: &F,
    x: &mut types::DVector<T>,
    criterion: &optimizer::StoppingCriterion<T>,
) -> Result<optimizer::OptimizationResult<T>>
where
    T: types::Scalar,
    F: objective::ObjectiveFunction<T> + ?Sized,
{
    use optimizer::Optimizer;

    optim::Lbfgs::with_default_config(function)?.optimize(x, criterion)
}

/// Minimizes `function` from `x` with a trust-region method.
pub fn minimize_trust_region<T, F>(
    function: &F,
    x: &mut types::DVector<T>,
    method: optim::TrustRegionSearchMethod,
    criterion: &optimizer::StoppingCriterion<T>,
) -> Result<optimizer::OptimizationResult<T>>
where
    T: types::Scalar,
    F: objective::ObjectiveFunction<T> + ?Sized,
{
    use optimizer::Optimizer;

    let config = optim::TrustRegionConfig::new().with_search_method(method);
    optim::TrustRegion::new(function, config)?.optimize(x, criterion)
}

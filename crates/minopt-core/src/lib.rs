//! Core traits and types for unconstrained numerical optimization.
//!
//! This crate provides the foundations shared by the optimizers in
//! `minopt-optim`: the objective function interface, the scalar trait,
//! error types, line searches and the optimizer result/stopping framework.
//!
//! # Key Concepts
//!
//! - **Objective functions**: smooth `f: ℝⁿ → ℝ` supplying value, gradient
//!   and (optionally) a Hessian approximation
//! - **Line searches**: step size selection along descent directions
//! - **Stopping criteria**: gradient tolerance and evaluation budgets
//!
//! # Modules
//!
//! - [`objective`]: Objective function interface and helpers
//! - [`error`]: Error types for optimization
//! - [`line_search`]: Line search algorithms
//! - [`optimizer`]: Optimization result, status and stopping criterion
//! - [`types`]: Scalar trait and type aliases
//! - [`utils`]: Test problems (feature `test-utils`)

pub mod core;
pub mod optimization;
pub mod utils;

pub use crate::core::{error, objective, types};
pub use crate::optimization::{line_search, optimizer};

// Re-export commonly used items at the crate root
pub use error::{OptimizerError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use minopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{OptimizerError, Result};
    pub use crate::line_search::{
        BacktrackingLineSearch, LineSearch, LineSearchParams, LineSearchResult,
        StrongWolfeLineSearch,
    };
    pub use crate::objective::{
        finite_difference_gradient, CountingFunction, DerivativeChecker, ObjectiveFunction,
        QuadraticFunction,
    };
    pub use crate::optimizer::{
        EvaluationCounts, OptimizationResult, Optimizer, OptimizerStatus, StoppingCriterion,
        TerminationReason, UNBOUNDED_ITERATION_CAP,
    };
    pub use crate::types::{DMatrix, DVector, Scalar};
}

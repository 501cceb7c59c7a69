//! Error types for optimization.
//!
//! Configuration misuse and broken function contracts are reported as
//! [`OptimizerError`] values. Normal terminal conditions of a run (budget
//! exhaustion, stagnation) are not errors; they are reported through
//! [`TerminationReason`](crate::optimization::optimizer::TerminationReason).

use thiserror::Error;

/// Errors that can occur during optimization.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid optimizer configuration.
    ///
    /// This error occurs when the optimizer is configured with invalid
    /// parameters (e.g., empty curvature history, inverted radius bounds).
    /// It is raised before any iteration runs.
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Dimension mismatch between the objective function and a vector or matrix.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Line search failed to find an acceptable step.
    ///
    /// This error occurs when the line search algorithm cannot find
    /// a step size that satisfies the sufficient decrease and curvature
    /// conditions within its trial budget.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of trial steps attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
        /// Function value at the starting point
        initial_value: f64,
    },

    /// Invalid search direction.
    ///
    /// This error occurs when the search direction is not a descent direction.
    #[error("Invalid search direction: not a descent direction")]
    InvalidSearchDirection,

    /// The objective function could not be evaluated.
    #[error("Function evaluation failed: {reason}")]
    FunctionEvaluation {
        /// Description of the failure
        reason: String,
    },

    /// Numerical instability detected.
    ///
    /// This error occurs when numerical operations become unstable,
    /// such as non-finite values at the starting point.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },
}

impl OptimizerError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
        initial_value: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
            initial_value,
        }
    }

    /// Create a FunctionEvaluation error with a custom reason.
    pub fn function_evaluation<S: Into<String>>(reason: S) -> Self {
        Self::FunctionEvaluation {
            reason: reason.into(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Returns true if the error was raised by a line search.
    pub fn is_line_search_failure(&self) -> bool {
        matches!(
            self,
            Self::LineSearchFailed { .. } | Self::InvalidSearchDirection
        )
    }
}

/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OptimizerError::dimension_mismatch(4, 3);
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
        assert_eq!(err.to_string(), "Dimension mismatch: expected 4, got 3");

        let err = OptimizerError::function_evaluation("gradient buffer has length 2");
        assert_eq!(
            err.to_string(),
            "Function evaluation failed: gradient buffer has length 2"
        );
    }

    #[test]
    fn test_optimizer_error_creation() {
        let err = OptimizerError::line_search_failed("step size too small", 10, 1e-10, 100.0);
        assert!(matches!(err, OptimizerError::LineSearchFailed { .. }));
        assert!(err.to_string().contains("Line search failed"));
        assert!(err.is_line_search_failure());

        let err = OptimizerError::invalid_configuration("must be at least 1", "memory_size", "0");
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("Invalid optimizer configuration"));
        assert!(!err.is_line_search_failure());

        assert!(OptimizerError::InvalidSearchDirection.is_line_search_failure());
    }

    #[test]
    fn test_optimizer_error_context() {
        let err =
            OptimizerError::line_search_failed("Wolfe conditions not satisfied", 25, 1e-8, 42.0);

        if let OptimizerError::LineSearchFailed {
            reason,
            iterations,
            last_step_size,
            initial_value,
        } = err
        {
            assert_eq!(reason, "Wolfe conditions not satisfied");
            assert_eq!(iterations, 25);
            assert_eq!(last_step_size, 1e-8);
            assert_eq!(initial_value, 42.0);
        } else {
            panic!("Expected LineSearchFailed variant");
        }

        let err = OptimizerError::invalid_configuration(
            "minimum radius must be below maximum radius",
            "min_radius",
            "10",
        );
        if let OptimizerError::InvalidConfiguration { parameter, value, .. } = err {
            assert_eq!(parameter, "min_radius");
            assert_eq!(value, "10");
        } else {
            panic!("Expected InvalidConfiguration variant");
        }
    }

    #[test]
    fn test_optimizer_error_display() {
        let errors = vec![
            OptimizerError::line_search_failed("step size underflow", 50, 1e-16, 10.0),
            OptimizerError::invalid_configuration("negative value", "initial_radius", "-0.5"),
            OptimizerError::dimension_mismatch("4", "5"),
            OptimizerError::InvalidSearchDirection,
            OptimizerError::function_evaluation("domain error"),
            OptimizerError::numerical_error("non-finite starting value"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}

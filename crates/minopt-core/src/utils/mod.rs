//! Utility functions and helper types.

#[cfg(any(test, feature = "test-utils"))]
pub mod test_functions;

#[cfg(any(test, feature = "test-utils"))]
pub use test_functions::*;

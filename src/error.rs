//! Error types for the PCA pipeline.
//!
//! Every stage checks its inputs at the boundary and returns one of these
//! variants immediately. Zero-variance components are not errors; they are
//! flagged on the concordance report instead.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PcaError>;

/// Errors that can occur while computing or comparing principal components.
#[derive(Debug, Error)]
pub enum PcaError {
    /// Matrix is empty or its rows have inconsistent lengths.
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// What was wrong with the shape
        reason: String,
    },

    /// Too few samples to estimate a covariance matrix.
    #[error("Insufficient samples: required {required}, actual {actual}")]
    InsufficientSamples {
        /// Minimum number of rows
        required: usize,
        /// Rows supplied
        actual: usize,
    },

    /// The Jacobi iteration ran out of sweeps before the off-diagonal
    /// residual dropped below tolerance.
    #[error("Eigen-decomposition did not converge after {sweeps} sweeps (off-diagonal residual {residual:e})")]
    NonConvergence {
        /// Sweeps performed
        sweeps: usize,
        /// Off-diagonal Frobenius norm when iteration stopped
        residual: f64,
    },

    /// K outside [1, M], mismatched dimensions, or otherwise unusable arguments.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of what's wrong with the parameter
        reason: String,
    },

    /// Reading or writing an interchange file failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A token in an interchange file is not a number.
    #[error("Parse error at line {line}, column {column}: {token:?} is not a valid number")]
    Parse {
        /// 1-based line number
        line: usize,
        /// 1-based column number
        column: usize,
        /// Offending text
        token: String,
    },

    /// The LAPACK reference solver reported a failure.
    #[cfg(feature = "lapack")]
    #[error("LAPACK backend failed: {0}")]
    Backend(String),
}

impl PcaError {
    /// Create an InvalidShape error.
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create an InsufficientSamples error.
    pub fn insufficient_samples(required: usize, actual: usize) -> Self {
        Self::InsufficientSamples { required, actual }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Create an Io error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

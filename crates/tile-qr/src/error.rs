//! Error types for matrix loading and the factorization run.

use thiserror::Error;

/// Errors that can occur while loading a matrix or running the factorization.
#[derive(Debug, Error)]
pub enum QrError {
    /// Matrix file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Matrix file did not parse.
    #[error("matrix format error: {0}")]
    MatrixFormat(String),

    /// Store dimensions unusable for the factorization.
    #[error("dimension error: {0}")]
    Dimension(String),

    /// Configuration rejected before any worker started.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A panel pivot broke down and the run was configured to abort.
    #[error("numerical breakdown in panel task ({i}, {j}) at pivot {pivot}")]
    NumericalBreakdown {
        /// Grid row of the failing task.
        i: usize,
        /// Grid column of the failing task.
        j: usize,
        /// Pivot row at which the kernel stopped.
        pivot: usize,
    },
}

/// Result type for factorization operations.
pub type Result<T> = std::result::Result<T, QrError>;

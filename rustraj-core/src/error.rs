//! Error types for rustraj-core.

use thiserror::Error;

/// Result type alias for rustraj operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for trajectory clustering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Trajectory, mean or covariance shapes are inconsistent.
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// The covariance matrix cannot be inverted.
    #[error("singular covariance matrix (determinant {determinant})")]
    SingularCovariance { determinant: f64 },

    /// The covariance matrix is not symmetric positive definite.
    #[error("covariance matrix {matrix:?} is not symmetric positive definite")]
    InvalidCovariance { matrix: [[f64; 2]; 2] },

    /// A trajectory point has a NaN or infinite coordinate.
    #[error("non-finite coordinate in trajectory {trajectory} at step {step}")]
    NonFiniteCoordinate { trajectory: usize, step: usize },

    /// A cluster received zero total responsibility during maximization.
    #[error("cluster {cluster} received zero total responsibility")]
    DegenerateCluster { cluster: usize },

    /// The dataset holds no trajectories.
    #[error("dataset contains no trajectories")]
    EmptyDataset,

    /// Cluster count is zero or exceeds the number of trajectories.
    #[error("invalid cluster count {clusters} for {trajectories} trajectories")]
    InvalidClusterCount { clusters: usize, trajectories: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

//! Configuration for the EM trajectory clustering run.

use crate::{Covariance, Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the maximization step does with a cluster that received no
/// responsibility mass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DegeneratePolicy {
    /// Keep the previous mean for that cluster.
    #[default]
    Skip,
    /// Abort with [`Error::DegenerateCluster`].
    Fail,
}

/// Configuration for an EM clustering run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmConfig {
    /// Number of clusters (M).
    pub num_clusters: usize,
    /// Observation covariance shared by all clusters.
    pub covariance: Covariance,
    /// Outer iterations; each ends with a reseed attempt except the last.
    pub outer_iterations: usize,
    /// Expectation/maximization cycles per outer iteration.
    pub inner_iterations: usize,
    /// Only the first `max_trajectories` of the dataset are clustered.
    pub max_trajectories: Option<usize>,
    /// Seed for the initial mean sampling (`None` draws from entropy).
    pub seed: Option<u64>,
    /// Handling of clusters with zero responsibility mass.
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            num_clusters: 10,
            covariance: Covariance::default(),
            outer_iterations: 20,
            inner_iterations: 5,
            max_trajectories: Some(500),
            seed: None,
            degenerate_policy: DegeneratePolicy::Skip,
        }
    }
}

impl EmConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of clusters.
    #[must_use]
    pub fn with_num_clusters(mut self, clusters: usize) -> Self {
        self.num_clusters = clusters;
        self
    }

    /// Sets the observation covariance.
    #[must_use]
    pub fn with_covariance(mut self, covariance: Covariance) -> Self {
        self.covariance = covariance;
        self
    }

    /// Sets the outer iteration budget.
    #[must_use]
    pub fn with_outer_iterations(mut self, iterations: usize) -> Self {
        self.outer_iterations = iterations;
        self
    }

    /// Sets the inner expectation/maximization cycles.
    #[must_use]
    pub fn with_inner_iterations(mut self, iterations: usize) -> Self {
        self.inner_iterations = iterations;
        self
    }

    /// Caps the number of trajectories clustered (`None` uses all of them).
    #[must_use]
    pub fn with_max_trajectories(mut self, max: Option<usize>) -> Self {
        self.max_trajectories = max;
        self
    }

    /// Sets the random seed for initial sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the degenerate cluster policy.
    #[must_use]
    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate_policy = policy;
        self
    }

    /// Checks the iteration budgets.
    ///
    /// Cluster count is checked against the dataset when a run starts.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if either iteration count is zero.
    pub fn validate(&self) -> Result<()> {
        if self.outer_iterations == 0 {
            return Err(Error::ConfigError(
                "outer_iterations must be at least 1".to_string(),
            ));
        }
        if self.inner_iterations == 0 {
            return Err(Error::ConfigError(
                "inner_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

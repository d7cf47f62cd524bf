//! Outer EM driver with worst-cluster reseeding.
//!
//! A run moves through the following states:
//!
//! ```text
//! Initializing -> Iterating -> Reseeding -> Iterating -> ... -> Terminated
//!                                  \-> Converged -> Terminated
//! ```
//!
//! Each outer iteration runs `inner_iterations` expectation/maximization
//! cycles. Every outer iteration except the last then tries to replace the
//! least valuable cluster with an unvisited trajectory; when no trajectory
//! improves the fit the run stops early.

use crate::expectation::expectation;
use crate::maximization::maximization;
use crate::quality::{total_score, worst_cluster};
use crate::reseed::{find_reseed, ReseedOutcome};
use log::{debug, info, warn};
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustraj_core::{Dataset, EmConfig, Error, Means, Responsibilities, Result, VisitedSet};
use std::borrow::Cow;

/// Phase of an EM run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmState {
    /// Sampling initial seeds.
    Initializing,
    /// Running expectation/maximization cycles.
    Iterating,
    /// Searching for a replacement seed for the worst cluster.
    Reseeding,
    /// No reseed candidate improved the fit.
    Converged,
    /// Run finished; outputs are final.
    Terminated,
}

/// A cluster mean replaced by a dataset trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReseedEvent {
    /// Outer iteration (0-based) after which the reseed happened.
    pub iteration: usize,
    /// Cluster whose mean was replaced.
    pub cluster: usize,
    /// Trajectory adopted as the new mean.
    pub trajectory: usize,
    /// Loss of the replaced cluster.
    pub loss: f64,
    /// Improvement reported by the reseed search.
    pub improvement: f64,
}

/// Output of an EM run.
#[derive(Debug, Clone, PartialEq)]
pub struct EmResult {
    /// Final `M×T×2` cluster means.
    pub means: Means,
    /// Responsibility matrix from the last expectation step (`N×M`).
    pub responsibilities: Responsibilities,
    /// Per-cluster responsibility mass `Σ_n E[n,m]`.
    pub cluster_contributions: Array1<f64>,
    /// Trajectories used as seeds, in adoption order.
    pub visited: Vec<usize>,
    /// Reseeds performed, in order.
    pub reseeds: Vec<ReseedEvent>,
    /// Outer iterations completed.
    pub iterations: usize,
    /// True when the run stopped because no reseed improved the fit.
    pub converged: bool,
}

impl EmResult {
    /// Number of clusters (M).
    #[must_use]
    pub fn num_clusters(&self) -> usize {
        self.means.len_of(Axis(0))
    }

    /// Best cluster of each trajectory (first maximal column on ties).
    #[must_use]
    pub fn assignments(&self) -> Vec<usize> {
        self.responsibilities
            .axis_iter(Axis(0))
            .map(|row| {
                let mut best = 0;
                for (m, &value) in row.iter().enumerate() {
                    if value > row[best] {
                        best = m;
                    }
                }
                best
            })
            .collect()
    }

    /// Sum of each trajectory's best responsibility.
    #[must_use]
    pub fn total_score(&self) -> f64 {
        total_score(self.responsibilities.view())
    }
}

/// EM clustering of trajectories into `num_clusters` mean trajectories.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryEm {
    config: EmConfig,
}

impl TrajectoryEm {
    /// Creates a driver for the given configuration.
    #[must_use]
    pub fn new(config: EmConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EmConfig {
        &self.config
    }

    /// Runs EM with seeds sampled without replacement from the dataset.
    ///
    /// The dataset is first capped to `max_trajectories`. With a fixed
    /// `seed` the run is fully deterministic.
    ///
    /// # Errors
    /// Returns [`Error::InvalidClusterCount`] if `num_clusters` is zero or
    /// exceeds the (capped) dataset, [`Error::ConfigError`] for a zero
    /// iteration budget, and any error raised by the EM steps.
    pub fn fit(&self, dataset: &Dataset) -> Result<EmResult> {
        let dataset = self.prepare(dataset)?;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds =
            rand::seq::index::sample(&mut rng, dataset.len(), self.config.num_clusters).into_vec();
        self.run(&dataset, &seeds)
    }

    /// Runs EM starting from the given trajectory indices as means.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the seeds are not `num_clusters`
    /// distinct in-range indices, plus the errors of [`TrajectoryEm::fit`].
    pub fn fit_with_seeds(&self, dataset: &Dataset, seeds: &[usize]) -> Result<EmResult> {
        let dataset = self.prepare(dataset)?;
        if seeds.len() != self.config.num_clusters {
            return Err(Error::ConfigError(format!(
                "expected {} seeds, got {}",
                self.config.num_clusters,
                seeds.len()
            )));
        }
        let mut seen = VisitedSet::new(dataset.len());
        for &seed in seeds {
            if seed >= dataset.len() {
                return Err(Error::ConfigError(format!(
                    "seed {seed} out of range for {} trajectories",
                    dataset.len()
                )));
            }
            if !seen.insert(seed) {
                return Err(Error::ConfigError(format!("duplicate seed {seed}")));
            }
        }
        self.run(&dataset, seeds)
    }

    fn prepare<'a>(&self, dataset: &'a Dataset) -> Result<Cow<'a, Dataset>> {
        self.config.validate()?;
        let dataset = match self.config.max_trajectories {
            Some(max) if max < dataset.len() => Cow::Owned(dataset.truncated(max)),
            _ => Cow::Borrowed(dataset),
        };
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }
        let clusters = self.config.num_clusters;
        if clusters == 0 || clusters > dataset.len() {
            return Err(Error::InvalidClusterCount {
                clusters,
                trajectories: dataset.len(),
            });
        }
        Ok(dataset)
    }

    fn run(&self, dataset: &Dataset, seeds: &[usize]) -> Result<EmResult> {
        let config = &self.config;
        let mut state = EmState::Initializing;
        debug!(
            "{state:?}: {} trajectories of {} steps, {} clusters, seeds {seeds:?}",
            dataset.len(),
            dataset.steps(),
            config.num_clusters
        );

        let mut visited = VisitedSet::new(dataset.len());
        for &seed in seeds {
            visited.insert(seed);
        }
        let mut means = dataset.select(seeds);
        let mut responsibilities = Responsibilities::zeros((dataset.len(), seeds.len()));
        let mut reseeds = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        for outer in 0..config.outer_iterations {
            advance(&mut state, EmState::Iterating);
            for _ in 0..config.inner_iterations {
                responsibilities = expectation(dataset, &means, &config.covariance)?;
                let step = maximization(
                    dataset,
                    &responsibilities,
                    &means,
                    config.degenerate_policy,
                )?;
                if !step.skipped.is_empty() {
                    warn!(
                        "clusters {:?} had no responsibility mass; previous means kept",
                        step.skipped
                    );
                }
                means = step.means;
            }
            iterations = outer + 1;
            debug!(
                "outer iteration {outer}: total score {:.6}",
                total_score(responsibilities.view())
            );

            if outer + 1 == config.outer_iterations {
                break;
            }

            advance(&mut state, EmState::Reseeding);
            let worst = worst_cluster(responsibilities.view())?;
            match find_reseed(
                &responsibilities,
                worst,
                &visited,
                dataset,
                &config.covariance,
            )? {
                ReseedOutcome::Found {
                    trajectory,
                    improvement,
                } => {
                    info!(
                        "reseeding cluster {} (loss {:.6}) with trajectory {trajectory} (improvement {improvement:.6})",
                        worst.index, worst.loss
                    );
                    means
                        .index_axis_mut(Axis(0), worst.index)
                        .assign(&dataset.trajectory(trajectory));
                    visited.insert(trajectory);
                    reseeds.push(ReseedEvent {
                        iteration: outer,
                        cluster: worst.index,
                        trajectory,
                        loss: worst.loss,
                        improvement,
                    });
                }
                ReseedOutcome::NoImprovement => {
                    advance(&mut state, EmState::Converged);
                    converged = true;
                    break;
                }
            }
        }

        advance(&mut state, EmState::Terminated);
        info!(
            "EM finished after {iterations} outer iterations ({} reseeds, converged: {converged})",
            reseeds.len()
        );

        Ok(EmResult {
            cluster_contributions: responsibilities.sum_axis(Axis(0)),
            means,
            responsibilities,
            visited: visited.as_slice().to_vec(),
            reseeds,
            iterations,
            converged,
        })
    }
}

fn advance(state: &mut EmState, next: EmState) {
    debug!("{state:?} -> {next:?}");
    *state = next;
}

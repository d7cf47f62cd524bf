//! rustraj-algorithms: EM clustering of 2-D trajectories.
//!
//! This crate provides the EM pipeline and its building blocks:
//! - **likelihood** - Gaussian likelihood of a trajectory under a mean
//! - **expectation** - N×M responsibility matrix
//! - **maximization** - responsibility-weighted means
//! - **quality** - worst-cluster scoring
//! - **reseed** - greedy replacement seed search
//! - **driver** - outer iteration loop
//!
#![warn(missing_docs)]

mod driver;
pub mod expectation;
pub mod likelihood;
pub mod maximization;
pub mod quality;
pub mod reseed;

pub use driver::{EmResult, EmState, ReseedEvent, TrajectoryEm};
pub use expectation::{expectation, likelihood_column};
pub use likelihood::{likelihood, log_likelihood};
pub use maximization::{maximization, MaximizationStep};
pub use quality::{cluster_losses, total_score, total_score_without, worst_cluster, ClusterScore};
pub use reseed::{candidate_order, find_reseed, ReseedOutcome};

// Re-export core types used throughout the API
pub use rustraj_core::{Covariance, Dataset, DegeneratePolicy, EmConfig, Error, Result};

//! Cluster quality: which cluster the model can best afford to lose.
//!
//! The total score of a responsibility matrix is the sum of each
//! trajectory's best cluster fit. Removing cluster `m` forces its
//! trajectories onto their next best cluster; the resulting drop in total
//! score is the cluster's loss. The cluster with the smallest loss is the
//! reseed candidate.

use ndarray::{Array1, ArrayView2, Axis};
use rustraj_core::{Error, Result};

/// A cluster index paired with its loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterScore {
    /// Cluster index.
    pub index: usize,
    /// Drop in total score when the cluster is removed.
    pub loss: f64,
}

/// Sum of row maxima. Rows without positive entries contribute zero.
#[must_use]
pub fn total_score(responsibilities: ArrayView2<'_, f64>) -> f64 {
    responsibilities
        .axis_iter(Axis(0))
        .map(|row| row.iter().copied().fold(0.0, f64::max))
        .sum()
}

/// Total score with column `excluded` treated as zero.
#[must_use]
pub fn total_score_without(responsibilities: ArrayView2<'_, f64>, excluded: usize) -> f64 {
    responsibilities
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|&(m, _)| m != excluded)
                .map(|(_, &v)| v)
                .fold(0.0, f64::max)
        })
        .sum()
}

/// Loss of every cluster: `total - total_without(m)`.
#[must_use]
pub fn cluster_losses(responsibilities: ArrayView2<'_, f64>) -> Array1<f64> {
    let total = total_score(responsibilities);
    (0..responsibilities.ncols())
        .map(|m| total - total_score_without(responsibilities, m))
        .collect()
}

/// Finds the least valuable cluster. Ties go to the lowest index.
///
/// # Errors
/// Returns [`Error::InvalidClusterCount`] if the matrix has no columns.
pub fn worst_cluster(responsibilities: ArrayView2<'_, f64>) -> Result<ClusterScore> {
    let losses = cluster_losses(responsibilities);
    let mut worst: Option<ClusterScore> = None;
    for (index, &loss) in losses.iter().enumerate() {
        let better = match worst {
            None => true,
            Some(current) => loss < current.loss,
        };
        if better {
            worst = Some(ClusterScore { index, loss });
        }
    }
    worst.ok_or(Error::InvalidClusterCount {
        clusters: 0,
        trajectories: responsibilities.nrows(),
    })
}

//! Maximization step: responsibility-weighted cluster means.

use ndarray::Axis;
use rustraj_core::{Dataset, DegeneratePolicy, Error, Means, Responsibilities, Result};

/// New means produced by one maximization step.
#[derive(Debug, Clone, PartialEq)]
pub struct MaximizationStep {
    /// Updated `M×T×2` means.
    pub means: Means,
    /// Clusters whose previous mean was kept because they had no
    /// responsibility mass (only with [`DegeneratePolicy::Skip`]).
    pub skipped: Vec<usize>,
}

/// Recomputes every mean as `Σ_n E[n,m]·traj[n] / Σ_n E[n,m]`.
///
/// `previous` is only read: its shape fixes M and T, and its rows are
/// carried over for skipped clusters. A fresh means array is returned.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if the responsibility matrix does not
/// match the dataset and means, and [`Error::DegenerateCluster`] when a
/// column has zero (or non-finite) mass under [`DegeneratePolicy::Fail`].
pub fn maximization(
    dataset: &Dataset,
    responsibilities: &Responsibilities,
    previous: &Means,
    policy: DegeneratePolicy,
) -> Result<MaximizationStep> {
    let (rows, cols) = responsibilities.dim();
    if rows != dataset.len() {
        return Err(Error::DimensionMismatch {
            context: "responsibility rows",
            expected: dataset.len(),
            found: rows,
        });
    }
    if cols != previous.len_of(Axis(0)) {
        return Err(Error::DimensionMismatch {
            context: "responsibility columns",
            expected: previous.len_of(Axis(0)),
            found: cols,
        });
    }
    if previous.len_of(Axis(1)) != dataset.steps() {
        return Err(Error::DimensionMismatch {
            context: "mean length",
            expected: dataset.steps(),
            found: previous.len_of(Axis(1)),
        });
    }

    let mut means = Means::zeros(previous.raw_dim());
    let mut skipped = Vec::new();

    for (m, weights) in responsibilities.axis_iter(Axis(1)).enumerate() {
        let total = weights.sum();
        let mut mean = means.index_axis_mut(Axis(0), m);
        if !(total.is_finite() && total > 0.0) {
            match policy {
                DegeneratePolicy::Fail => return Err(Error::DegenerateCluster { cluster: m }),
                DegeneratePolicy::Skip => {
                    mean.assign(&previous.index_axis(Axis(0), m));
                    skipped.push(m);
                    continue;
                }
            }
        }
        for (&weight, trajectory) in weights.iter().zip(dataset.iter()) {
            mean.scaled_add(weight, &trajectory);
        }
        mean /= total;
    }

    Ok(MaximizationStep { means, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_trajectories() -> Dataset {
        Dataset::from_trajectories(&[
            vec![[0.0, 0.0], [2.0, 0.0]],
            vec![[4.0, 8.0], [6.0, 4.0]],
        ])
        .unwrap()
    }

    #[test]
    fn test_weighted_average() {
        let ds = two_trajectories();
        // Cluster 0: weights 3 and 1; cluster 1: weights 0.5 and 0.5.
        let e = array![[3.0, 0.5], [1.0, 0.5]];
        let previous = Means::zeros((2, 2, 2));
        let step = maximization(&ds, &e, &previous, DegeneratePolicy::Fail).unwrap();

        assert!(step.skipped.is_empty());
        // (3*(0,0) + 1*(4,8)) / 4 = (1,2); (3*(2,0) + 1*(6,4)) / 4 = (3,1)
        let m0 = step.means.index_axis(Axis(0), 0);
        assert_relative_eq!(m0[[0, 0]], 1.0);
        assert_relative_eq!(m0[[0, 1]], 2.0);
        assert_relative_eq!(m0[[1, 0]], 3.0);
        assert_relative_eq!(m0[[1, 1]], 1.0);
        let m1 = step.means.index_axis(Axis(0), 1);
        assert_relative_eq!(m1[[0, 0]], 2.0);
        assert_relative_eq!(m1[[0, 1]], 4.0);
        assert_relative_eq!(m1[[1, 0]], 4.0);
        assert_relative_eq!(m1[[1, 1]], 2.0);
    }

    #[test]
    fn test_idempotent() {
        let ds = two_trajectories();
        let e = array![[0.9, 0.2], [0.1, 0.7]];
        let previous = ds.select(&[0, 1]);
        let first = maximization(&ds, &e, &previous, DegeneratePolicy::Skip).unwrap();
        let second = maximization(&ds, &e, &first.means, DegeneratePolicy::Skip).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_cluster_fail() {
        let ds = two_trajectories();
        let e = array![[1.0, 0.0], [1.0, 0.0]];
        let previous = ds.select(&[0, 1]);
        assert_eq!(
            maximization(&ds, &e, &previous, DegeneratePolicy::Fail),
            Err(Error::DegenerateCluster { cluster: 1 })
        );
    }

    #[test]
    fn test_degenerate_cluster_skip_keeps_previous() {
        let ds = two_trajectories();
        let e = array![[1.0, 0.0], [1.0, 0.0]];
        let previous = ds.select(&[0, 1]);
        let step = maximization(&ds, &e, &previous, DegeneratePolicy::Skip).unwrap();
        assert_eq!(step.skipped, vec![1]);
        assert_eq!(
            step.means.index_axis(Axis(0), 1),
            previous.index_axis(Axis(0), 1)
        );
        assert!(step.means.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_shape_mismatch() {
        let ds = two_trajectories();
        let e = array![[1.0], [1.0], [1.0]];
        let previous = Means::zeros((1, 2, 2));
        assert!(matches!(
            maximization(&ds, &e, &previous, DegeneratePolicy::Skip),
            Err(Error::DimensionMismatch { expected: 2, found: 3, .. })
        ));
    }
}

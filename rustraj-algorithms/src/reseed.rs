//! Reseed search: a replacement seed for the worst cluster.
//!
//! Unvisited trajectories are tried in ascending order of their total
//! responsibility (the least explained first). For each candidate only the
//! worst cluster's column is recomputed, with the candidate trajectory as its
//! mean. The first candidate whose improvement over the matrix without that
//! cluster strictly exceeds the cluster's current loss is accepted.

use crate::expectation::likelihood_column;
use crate::quality::{total_score, ClusterScore};
use ndarray::Axis;
use rustraj_core::{Covariance, Dataset, Error, Responsibilities, Result, VisitedSet};

/// Result of a reseed search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReseedOutcome {
    /// A trajectory whose adoption improves the total score.
    Found {
        /// Index of the trajectory to adopt as the new mean.
        trajectory: usize,
        /// Total score with the candidate minus total score without the cluster.
        improvement: f64,
    },
    /// No unvisited trajectory improves on the current cluster.
    NoImprovement,
}

/// Trajectory indices ordered by ascending total responsibility, visited
/// indices excluded. Equal totals keep index order.
#[must_use]
pub fn candidate_order(responsibilities: &Responsibilities, visited: &VisitedSet) -> Vec<usize> {
    let contributions = responsibilities.sum_axis(Axis(1));
    let mut order: Vec<usize> = (0..responsibilities.nrows())
        .filter(|&n| !visited.contains(n))
        .collect();
    order.sort_by(|&a, &b| contributions[a].total_cmp(&contributions[b]));
    order
}

/// Greedy first-improvement search for a new seed of cluster `worst.index`.
///
/// Improvements are measured against the total score with the worst
/// cluster's column zeroed, not against the current total. Exceeding
/// `worst.loss` is then equivalent to the new total beating the current one.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if the matrix does not have one row
/// per trajectory and [`Error::InvalidClusterCount`] if `worst.index` is not
/// a column of the matrix.
pub fn find_reseed(
    responsibilities: &Responsibilities,
    worst: ClusterScore,
    visited: &VisitedSet,
    dataset: &Dataset,
    covariance: &Covariance,
) -> Result<ReseedOutcome> {
    if responsibilities.nrows() != dataset.len() {
        return Err(Error::DimensionMismatch {
            context: "responsibility rows",
            expected: dataset.len(),
            found: responsibilities.nrows(),
        });
    }
    if worst.index >= responsibilities.ncols() {
        return Err(Error::InvalidClusterCount {
            clusters: responsibilities.ncols(),
            trajectories: dataset.len(),
        });
    }

    let mut scratch = responsibilities.clone();
    scratch.column_mut(worst.index).fill(0.0);
    let baseline = total_score(scratch.view());

    for k in candidate_order(responsibilities, visited) {
        let column = likelihood_column(dataset, dataset.trajectory(k), covariance)?;
        scratch.column_mut(worst.index).assign(&column);
        let improvement = total_score(scratch.view()) - baseline;
        if improvement > worst.loss {
            return Ok(ReseedOutcome::Found {
                trajectory: k,
                improvement,
            });
        }
    }

    Ok(ReseedOutcome::NoImprovement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::expectation;
    use crate::quality::worst_cluster;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Seeds at (0,0) and (10,10); a pair at (10,16) that the second seed
    /// barely explains and a lone outlier at (30,-30) it does not explain.
    fn ranked_dataset() -> Dataset {
        Dataset::from_trajectories(&[
            vec![[0.0, 0.0]],
            vec![[10.0, 10.0]],
            vec![[10.0, 16.0]],
            vec![[10.0, 16.5]],
            vec![[30.0, -30.0]],
        ])
        .unwrap()
    }

    /// Two tight groups near (0,0) and (10,10) plus an outlier group at
    /// (30,-30) that neither seed explains.
    fn dataset() -> Dataset {
        Dataset::from_trajectories(&[
            vec![[0.0, 0.0]],
            vec![[0.5, 0.0]],
            vec![[10.0, 10.0]],
            vec![[10.5, 10.0]],
            vec![[30.0, -30.0]],
            vec![[30.5, -30.0]],
        ])
        .unwrap()
    }

    #[test]
    fn test_candidate_order_skips_visited() {
        let e = array![[0.5, 0.1], [0.05, 0.0], [0.3, 0.3], [0.9, 0.9]];
        let mut visited = VisitedSet::new(4);
        visited.insert(1);
        assert_eq!(candidate_order(&e, &visited), vec![0, 2, 3]);
    }

    #[test]
    fn test_finds_unexplained_group() {
        let ds = dataset();
        let cov = Covariance::isotropic(1.0).unwrap();
        // Two seeds on the first group, one on the second.
        let means = ds.select(&[0, 1, 2]);
        let e = expectation(&ds, &means, &cov).unwrap();
        let worst = worst_cluster(e.view()).unwrap();
        assert!(worst.index < 2, "a duplicated seed must be the worst");

        let mut visited = VisitedSet::new(ds.len());
        for n in [0, 1, 2] {
            visited.insert(n);
        }
        let outcome = find_reseed(&e, worst, &visited, &ds, &cov).unwrap();
        match outcome {
            ReseedOutcome::Found {
                trajectory,
                improvement,
            } => {
                // Both outliers are equally unexplained; index order breaks the tie.
                assert_eq!(trajectory, 4);
                assert!(improvement > worst.loss);
            }
            ReseedOutcome::NoImprovement => panic!("expected the outlier group to be adopted"),
        }
    }

    #[test]
    fn test_never_returns_visited() {
        let ds = ranked_dataset();
        let cov = Covariance::isotropic(1.0).unwrap();
        let means = ds.select(&[0, 0, 1]);
        let e = expectation(&ds, &means, &cov).unwrap();
        let worst = worst_cluster(e.view()).unwrap();

        // The lowest-ranked candidate is already visited, so the next one wins.
        let mut visited = VisitedSet::new(ds.len());
        for n in [0, 1, 4] {
            visited.insert(n);
        }
        match find_reseed(&e, worst, &visited, &ds, &cov).unwrap() {
            ReseedOutcome::Found { trajectory, .. } => assert_eq!(trajectory, 3),
            ReseedOutcome::NoImprovement => panic!("expected trajectory 3 to be adopted"),
        }
    }

    #[test]
    fn test_first_improving_candidate_wins() {
        let ds = ranked_dataset();
        let cov = Covariance::isotropic(1.0).unwrap();
        let means = ds.select(&[0, 0, 1]);
        let e = expectation(&ds, &means, &cov).unwrap();
        let worst = worst_cluster(e.view()).unwrap();
        assert_eq!(worst.index, 0);
        assert_relative_eq!(worst.loss, 0.0);

        let mut visited = VisitedSet::new(ds.len());
        visited.insert(0);
        visited.insert(1);
        assert_eq!(candidate_order(&e, &visited), vec![4, 3, 2]);

        // Adopting trajectory 2 would explain the pair at (10, 16) and gain
        // more, but the least explained candidate already beats the loss.
        let mut scratch = e.clone();
        scratch.column_mut(0).fill(0.0);
        let baseline = total_score(scratch.view());
        let column = likelihood_column(&ds, ds.trajectory(2), &cov).unwrap();
        scratch.column_mut(0).assign(&column);
        let best_gain = total_score(scratch.view()) - baseline;

        match find_reseed(&e, worst, &visited, &ds, &cov).unwrap() {
            ReseedOutcome::Found {
                trajectory,
                improvement,
            } => {
                assert_eq!(trajectory, 4);
                assert_relative_eq!(improvement, 1.0, epsilon = 1e-9);
                assert!(improvement > worst.loss);
                assert!(best_gain > improvement + 0.5);
            }
            ReseedOutcome::NoImprovement => panic!("expected trajectory 4 to be adopted"),
        }
    }

    #[test]
    fn test_no_improvement_when_everything_visited() {
        let ds = dataset();
        let cov = Covariance::isotropic(1.0).unwrap();
        let means = ds.select(&[0, 2, 4]);
        let e = expectation(&ds, &means, &cov).unwrap();
        let worst = worst_cluster(e.view()).unwrap();
        let mut visited = VisitedSet::new(ds.len());
        for n in 0..ds.len() {
            visited.insert(n);
        }
        assert_eq!(
            find_reseed(&e, worst, &visited, &ds, &cov).unwrap(),
            ReseedOutcome::NoImprovement
        );
    }

    #[test]
    fn test_well_separated_seeds_do_not_improve() {
        let ds = Dataset::from_trajectories(&[
            vec![[0.0, 0.0]],
            vec![[10.0, 10.0]],
            vec![[30.0, -30.0]],
            vec![[0.5, 0.0]],
        ])
        .unwrap();
        let cov = Covariance::isotropic(1.0).unwrap();
        let means = ds.select(&[0, 1, 2]);
        let e = expectation(&ds, &means, &cov).unwrap();
        let worst = worst_cluster(e.view()).unwrap();
        assert!(worst.index > 0);

        let mut visited = VisitedSet::new(ds.len());
        for n in [0, 1, 2] {
            visited.insert(n);
        }
        // Moving a lone seed onto the first group gains far less than it loses.
        assert_eq!(
            find_reseed(&e, worst, &visited, &ds, &cov).unwrap(),
            ReseedOutcome::NoImprovement
        );
    }
}

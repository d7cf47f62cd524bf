//! Expectation step: the N×M responsibility matrix.
//!
//! Entry `(n, m)` is the likelihood of trajectory `n` under mean `m`. Rows are
//! deliberately left unnormalized so that the sum of row maxima stays
//! comparable when a cluster is removed or replaced.

use crate::likelihood::likelihood_unchecked;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use rustraj_core::{Covariance, Dataset, Error, Means, Responsibilities, Result, TrajectoryView};

/// Computes the full responsibility matrix for `means` over `dataset`.
///
/// Cells are evaluated in parallel; every cell is written exactly once and
/// the matrix is only returned once fully populated.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if the means are not `M×T×2` with the
/// dataset's T.
pub fn expectation(
    dataset: &Dataset,
    means: &Means,
    covariance: &Covariance,
) -> Result<Responsibilities> {
    check_means(dataset, means)?;
    let n = dataset.len();
    let m = means.len_of(Axis(0));

    let cells: Vec<f64> = (0..n * m)
        .into_par_iter()
        .map(|cell| {
            let (row, col) = (cell / m, cell % m);
            likelihood_unchecked(
                means.index_axis(Axis(0), col),
                covariance,
                dataset.trajectory(row),
            )
        })
        .collect();

    Array2::from_shape_vec((n, m), cells).map_err(|_| Error::DimensionMismatch {
        context: "responsibility matrix",
        expected: n * m,
        found: 0,
    })
}

/// Likelihood of every trajectory under a single candidate mean.
///
/// This is one column of the responsibility matrix.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if `candidate` is not `T×2`.
pub fn likelihood_column(
    dataset: &Dataset,
    candidate: TrajectoryView<'_>,
    covariance: &Covariance,
) -> Result<Array1<f64>> {
    if candidate.dim() != (dataset.steps(), 2) {
        return Err(Error::DimensionMismatch {
            context: "candidate mean length",
            expected: dataset.steps(),
            found: candidate.nrows(),
        });
    }
    let column: Vec<f64> = (0..dataset.len())
        .into_par_iter()
        .map(|row| likelihood_unchecked(candidate, covariance, dataset.trajectory(row)))
        .collect();
    Ok(Array1::from(column))
}

fn check_means(dataset: &Dataset, means: &Means) -> Result<()> {
    let (_, steps, dim) = means.dim();
    if dim != 2 {
        return Err(Error::DimensionMismatch {
            context: "mean point dimension",
            expected: 2,
            found: dim,
        });
    }
    if steps != dataset.steps() {
        return Err(Error::DimensionMismatch {
            context: "mean length",
            expected: dataset.steps(),
            found: steps,
        });
    }
    Ok(())
}

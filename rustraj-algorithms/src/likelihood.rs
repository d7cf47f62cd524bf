//! Gaussian likelihood of a trajectory under a candidate mean.
//!
//! Each time step contributes an unnormalized density `exp(-½ dᵀ Σ⁻¹ d)`
//! where `d = mean[t] - observed[t]`; the trajectory likelihood is the
//! product over time steps. The normalizing constant is omitted because only
//! comparisons between clusters matter.
//!
//! The product is accumulated as a sum of exponents and exponentiated once,
//! which yields the same value and ordering as multiplying the per-step
//! densities directly.

use rustraj_core::{Covariance, Error, Result, TrajectoryView};

/// Log of the trajectory likelihood: `Σ_t -½ (mean[t] - observed[t])ᵀ Σ⁻¹ (...)`.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if the two trajectories are not both
/// `T×2` with the same T.
pub fn log_likelihood(
    mean: TrajectoryView<'_>,
    covariance: &Covariance,
    observed: TrajectoryView<'_>,
) -> Result<f64> {
    check_shapes(mean, observed)?;
    Ok(log_likelihood_unchecked(mean, covariance, observed))
}

/// Trajectory likelihood, always in `[0, 1]` for a positive-definite covariance.
///
/// Returns exactly 1.0 when `mean == observed`.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] on a shape mismatch.
pub fn likelihood(
    mean: TrajectoryView<'_>,
    covariance: &Covariance,
    observed: TrajectoryView<'_>,
) -> Result<f64> {
    log_likelihood(mean, covariance, observed).map(f64::exp)
}

/// Shape-unchecked variant used by the engines after validating once.
#[inline]
pub(crate) fn log_likelihood_unchecked(
    mean: TrajectoryView<'_>,
    covariance: &Covariance,
    observed: TrajectoryView<'_>,
) -> f64 {
    mean.outer_iter()
        .zip(observed.outer_iter())
        .map(|(m, o)| -0.5 * covariance.mahalanobis_squared(m[0] - o[0], m[1] - o[1]))
        .sum()
}

#[inline]
pub(crate) fn likelihood_unchecked(
    mean: TrajectoryView<'_>,
    covariance: &Covariance,
    observed: TrajectoryView<'_>,
) -> f64 {
    log_likelihood_unchecked(mean, covariance, observed).exp()
}

fn check_shapes(mean: TrajectoryView<'_>, observed: TrajectoryView<'_>) -> Result<()> {
    if mean.ncols() != 2 {
        return Err(Error::DimensionMismatch {
            context: "mean point dimension",
            expected: 2,
            found: mean.ncols(),
        });
    }
    if observed.ncols() != 2 {
        return Err(Error::DimensionMismatch {
            context: "observed point dimension",
            expected: 2,
            found: observed.ncols(),
        });
    }
    if mean.nrows() != observed.nrows() {
        return Err(Error::DimensionMismatch {
            context: "trajectory length",
            expected: mean.nrows(),
            found: observed.nrows(),
        });
    }
    Ok(())
}

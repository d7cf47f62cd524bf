//! Observation covariance shared by every likelihood evaluation.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Determinants below this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;
/// Relative tolerance on the off-diagonal entries.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A 2×2 covariance matrix with its precomputed inverse.
///
/// The inverse is computed once at construction, so a `Covariance` value is
/// always invertible.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")
)]
pub struct Covariance {
    matrix: [[f64; 2]; 2],
    inverse: [[f64; 2]; 2],
}

impl Covariance {
    /// Creates a covariance from a full 2×2 matrix.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCovariance`] if the matrix is not symmetric or
    /// not positive definite, and [`Error::SingularCovariance`] if its
    /// determinant is not positive.
    pub fn new(matrix: [[f64; 2]; 2]) -> Result<Self> {
        let [[a, b], [c, d]] = matrix;
        if (b - c).abs() > SYMMETRY_TOLERANCE * (b.abs() + c.abs()).max(1.0) {
            return Err(Error::InvalidCovariance { matrix });
        }
        let determinant = a * d - b * c;
        if !(determinant.is_finite() && determinant >= SINGULAR_EPSILON) {
            return Err(Error::SingularCovariance { determinant });
        }
        // A positive determinant with a positive leading entry is positive definite.
        if a <= 0.0 {
            return Err(Error::InvalidCovariance { matrix });
        }
        let inverse = [
            [d / determinant, -b / determinant],
            [-c / determinant, a / determinant],
        ];
        Ok(Self { matrix, inverse })
    }

    /// Creates an axis-aligned covariance `diag(var_x, var_y)`.
    ///
    /// # Errors
    /// Returns an error unless both variances are positive.
    pub fn diagonal(var_x: f64, var_y: f64) -> Result<Self> {
        Self::new([[var_x, 0.0], [0.0, var_y]])
    }

    /// Creates an isotropic covariance `diag(variance, variance)`.
    ///
    /// # Errors
    /// Returns an error unless `variance` is positive.
    pub fn isotropic(variance: f64) -> Result<Self> {
        Self::diagonal(variance, variance)
    }

    /// Returns the covariance matrix.
    #[must_use]
    pub fn matrix(&self) -> [[f64; 2]; 2] {
        self.matrix
    }

    /// Returns the inverse covariance matrix.
    #[must_use]
    pub fn inverse(&self) -> [[f64; 2]; 2] {
        self.inverse
    }

    /// Squared Mahalanobis distance of the offset `(dx, dy)`.
    #[inline]
    #[must_use]
    pub fn mahalanobis_squared(&self, dx: f64, dy: f64) -> f64 {
        let [[a, b], [c, d]] = self.inverse;
        dx * (a * dx + b * dy) + dy * (c * dx + d * dy)
    }
}

impl Default for Covariance {
    /// Isotropic `diag(16, 16)`.
    fn default() -> Self {
        Self {
            matrix: [[16.0, 0.0], [0.0, 16.0]],
            inverse: [[1.0 / 16.0, 0.0], [0.0, 1.0 / 16.0]],
        }
    }
}

impl TryFrom<[[f64; 2]; 2]> for Covariance {
    type Error = Error;

    fn try_from(matrix: [[f64; 2]; 2]) -> Result<Self> {
        Self::new(matrix)
    }
}

impl From<Covariance> for [[f64; 2]; 2] {
    fn from(covariance: Covariance) -> Self {
        covariance.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_of_full_matrix() {
        let cov = Covariance::new([[4.0, 1.0], [1.0, 2.0]]).unwrap();
        let inv = cov.inverse();
        // det = 7
        assert_relative_eq!(inv[0][0], 2.0 / 7.0);
        assert_relative_eq!(inv[0][1], -1.0 / 7.0);
        assert_relative_eq!(inv[1][0], -1.0 / 7.0);
        assert_relative_eq!(inv[1][1], 4.0 / 7.0);
    }

    #[test]
    fn test_singular_covariance_rejected() {
        let err = Covariance::new([[1.0, 2.0], [2.0, 4.0]]).unwrap_err();
        assert!(matches!(err, Error::SingularCovariance { .. }));
        assert!(Covariance::isotropic(0.0).is_err());
        assert!(Covariance::diagonal(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_indefinite_and_asymmetric_rejected() {
        let indefinite = Covariance::new([[1.0, 0.0], [0.0, -1.0]]).unwrap_err();
        assert!(matches!(indefinite, Error::SingularCovariance { .. }));

        let negative = Covariance::new([[-1.0, 0.0], [0.0, -1.0]]).unwrap_err();
        assert!(matches!(negative, Error::InvalidCovariance { .. }));

        let asymmetric = Covariance::new([[1.0, 5.0], [0.0, 1.0]]).unwrap_err();
        assert_eq!(
            asymmetric,
            Error::InvalidCovariance {
                matrix: [[1.0, 5.0], [0.0, 1.0]]
            }
        );
        assert!(Covariance::diagonal(-2.0, 3.0).is_err());
    }

    #[test]
    fn test_mahalanobis_is_non_negative() {
        let cov = Covariance::new([[4.0, 1.0], [1.0, 2.0]]).unwrap();
        for (dx, dy) in [(0.0, 3.0), (1.0, -1.0), (-2.5, 0.5), (3.0, 3.0)] {
            assert!(cov.mahalanobis_squared(dx, dy) > 0.0);
        }
        assert_relative_eq!(cov.mahalanobis_squared(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_mahalanobis_isotropic() {
        let cov = Covariance::isotropic(4.0).unwrap();
        assert_relative_eq!(cov.mahalanobis_squared(2.0, 0.0), 1.0);
        assert_relative_eq!(cov.mahalanobis_squared(2.0, 2.0), 2.0);
        assert_relative_eq!(cov.mahalanobis_squared(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_default_matches_isotropic_sixteen() {
        assert_eq!(Covariance::default(), Covariance::isotropic(16.0).unwrap());
    }
}

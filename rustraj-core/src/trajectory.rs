//! Trajectory dataset types.
//!
//! A dataset stores N trajectories of T two-dimensional points in a single
//! contiguous `N×T×2` array, the same layout used for cluster means. Rows of
//! the responsibility matrix index trajectories, columns index clusters.

use crate::{Error, Result};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// A borrowed `T×2` view of one trajectory (or one mean).
pub type TrajectoryView<'a> = ArrayView2<'a, f64>;

/// Cluster means, shaped `M×T×2`.
pub type Means = Array3<f64>;

/// Responsibility matrix, shaped `N×M`.
pub type Responsibilities = Array2<f64>;

/// An immutable collection of equal-length 2-D trajectories.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    data: Array3<f64>,
}

impl Dataset {
    /// Wraps an `N×T×2` array.
    ///
    /// # Errors
    /// Returns [`Error::EmptyDataset`] if N is zero and
    /// [`Error::DimensionMismatch`] if T is zero or the last axis is not 2,
    /// and [`Error::NonFiniteCoordinate`] for the first NaN or infinite point.
    pub fn new(data: Array3<f64>) -> Result<Self> {
        let (n, t, d) = data.dim();
        if d != 2 {
            return Err(Error::DimensionMismatch {
                context: "point dimension",
                expected: 2,
                found: d,
            });
        }
        if n == 0 {
            return Err(Error::EmptyDataset);
        }
        if t == 0 {
            return Err(Error::DimensionMismatch {
                context: "trajectory length",
                expected: 1,
                found: 0,
            });
        }
        if let Some(((trajectory, step, _), _)) =
            data.indexed_iter().find(|(_, value)| !value.is_finite())
        {
            return Err(Error::NonFiniteCoordinate { trajectory, step });
        }
        Ok(Self { data })
    }

    /// Builds a dataset from per-trajectory point lists.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if the trajectories differ in length
    /// and [`Error::NonFiniteCoordinate`] if any coordinate is NaN or infinite.
    pub fn from_trajectories<P: AsRef<[[f64; 2]]>>(trajectories: &[P]) -> Result<Self> {
        let Some(first) = trajectories.first() else {
            return Err(Error::EmptyDataset);
        };
        let steps = first.as_ref().len();
        let mut flat = Vec::with_capacity(trajectories.len() * steps * 2);
        for trajectory in trajectories {
            let points = trajectory.as_ref();
            if points.len() != steps {
                return Err(Error::DimensionMismatch {
                    context: "trajectory length",
                    expected: steps,
                    found: points.len(),
                });
            }
            flat.extend(points.iter().flat_map(|p| [p[0], p[1]]));
        }
        let data = Array3::from_shape_vec((trajectories.len(), steps, 2), flat).map_err(|_| {
            Error::DimensionMismatch {
                context: "trajectory buffer",
                expected: trajectories.len() * steps * 2,
                found: 0,
            }
        })?;
        Self::new(data)
    }

    /// Number of trajectories (N).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Always false for a constructed dataset; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of time steps per trajectory (T).
    #[must_use]
    pub fn steps(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Returns the trajectory at `index` as a `T×2` view.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn trajectory(&self, index: usize) -> TrajectoryView<'_> {
        self.data.index_axis(Axis(0), index)
    }

    /// Iterates over all trajectories in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = TrajectoryView<'_>> {
        self.data.outer_iter()
    }

    /// Returns the underlying `N×T×2` array.
    #[must_use]
    pub fn as_array(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// Consumes the dataset and returns the underlying array.
    #[must_use]
    pub fn into_array(self) -> Array3<f64> {
        self.data
    }

    /// Returns a dataset holding only the first `max` trajectories.
    ///
    /// A cap of zero or one at least as large as the dataset returns a clone.
    #[must_use]
    pub fn truncated(&self, max: usize) -> Self {
        if max == 0 || max >= self.len() {
            return self.clone();
        }
        Self {
            data: self.data.slice(s![..max, .., ..]).to_owned(),
        }
    }

    /// Axis-aligned bounding box as `([min_x, min_y], [max_x, max_y])`.
    #[must_use]
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for point in self.data.lanes(Axis(2)) {
            for axis in 0..2 {
                min[axis] = min[axis].min(point[axis]);
                max[axis] = max[axis].max(point[axis]);
            }
        }
        (min, max)
    }

    /// Copies the selected trajectories into a new `M×T×2` means array.
    ///
    /// # Panics
    /// Panics if any index is out of range.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Means {
        self.data.select(Axis(0), indices)
    }
}

//! Set of trajectories already adopted as cluster seeds.

/// Tracks which trajectory indices have been used as a mean seed.
///
/// The set only grows. Membership checks are O(1) and the insertion order is
/// kept for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    flags: Vec<bool>,
    order: Vec<usize>,
}

impl VisitedSet {
    /// Creates an empty set for a dataset of `len` trajectories.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            flags: vec![false; len],
            order: Vec::new(),
        }
    }

    /// Marks `index` as visited. Returns false if it was already present.
    ///
    /// # Panics
    /// Panics if `index` is outside the dataset the set was created for.
    pub fn insert(&mut self, index: usize) -> bool {
        if self.flags[index] {
            return false;
        }
        self.flags[index] = true;
        self.order.push(index);
        true
    }

    /// Returns true if `index` has been visited.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Number of visited trajectories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing has been visited yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Visited indices in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }
}

impl<'a> IntoIterator for &'a VisitedSet {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

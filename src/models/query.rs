//! Query result types.

use serde::{Deserialize, Serialize};

/// Nearest neighbors of a single query vector.
///
/// `indices` and `distances` have equal length and are ordered by
/// ascending distance (best match first). Indices are positions in the
/// insertion order of the backing index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbors {
    /// Item indices, best match first.
    pub indices: Vec<usize>,
    /// Distances matching `indices`.
    pub distances: Vec<f32>,
}

impl Neighbors {
    /// Creates an empty neighbor list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            indices: Vec::new(),
            distances: Vec::new(),
        }
    }

    /// Builds a neighbor list from `(index, distance)` pairs already in
    /// ascending distance order.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f32)>) -> Self {
        let (indices, distances) = pairs.into_iter().unzip();
        Self { indices, distances }
    }

    /// Number of neighbors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if there are no neighbors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over `(index, distance)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices.iter().copied().zip(self.distances.iter().copied())
    }

    /// The best match, if any.
    #[must_use]
    pub fn first(&self) -> Option<(usize, f32)> {
        self.iter().next()
    }

    /// Indices whose distance is strictly below `threshold`, in order.
    #[must_use]
    pub fn within(&self, threshold: f32) -> Vec<usize> {
        self.iter()
            .filter(|&(_, distance)| distance < threshold)
            .map(|(index, _)| index)
            .collect()
    }
}

/// One [`Neighbors`] entry per query vector, in input order.
pub type QueryResult = Vec<Neighbors>;

/// One index list per query vector, in input order. Entries may be empty.
pub type ThresholdResult = Vec<Vec<usize>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_keeps_order() {
        let neighbors = Neighbors::from_pairs([(4, 0.1), (2, 0.3), (9, 0.7)]);
        assert_eq!(neighbors.indices, vec![4, 2, 9]);
        assert_eq!(neighbors.len(), 3);
        assert_eq!(neighbors.first(), Some((4, 0.1)));
    }

    #[test]
    fn test_within_is_strict() {
        let neighbors = Neighbors::from_pairs([(4, 0.1), (2, 0.3), (9, 0.7)]);
        assert_eq!(neighbors.within(0.3), vec![4]);
        assert_eq!(neighbors.within(0.31), vec![4, 2]);
        assert!(neighbors.within(0.0).is_empty());
    }

    #[test]
    fn test_empty() {
        let neighbors = Neighbors::new();
        assert!(neighbors.is_empty());
        assert_eq!(neighbors.first(), None);
    }
}

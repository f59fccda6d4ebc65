//! Candidate-set representation shared by the prefilter and threaded
//! executors (§9 "Candidate-set representation").
//!
//! Grounded on `milli::search::query_tree::Operation` and
//! `mokapot::models::percolator_core`, both of which keep boolean-query
//! match sets in a `RoaringBitmap` and combine them with plain set algebra.
//! We additionally keep a sparse `HashSet` representation for small
//! candidate sets (a handful of ids out of a universe of millions), and pick
//! dense once occupancy crosses a threshold, since a `RoaringBitmap` over a
//! huge sparse set wastes allocation on container bookkeeping for no
//! benefit.

use roaring::RoaringBitmap;
use std::collections::HashSet;

/// Fraction of the universe above which we switch from sparse to dense.
const DENSE_THRESHOLD: f64 = 0.07;

/// A set of dense u32 ids (dataset, column, or histogram ids - the
/// representation is id-space agnostic).
#[derive(Debug, Clone)]
pub enum IdSet {
    Sparse(HashSet<u32>),
    Dense(RoaringBitmap),
}

impl Default for IdSet {
    fn default() -> Self {
        IdSet::empty()
    }
}

impl IdSet {
    pub fn empty() -> Self {
        IdSet::Sparse(HashSet::new())
    }

    /// Build from an iterator, choosing sparse vs. dense by occupancy
    /// against `universe_size`.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>, universe_size: u32) -> Self {
        let ids: Vec<u32> = ids.into_iter().collect();
        Self::from_vec(ids, universe_size)
    }

    fn from_vec(ids: Vec<u32>, universe_size: u32) -> Self {
        if Self::should_densify(ids.len(), universe_size) {
            IdSet::Dense(ids.into_iter().collect())
        } else {
            IdSet::Sparse(ids.into_iter().collect())
        }
    }

    fn should_densify(len: usize, universe_size: u32) -> bool {
        universe_size > 0 && (len as f64) >= DENSE_THRESHOLD * f64::from(universe_size)
    }

    pub fn universe(universe_size: u32) -> Self {
        IdSet::Dense((0..universe_size).collect())
    }

    pub fn len(&self) -> u64 {
        match self {
            IdSet::Sparse(s) => s.len() as u64,
            IdSet::Dense(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            IdSet::Sparse(s) => s.is_empty(),
            IdSet::Dense(b) => b.is_empty(),
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        match self {
            IdSet::Sparse(s) => s.contains(&id),
            IdSet::Dense(b) => b.contains(id),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IdSet::Sparse(s) => Box::new(s.iter().copied()),
            IdSet::Dense(b) => Box::new(b.iter()),
        }
    }

    /// Re-densify as a `RoaringBitmap` regardless of current representation;
    /// used when we need the cheap bitmap ops below.
    fn as_bitmap(&self) -> RoaringBitmap {
        match self {
            IdSet::Sparse(s) => s.iter().copied().collect(),
            IdSet::Dense(b) => b.clone(),
        }
    }

    pub fn union(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (IdSet::Sparse(a), IdSet::Sparse(b)) => IdSet::Sparse(a.union(b).copied().collect()),
            _ => IdSet::Dense(self.as_bitmap() | other.as_bitmap()),
        }
    }

    pub fn intersection(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (IdSet::Sparse(a), IdSet::Sparse(b)) => {
                IdSet::Sparse(a.intersection(b).copied().collect())
            }
            _ => IdSet::Dense(self.as_bitmap() & other.as_bitmap()),
        }
    }

    pub fn difference(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (IdSet::Sparse(a), IdSet::Sparse(b)) => {
                IdSet::Sparse(a.difference(b).copied().collect())
            }
            _ => IdSet::Dense(self.as_bitmap() - other.as_bitmap()),
        }
    }

    pub fn symmetric_difference(&self, other: &IdSet) -> IdSet {
        match (self, other) {
            (IdSet::Sparse(a), IdSet::Sparse(b)) => {
                IdSet::Sparse(a.symmetric_difference(b).copied().collect())
            }
            _ => IdSet::Dense(self.as_bitmap() ^ other.as_bitmap()),
        }
    }

    pub fn complement(&self, universe_size: u32) -> IdSet {
        let universe = RoaringBitmap::from_iter(0..universe_size);
        IdSet::Dense(universe - self.as_bitmap())
    }

    /// Intersect a whole list of read-group sets down to one candidate set.
    /// An empty list means "no restriction": the caller distinguishes that
    /// case itself, since there is no universe-sized value that means
    /// "everything" cheaply for an arbitrary id space.
    pub fn intersect_all<'a>(sets: impl IntoIterator<Item = &'a IdSet>) -> Option<IdSet> {
        let mut iter = sets.into_iter();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, s| acc.intersection(s)))
    }
}

impl FromIterator<u32> for IdSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        IdSet::Sparse(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[u32]) -> Vec<u32> {
        v.to_vec()
    }

    #[test]
    fn sparse_chosen_below_threshold() {
        let s = IdSet::from_ids(ids(&[1, 2, 3]), 1_000_000);
        assert!(matches!(s, IdSet::Sparse(_)));
    }

    #[test]
    fn dense_chosen_above_threshold() {
        let many: Vec<u32> = (0..800).collect();
        let s = IdSet::from_ids(many, 1000);
        assert!(matches!(s, IdSet::Dense(_)));
    }

    #[test]
    fn sparse_and_dense_agree_on_intersection() {
        let a_sparse = IdSet::Sparse([1u32, 2, 3, 4].into_iter().collect());
        let b_sparse = IdSet::Sparse([2u32, 3, 5].into_iter().collect());
        let a_dense = IdSet::Dense([1u32, 2, 3, 4].into_iter().collect());
        let b_dense = IdSet::Dense([2u32, 3, 5].into_iter().collect());

        let mut r1: Vec<u32> = a_sparse.intersection(&b_sparse).iter().collect();
        let mut r2: Vec<u32> = a_dense.intersection(&b_dense).iter().collect();
        let mut r3: Vec<u32> = a_sparse.intersection(&b_dense).iter().collect();
        r1.sort_unstable();
        r2.sort_unstable();
        r3.sort_unstable();
        assert_eq!(r1, vec![2, 3]);
        assert_eq!(r1, r2);
        assert_eq!(r1, r3);
    }

    #[test]
    fn complement_against_universe() {
        let s = IdSet::Sparse([1u32, 3].into_iter().collect());
        let c = s.complement(5);
        let mut got: Vec<u32> = c.iter().collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 2, 4]);
    }

    #[test]
    fn intersect_all_empty_list_is_none() {
        assert!(IdSet::intersect_all(std::iter::empty()).is_none());
    }

    #[test]
    fn intersect_all_combines_every_set() {
        let a = IdSet::Sparse([1u32, 2, 3].into_iter().collect());
        let b = IdSet::Sparse([2u32, 3, 4].into_iter().collect());
        let c = IdSet::Sparse([3u32, 4, 5].into_iter().collect());
        let combined = IdSet::intersect_all([&a, &b, &c]).unwrap();
        let mut got: Vec<u32> = combined.iter().collect();
        got.sort_unstable();
        assert_eq!(got, vec![3]);
    }
}

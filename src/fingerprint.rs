//! Order-independent cluster fingerprints and the dedup index.
//!
//! A cluster is identified by the aggregate `(count, sum, sum of squares)`
//! of its member ids. Identical member multisets always produce identical
//! fingerprints regardless of the member order. The converse does not hold:
//! distinct multisets sharing all three aggregates are treated as duplicates.

use crate::cnl::NodeId;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

/// Aggregate fingerprint of a cluster's member ids.
///
/// Accumulators are widened beyond [`NodeId`] so that squaring and summing
/// the largest ids can not overflow for any practical cluster size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    count: u64,
    sum: u64,
    sum_sq: u128,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include a member id.
    #[inline]
    pub fn add(&mut self, id: NodeId) {
        let id = u64::from(id);
        self.count += 1;
        self.sum += id;
        self.sum_sq += u128::from(id * id);
    }

    /// Reset all the accumulators for the next cluster.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of aggregated ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn sum_sq(&self) -> u128 {
        self.sum_sq
    }

    /// Scalar hash of the aggregate, the dedup index key.
    #[inline]
    pub fn scalar_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl FromIterator<NodeId> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = NodeId>>(ids: I) -> Self {
        let mut fp = Self::new();
        ids.into_iter().for_each(|id| fp.add(id));
        fp
    }
}

/// Fingerprints of the accepted clusters, bucketed by their scalar hash.
///
/// The first occurrence of a fingerprint wins, later duplicates are rejected.
#[derive(Debug, Default)]
pub struct DedupIndex {
    buckets: FxHashMap<u64, Vec<Fingerprint>>,
    len: usize,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the fingerprint unless an identical one is already stored.
    ///
    /// Returns true if the fingerprint is new, false for a duplicate.
    pub fn try_insert(&mut self, fp: &Fingerprint) -> bool {
        let bucket = self.buckets.entry(fp.scalar_hash()).or_default();
        if bucket.contains(fp) {
            return false;
        }
        bucket.push(*fp);
        self.len += 1;
        true
    }

    /// Whether an identical fingerprint is stored.
    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.buckets
            .get(&fp.scalar_hash())
            .is_some_and(|bucket| bucket.contains(fp))
    }

    /// Number of stored (accepted) clusters.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of clusters the index holds without rehashing.
    pub fn capacity(&self) -> usize {
        self.buckets.capacity()
    }

    /// Make room for `clusters` clusters in total.
    pub fn reserve_total(&mut self, clusters: usize) {
        if self.capacity() < clusters {
            self.buckets.reserve(clusters - self.buckets.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a: Fingerprint = [1, 2, 3].into_iter().collect();
        let b: Fingerprint = [3, 1, 2].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.scalar_hash(), b.scalar_hash());
        assert_eq!(a.len(), 3);
        assert_eq!(a.sum(), 6);
        assert_eq!(a.sum_sq(), 14);
    }

    #[test]
    fn test_fingerprint_distinguishes_equal_sums() {
        // Same size and sum, different sums of squares
        let a: Fingerprint = [1, 4].into_iter().collect();
        let b: Fingerprint = [2, 3].into_iter().collect();
        assert_eq!(a.sum(), b.sum());
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_multiset() {
        let a: Fingerprint = [5, 5].into_iter().collect();
        let b: Fingerprint = [5].into_iter().collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_collision_is_a_duplicate() {
        // {1, 5, 6} and {2, 3, 7}: size 3, sum 12, sum of squares 62
        let a: Fingerprint = [1, 5, 6].into_iter().collect();
        let b: Fingerprint = [2, 3, 7].into_iter().collect();
        assert_eq!(a, b);

        let mut index = DedupIndex::new();
        assert!(index.try_insert(&a));
        assert!(!index.try_insert(&b));
    }

    #[test]
    fn test_fingerprint_max_ids_do_not_overflow() {
        let fp: Fingerprint = std::iter::repeat(NodeId::MAX).take(1000).collect();
        let max = u128::from(NodeId::MAX);
        assert_eq!(fp.sum_sq(), 1000 * max * max);
        assert_eq!(fp.sum(), 1000 * u64::from(NodeId::MAX));
    }

    #[test]
    fn test_fingerprint_clear() {
        let mut fp: Fingerprint = [7, 8].into_iter().collect();
        fp.clear();
        assert!(fp.is_empty());
        assert_eq!(fp, Fingerprint::new());
    }

    #[test]
    fn test_dedup_index_first_occurrence_wins() {
        let mut index = DedupIndex::new();
        index.reserve_total(16);
        assert!(index.capacity() >= 16);

        let a: Fingerprint = [1, 2].into_iter().collect();
        let b: Fingerprint = [2, 1].into_iter().collect();
        let c: Fingerprint = [3, 4].into_iter().collect();

        assert!(index.try_insert(&a));
        assert!(!index.try_insert(&b));
        assert!(index.try_insert(&c));
        assert!(index.contains(&b));
        assert_eq!(index.len(), 2);
    }
}

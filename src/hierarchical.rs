//! Hierarchical bitmap: a plain bitmap plus summary layers.
//!
//! Each bit of a summary layer says whether the word below it has any bit set,
//! so iteration and combination skip empty regions a whole word at a time.
//! The layers come from `hibitset`; this wrapper adds the cardinality and the
//! analytic size the harness reports.

use hibitset::{BitSet, BitSetAnd, BitSetLike, BitSetOr};

/// Exclusive upper bound on values a hierarchical bitmap can hold: four
/// layers of one machine word each.
pub const MAX_UNIVERSE: u32 = 1 << (4 * usize::BITS.trailing_zeros());

/// A `hibitset::BitSet` with a cached cardinality.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalSet {
    bits: BitSet,
    len: u64,
}

impl HierarchicalSet {
    /// Build from values below [`MAX_UNIVERSE`].
    pub fn from_values(values: &[u32]) -> Self {
        let capacity = values.iter().copied().max().unwrap_or(0);
        let mut bits = BitSet::with_capacity(capacity);
        let mut len = 0;
        for &v in values {
            debug_assert!(v < MAX_UNIVERSE);
            if !bits.add(v) {
                len += 1;
            }
        }
        Self { bits, len }
    }

    fn collect(layers: impl BitSetLike) -> Self {
        let mut set = Self::default();
        for v in layers.iter() {
            set.bits.add(v);
            set.len += 1;
        }
        set
    }

    /// Number of elements. O(1).
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Return true if the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if value exists.
    pub fn contains(&self, value: u32) -> bool {
        value < MAX_UNIVERSE && self.bits.contains(value)
    }

    /// Remove `value`, returning true if it was present.
    pub fn remove(&mut self, value: u32) -> bool {
        if !self.contains(value) {
            return false;
        }
        self.bits.remove(value);
        self.len -= 1;
        true
    }

    /// Intersection, walking only words whose summary bits overlap.
    pub fn and(&self, other: &HierarchicalSet) -> HierarchicalSet {
        Self::collect(BitSetAnd(&self.bits, &other.bits))
    }

    /// Union.
    pub fn or(&self, other: &HierarchicalSet) -> HierarchicalSet {
        Self::collect(BitSetOr(&self.bits, &other.bits))
    }

    /// Iterate over values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (&self.bits).iter()
    }

    /// Analytic size in bits: every layer word needed up to the largest value.
    pub fn size_bits(&self) -> u64 {
        let word = u64::from(usize::BITS);
        let shift = usize::BITS.trailing_zeros();
        let top = u64::from(self.iter().last().unwrap_or(0));
        let words = |level: u32| (top >> (shift * level)) + 1;
        word * (words(1) + words(2) + words(3) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchical_basic() {
        let values = vec![0, 63, 64, 4095, 4096, 262_144, 1_000_000];
        let set = HierarchicalSet::from_values(&values);
        assert_eq!(set.len(), 7);
        assert!(set.contains(4096));
        assert!(!set.contains(4097));
        assert!(!set.contains(u32::MAX));
        assert_eq!(set.iter().collect::<Vec<_>>(), values);
    }

    #[test]
    fn and_or_remove() {
        let a = HierarchicalSet::from_values(&[1, 5, 9, 70_000]);
        let mut b = HierarchicalSet::from_values(&[5, 6, 70_000, 900_000]);
        let and = a.and(&b);
        assert_eq!(and.iter().collect::<Vec<_>>(), vec![5, 70_000]);
        assert_eq!(and.len(), 2);
        let or = a.or(&b);
        assert_eq!(or.len(), 6);
        assert_eq!(
            or.iter().collect::<Vec<_>>(),
            vec![1, 5, 6, 9, 70_000, 900_000]
        );
        assert!(b.remove(6));
        assert!(!b.remove(6));
        assert!(!b.remove(u32::MAX));
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn size_grows_with_largest_value() {
        let small = HierarchicalSet::from_values(&[3]);
        let large = HierarchicalSet::from_values(&[3, 1_000_000]);
        assert_eq!(small.size_bits(), 4 * u64::from(usize::BITS));
        assert!(large.size_bits() > small.size_bits());
        assert!(HierarchicalSet::default().is_empty());
    }
}

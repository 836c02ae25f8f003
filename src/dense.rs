//! Plain dense bitset: the zero-index baseline.
//!
//! One bit per universe value and nothing else apart from a cached popcount.
//! Uses $N$ bits regardless of cardinality, so it is optimal only when the
//! density approaches 1 and becomes the worst candidate at low densities.
//!
//! Registered in the harness as `bitset`.

/// An uncompressed bitset over `[0, universe)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenseBitSet {
    words: Vec<u64>,
    universe: u32,
    ones: usize,
}

impl DenseBitSet {
    /// Create an empty bitset covering `[0, universe)`.
    pub fn new(universe: u32) -> Self {
        Self {
            words: vec![0u64; (universe as usize).div_ceil(64)],
            universe,
            ones: 0,
        }
    }

    /// Build a bitset holding exactly `values`.
    ///
    /// Values at or beyond `universe` are ignored; duplicates count once.
    pub fn from_values(values: &[u32], universe: u32) -> Self {
        let mut set = Self::new(universe);
        for &v in values {
            set.insert(v);
        }
        set
    }

    /// Set the bit for `value`. Returns true if it was newly inserted.
    pub fn insert(&mut self, value: u32) -> bool {
        if value >= self.universe {
            return false;
        }
        let (w, mask) = locate(value);
        let fresh = self.words[w] & mask == 0;
        self.words[w] |= mask;
        self.ones += fresh as usize;
        fresh
    }

    /// Clear the bit for `value`. Returns true if it was present.
    pub fn remove(&mut self, value: u32) -> bool {
        if value >= self.universe {
            return false;
        }
        let (w, mask) = locate(value);
        let present = self.words[w] & mask != 0;
        self.words[w] &= !mask;
        self.ones -= present as usize;
        present
    }

    /// Return true if `value` is in the set. O(1).
    pub fn contains(&self, value: u32) -> bool {
        if value >= self.universe {
            return false;
        }
        let (w, mask) = locate(value);
        self.words[w] & mask != 0
    }

    /// Number of elements. O(1).
    pub fn len(&self) -> usize {
        self.ones
    }

    /// Return true if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.ones == 0
    }

    /// Exclusive upper bound of representable values.
    pub fn universe(&self) -> u32 {
        self.universe
    }

    /// Word-wise intersection. The result covers the smaller universe.
    pub fn and(&self, other: &Self) -> Self {
        let words: Vec<u64> = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| a & b)
            .collect();
        Self::from_words(words, self.universe.min(other.universe))
    }

    /// Word-wise union. The result covers the larger universe.
    pub fn or(&self, other: &Self) -> Self {
        let (long, short) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut words = long.words.clone();
        for (w, &s) in words.iter_mut().zip(&short.words) {
            *w |= s;
        }
        Self::from_words(words, self.universe.max(other.universe))
    }

    /// Iterate over the set values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros();
                word &= word - 1;
                Some(w as u32 * 64 + bit)
            })
        })
    }

    /// Encoded size in bytes: the data words only.
    pub fn serialized_size(&self) -> usize {
        self.words.len() * 8
    }

    fn from_words(words: Vec<u64>, universe: u32) -> Self {
        let ones = words.iter().map(|w| w.count_ones() as usize).sum();
        Self {
            words,
            universe,
            ones,
        }
    }
}

#[inline]
fn locate(value: u32) -> (usize, u64) {
    ((value / 64) as usize, 1u64 << (value % 64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_contains() {
        let mut s = DenseBitSet::new(200);
        assert!(s.insert(0));
        assert!(s.insert(199));
        assert!(!s.insert(199));
        assert!(!s.insert(200));
        assert_eq!(s.len(), 2);
        assert!(s.contains(199));
        assert!(s.remove(0));
        assert!(!s.remove(0));
        assert_eq!(s.len(), 1);
        assert!(!s.contains(0));
    }

    #[test]
    fn and_or_match_sets() {
        let a = DenseBitSet::from_values(&[1, 5, 64, 130], 150);
        let b = DenseBitSet::from_values(&[5, 64, 65, 149], 150);
        assert_eq!(a.and(&b).iter().collect::<Vec<_>>(), vec![5, 64]);
        assert_eq!(
            a.or(&b).iter().collect::<Vec<_>>(),
            vec![1, 5, 64, 65, 130, 149]
        );
        assert_eq!(a.and(&b).len(), 2);
        assert_eq!(a.or(&b).len(), 6);
    }

    #[test]
    fn size_depends_on_universe_only() {
        let empty = DenseBitSet::new(1000);
        let full = DenseBitSet::from_values(&(0..1000).collect::<Vec<_>>(), 1000);
        assert_eq!(empty.serialized_size(), full.serialized_size());
        assert_eq!(full.len(), 1000);
        assert!(empty.is_empty());
    }
}

//! Hybrid hierarchical set encoding (Roaring-style containers).
//!
//! The universe is cut into 2^16-value chunks keyed by the high 16 bits. Each
//! non-empty chunk picks its own container:
//! - sorted array of 16-bit values for sparse chunks
//! - 8 KiB bitmap once the chunk holds more than `array_threshold` values
//! - run-length `(start, len)` pairs, when run containers are enabled and smaller
//!
//! The array/bitmap switch point is not a constant here: it arrives with every
//! build through [`HybridConfig`], so one binary can sweep several thresholds.

use std::cmp::Ordering;

const BITMAP_WORDS: usize = 1024;

/// Tuning knobs for [`HybridSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridConfig {
    /// A chunk with more than this many values is stored as a bitmap.
    pub array_threshold: usize,
    /// Allow run-length containers when they encode smaller.
    pub run_containers: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            array_threshold: 4096,
            run_containers: false,
        }
    }
}

/// Container types for different density patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Container {
    Array(Vec<u16>),
    Bitmap(Box<[u64; BITMAP_WORDS]>),
    /// Inclusive runs: `(start, len)` covers `start..=start + len`.
    Runs(Vec<(u16, u16)>),
}

impl Container {
    fn cardinality(&self) -> usize {
        match self {
            Container::Array(arr) => arr.len(),
            Container::Bitmap(bm) => bm.iter().map(|w| w.count_ones() as usize).sum(),
            Container::Runs(runs) => runs.iter().map(|&(_, len)| len as usize + 1).sum(),
        }
    }

    fn contains(&self, val: u16) -> bool {
        match self {
            Container::Array(arr) => arr.binary_search(&val).is_ok(),
            Container::Bitmap(bm) => (bm[(val / 64) as usize] >> (val % 64)) & 1 == 1,
            Container::Runs(runs) => match run_index(runs, val) {
                Some(i) => val - runs[i].0 <= runs[i].1,
                None => false,
            },
        }
    }

    fn remove(&mut self, val: u16) -> bool {
        match self {
            Container::Array(arr) => match arr.binary_search(&val) {
                Ok(pos) => {
                    arr.remove(pos);
                    true
                }
                Err(_) => false,
            },
            Container::Bitmap(bm) => {
                let word = &mut bm[(val / 64) as usize];
                let mask = 1u64 << (val % 64);
                let present = *word & mask != 0;
                *word &= !mask;
                present
            }
            Container::Runs(runs) => {
                let Some(i) = run_index(runs, val) else {
                    return false;
                };
                let (start, len) = runs[i];
                if val - start > len {
                    return false;
                }
                let end = start + len;
                if len == 0 {
                    runs.remove(i);
                } else if val == start {
                    runs[i] = (start + 1, len - 1);
                } else if val == end {
                    runs[i] = (start, len - 1);
                } else {
                    runs[i] = (start, val - start - 1);
                    runs.insert(i + 1, (val + 1, end - val - 1));
                }
                true
            }
        }
    }

    fn to_array(&self) -> Vec<u16> {
        match self {
            Container::Array(arr) => arr.clone(),
            Container::Bitmap(bm) => {
                let mut arr = Vec::new();
                for (word_idx, &word) in bm.iter().enumerate() {
                    let mut w = word;
                    while w != 0 {
                        let bit_idx = w.trailing_zeros();
                        arr.push((word_idx * 64 + bit_idx as usize) as u16);
                        w &= w - 1;
                    }
                }
                arr
            }
            Container::Runs(runs) => runs
                .iter()
                .flat_map(|&(start, len)| start..=start + len)
                .collect(),
        }
    }

    fn to_bitmap(&self) -> Box<[u64; BITMAP_WORDS]> {
        match self {
            Container::Bitmap(bm) => bm.clone(),
            _ => {
                let mut bm = Box::new([0u64; BITMAP_WORDS]);
                for val in self.to_array() {
                    bm[(val / 64) as usize] |= 1u64 << (val % 64);
                }
                bm
            }
        }
    }

    fn to_runs(&self) -> Vec<(u16, u16)> {
        if let Container::Runs(runs) = self {
            return runs.clone();
        }
        let arr = self.to_array();
        let mut runs: Vec<(u16, u16)> = Vec::new();
        for val in arr {
            match runs.last_mut() {
                Some((start, len)) if u32::from(*start) + u32::from(*len) + 1 == u32::from(val) => {
                    *len += 1;
                }
                _ => runs.push((val, 0)),
            }
        }
        runs
    }

    /// Number of maximal runs of consecutive values.
    fn run_count(&self) -> usize {
        match self {
            Container::Array(arr) => {
                if arr.is_empty() {
                    return 0;
                }
                1 + arr.windows(2).filter(|w| w[1] != w[0] + 1).count()
            }
            Container::Bitmap(bm) => {
                let mut carry = 0u64;
                let mut count = 0usize;
                for &w in bm.iter() {
                    // A run starts at every set bit whose predecessor is clear.
                    count += (w & !((w << 1) | carry)).count_ones() as usize;
                    carry = w >> 63;
                }
                count
            }
            Container::Runs(runs) => runs.len(),
        }
    }

    /// Encoded size in bytes, including the type tag.
    fn size_bytes(&self) -> usize {
        match self {
            Container::Array(arr) => arr.len() * 2 + 4,
            Container::Bitmap(_) => 8 * BITMAP_WORDS + 1,
            Container::Runs(runs) => runs.len() * 4 + 4,
        }
    }

    /// Re-pick the container kind for the current contents.
    fn optimize(&mut self, config: &HybridConfig) {
        let card = self.cardinality();
        let dense = card > config.array_threshold;
        let plain_bytes = if dense { 8 * BITMAP_WORDS + 1 } else { card * 2 + 4 };

        if config.run_containers && self.run_count() * 4 + 4 < plain_bytes {
            if !matches!(self, Container::Runs(_)) {
                *self = Container::Runs(self.to_runs());
            }
            return;
        }

        match self {
            Container::Bitmap(_) if dense => {}
            Container::Array(_) if !dense => {}
            _ if dense => *self = Container::Bitmap(self.to_bitmap()),
            _ => *self = Container::Array(self.to_array()),
        }
    }

    fn intersect(c1: &Container, c2: &Container) -> Container {
        match (c1, c2) {
            (Container::Array(a1), Container::Array(a2)) => {
                let mut result = Vec::with_capacity(a1.len().min(a2.len()));
                let mut i = 0;
                let mut j = 0;
                while i < a1.len() && j < a2.len() {
                    match a1[i].cmp(&a2[j]) {
                        Ordering::Less => i += 1,
                        Ordering::Greater => j += 1,
                        Ordering::Equal => {
                            result.push(a1[i]);
                            i += 1;
                            j += 1;
                        }
                    }
                }
                Container::Array(result)
            }
            (Container::Bitmap(b1), Container::Bitmap(b2)) => {
                let mut result = Box::new([0u64; BITMAP_WORDS]);
                for (r, (x, y)) in result.iter_mut().zip(b1.iter().zip(b2.iter())) {
                    *r = x & y;
                }
                Container::Bitmap(result)
            }
            (Container::Array(arr), other @ (Container::Bitmap(_) | Container::Runs(_)))
            | (other @ (Container::Bitmap(_) | Container::Runs(_)), Container::Array(arr)) => {
                Container::Array(arr.iter().copied().filter(|&v| other.contains(v)).collect())
            }
            (Container::Runs(r1), Container::Runs(r2)) => {
                let mut result = Vec::new();
                let mut i = 0;
                let mut j = 0;
                while i < r1.len() && j < r2.len() {
                    let (s1, e1) = (r1[i].0, r1[i].0 + r1[i].1);
                    let (s2, e2) = (r2[j].0, r2[j].0 + r2[j].1);
                    let lo = s1.max(s2);
                    let hi = e1.min(e2);
                    if lo <= hi {
                        result.push((lo, hi - lo));
                    }
                    if e1 < e2 {
                        i += 1;
                    } else {
                        j += 1;
                    }
                }
                Container::Runs(result)
            }
            (Container::Runs(_), Container::Bitmap(bm))
            | (Container::Bitmap(bm), Container::Runs(_)) => {
                let runs = if let Container::Runs(_) = c1 { c1 } else { c2 };
                let mut result = Box::new([0u64; BITMAP_WORDS]);
                let mask = runs.to_bitmap();
                for (r, (x, y)) in result.iter_mut().zip(bm.iter().zip(mask.iter())) {
                    *r = x & y;
                }
                Container::Bitmap(result)
            }
        }
    }

    fn union(c1: &Container, c2: &Container) -> Container {
        match (c1, c2) {
            (Container::Bitmap(bm), other) | (other, Container::Bitmap(bm)) => {
                let mut result = bm.clone();
                match other {
                    Container::Bitmap(b2) => {
                        for (r, w) in result.iter_mut().zip(b2.iter()) {
                            *r |= w;
                        }
                    }
                    _ => {
                        for val in other.to_array() {
                            result[(val / 64) as usize] |= 1u64 << (val % 64);
                        }
                    }
                }
                Container::Bitmap(result)
            }
            _ => {
                let arr1 = c1.to_array();
                let arr2 = c2.to_array();
                let mut result = Vec::with_capacity(arr1.len() + arr2.len());
                let mut i = 0;
                let mut j = 0;
                while i < arr1.len() && j < arr2.len() {
                    match arr1[i].cmp(&arr2[j]) {
                        Ordering::Less => {
                            result.push(arr1[i]);
                            i += 1;
                        }
                        Ordering::Greater => {
                            result.push(arr2[j]);
                            j += 1;
                        }
                        Ordering::Equal => {
                            result.push(arr1[i]);
                            i += 1;
                            j += 1;
                        }
                    }
                }
                result.extend_from_slice(&arr1[i..]);
                result.extend_from_slice(&arr2[j..]);
                Container::Array(result)
            }
        }
    }
}

/// Index of the last run starting at or before `val`.
fn run_index(runs: &[(u16, u16)], val: u16) -> Option<usize> {
    runs.partition_point(|&(start, _)| start <= val).checked_sub(1)
}

/// A compressed integer set made of per-chunk containers.
#[derive(Debug, Clone)]
pub struct HybridSet {
    /// High 16 bits -> container, ascending by key, never empty.
    containers: Vec<(u16, Container)>,
    len: u64,
    config: HybridConfig,
}

impl HybridSet {
    /// Create an empty set.
    pub fn new(config: HybridConfig) -> Self {
        Self {
            containers: Vec::new(),
            len: 0,
            config,
        }
    }

    /// Build from a strictly ascending slice.
    pub fn from_sorted(values: &[u32], config: HybridConfig) -> Self {
        let mut set = Self::new(config);
        for chunk in values.chunk_by(|a, b| a >> 16 == b >> 16) {
            let high = (chunk[0] >> 16) as u16;
            let mut container = Container::Array(chunk.iter().map(|&v| v as u16).collect());
            container.optimize(&config);
            set.containers.push((high, container));
        }
        set.len = values.len() as u64;
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

    /// Number of non-empty chunks.
    pub fn num_containers(&self) -> usize {
        self.containers.len()
    }

    /// Check if value exists.
    pub fn contains(&self, val: u32) -> bool {
        let (high, low) = split(val);
        match self.containers.binary_search_by_key(&high, |&(h, _)| h) {
            Ok(idx) => self.containers[idx].1.contains(low),
            Err(_) => false,
        }
    }

    /// Remove `val`, returning true if it was present.
    ///
    /// A bitmap chunk that falls to the threshold is demoted to an array; an
    /// emptied chunk is dropped.
    pub fn remove(&mut self, val: u32) -> bool {
        let (high, low) = split(val);
        let Ok(idx) = self.containers.binary_search_by_key(&high, |&(h, _)| h) else {
            return false;
        };
        let container = &mut self.containers[idx].1;
        if !container.remove(low) {
            return false;
        }
        self.len -= 1;
        if !matches!(container, Container::Array(_)) {
            container.optimize(&self.config);
        }
        // An emptied chunk always ends up as an array.
        if matches!(container, Container::Array(arr) if arr.is_empty()) {
            self.containers.remove(idx);
        }
        true
    }

    /// Intersection with another set. The result uses `self`'s configuration.
    pub fn and(&self, other: &HybridSet) -> HybridSet {
        let mut result = HybridSet::new(self.config);
        let mut i = 0;
        let mut j = 0;
        while i < self.containers.len() && j < other.containers.len() {
            let (high1, c1) = &self.containers[i];
            let (high2, c2) = &other.containers[j];
            match high1.cmp(high2) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    let mut c = Container::intersect(c1, c2);
                    let card = c.cardinality();
                    if card > 0 {
                        c.optimize(&self.config);
                        result.len += card as u64;
                        result.containers.push((*high1, c));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        result
    }

    /// Union with another set. The result uses `self`'s configuration.
    pub fn or(&self, other: &HybridSet) -> HybridSet {
        let mut result = HybridSet::new(self.config);
        let mut i = 0;
        let mut j = 0;
        while i < self.containers.len() || j < other.containers.len() {
            let next = match (self.containers.get(i), other.containers.get(j)) {
                (Some((h1, c1)), Some((h2, c2))) => match h1.cmp(h2) {
                    Ordering::Less => {
                        i += 1;
                        (*h1, c1.clone())
                    }
                    Ordering::Greater => {
                        j += 1;
                        (*h2, c2.clone())
                    }
                    Ordering::Equal => {
                        i += 1;
                        j += 1;
                        let mut c = Container::union(c1, c2);
                        c.optimize(&self.config);
                        (*h1, c)
                    }
                },
                (Some((h, c)), None) => {
                    i += 1;
                    (*h, c.clone())
                }
                (None, Some((h, c))) => {
                    j += 1;
                    (*h, c.clone())
                }
                (None, None) => break,
            };
            result.len += next.1.cardinality() as u64;
            result.containers.push(next);
        }
        result
    }

    /// Iterate over values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.containers.iter().flat_map(|(high, c)| {
            let high = u32::from(*high) << 16;
            c.to_array().into_iter().map(move |low| high | u32::from(low))
        })
    }

    /// Encoded size in bytes: container count, then key and container per chunk.
    pub fn size_bytes(&self) -> usize {
        4 + self
            .containers
            .iter()
            .map(|(_, c)| 2 + c.size_bytes())
            .sum::<usize>()
    }

    /// Count of (array, bitmap, run) containers.
    pub fn container_kinds(&self) -> (usize, usize, usize) {
        self.containers
            .iter()
            .fold((0, 0, 0), |(a, b, r), (_, c)| match c {
                Container::Array(_) => (a + 1, b, r),
                Container::Bitmap(_) => (a, b + 1, r),
                Container::Runs(_) => (a, b, r + 1),
            })
    }
}

#[inline]
fn split(val: u32) -> (u16, u16) {
    ((val >> 16) as u16, val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(array_threshold: usize, run_containers: bool) -> HybridConfig {
        HybridConfig {
            array_threshold,
            run_containers,
        }
    }

    #[test]
    fn test_hybrid_basic() {
        let values = vec![1, 5, 70_000, 70_001, 200_000];
        let set = HybridSet::from_sorted(&values, HybridConfig::default());
        assert_eq!(set.len(), 5);
        assert_eq!(set.num_containers(), 3);
        assert!(set.contains(70_001));
        assert!(!set.contains(70_002));
        assert_eq!(set.iter().collect::<Vec<_>>(), values);
    }

    #[test]
    fn threshold_picks_container_kind() {
        let values: Vec<u32> = (0..100).map(|i| i * 3).collect();
        assert_eq!(
            HybridSet::from_sorted(&values, cfg(1024, false)).container_kinds(),
            (1, 0, 0)
        );
        assert_eq!(
            HybridSet::from_sorted(&values, cfg(10, false)).container_kinds(),
            (0, 1, 0)
        );
    }

    #[test]
    fn bitmap_demotes_after_remove() {
        let values: Vec<u32> = (0..11).collect();
        let mut set = HybridSet::from_sorted(&values, cfg(10, false));
        assert_eq!(set.container_kinds(), (0, 1, 0));
        assert!(set.remove(4));
        assert!(!set.remove(4));
        assert_eq!(set.container_kinds(), (1, 0, 0));
        assert_eq!(set.len(), 10);
        assert!(!set.contains(4));
    }

    #[test]
    fn removing_last_value_drops_chunk() {
        let mut set = HybridSet::from_sorted(&[3, 65_536], HybridConfig::default());
        assert!(set.remove(65_536));
        assert_eq!(set.num_containers(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn runs_are_used_for_ranges() {
        let values: Vec<u32> = (100..5000).collect();
        let set = HybridSet::from_sorted(&values, cfg(4096, true));
        assert_eq!(set.container_kinds(), (0, 0, 1));
        assert_eq!(set.size_bytes(), 4 + 2 + 8);
        let plain = HybridSet::from_sorted(&values, cfg(4096, false));
        assert!(plain.size_bytes() > set.size_bytes());
    }

    #[test]
    fn run_remove_splits() {
        let values: Vec<u32> = (0..1000).collect();
        let mut set = HybridSet::from_sorted(&values, cfg(4096, true));
        assert!(set.remove(500));
        assert!(set.remove(0));
        assert!(set.remove(999));
        assert_eq!(set.len(), 997);
        let expected: Vec<u32> = (1..999).filter(|&v| v != 500).collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn and_or_across_kinds() {
        let dense: Vec<u32> = (0..3000).collect();
        let sparse: Vec<u32> = (0..100).map(|i| i * 37).collect();
        for (t, runs) in [(1, false), (64, false), (4096, false), (64, true)] {
            let a = HybridSet::from_sorted(&dense, cfg(t, runs));
            let b = HybridSet::from_sorted(&sparse, cfg(t, runs));
            let and: Vec<u32> = sparse.iter().copied().filter(|&v| v < 3000).collect();
            assert_eq!(a.and(&b).iter().collect::<Vec<_>>(), and);
            assert_eq!(a.and(&b).len(), and.len() as u64);
            let mut or = dense.clone();
            or.extend(sparse.iter().filter(|&&v| v >= 3000));
            assert_eq!(a.or(&b).iter().collect::<Vec<_>>(), or);
            assert_eq!(b.or(&a).len(), or.len() as u64);
        }
    }

    #[test]
    fn run_run_intersection() {
        let a: Vec<u32> = (0..100).chain(200..300).collect();
        let b: Vec<u32> = (50..250).collect();
        let a = HybridSet::from_sorted(&a, cfg(4096, true));
        let b = HybridSet::from_sorted(&b, cfg(4096, true));
        let expected: Vec<u32> = (50..100).chain(200..250).collect();
        assert_eq!(a.and(&b).iter().collect::<Vec<_>>(), expected);
    }
}

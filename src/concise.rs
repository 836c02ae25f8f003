//! Word-aligned run-length compressed bitmaps: Concise, and WAH as its restricted mode.
//!
//! The bitmap is cut into 31-bit blocks and stored as 32-bit words:
//!
//! | word | layout |
//! |---|---|
//! | literal | `1` · 31 payload bits |
//! | fill | `0` · fill bit · 5-bit flip position · 25-bit block count − 1 |
//!
//! A fill stands for `count` blocks that are all zeros or all ones. In Concise
//! mode a literal that differs from the following fill in exactly one bit is
//! folded into it: the flip position `p > 0` says bit `p - 1` of the fill's first
//! block is inverted. WAH mode never folds, so every flip position is zero.
//!
//! Trailing zero blocks are never stored.
//!
//! # References
//!
//! - Wu, K., Otoo, E., & Shoshani, A. (2006).
//!   "Optimizing bitmap indices with efficient compression."
//! - Colantonio, A., & Di Pietro, R. (2010). "Concise: Compressed 'n' Composable Integer Set."

const LITERAL_FLAG: u32 = 1 << 31;
const ONES_FLAG: u32 = 1 << 30;
const PAYLOAD: u32 = 0x7FFF_FFFF;
const FLIP_SHIFT: u32 = 25;
const FLIP_MASK: u32 = 0x1F;
const COUNT_MASK: u32 = (1 << FLIP_SHIFT) - 1;
const MAX_FILL_BLOCKS: u64 = 1 << FLIP_SHIFT;
const BLOCK_BITS: u32 = 31;

/// A compressed bitmap in Concise or WAH encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConciseSet {
    words: Vec<u32>,
    len: u64,
    wah: bool,
}

/// Decoded unit of the word stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Literal(u32),
    Fill { ones: bool, blocks: u64 },
}

impl Run {
    fn blocks(self) -> u64 {
        match self {
            Run::Literal(_) => 1,
            Run::Fill { blocks, .. } => blocks,
        }
    }

    fn first_block(self) -> u32 {
        match self {
            Run::Literal(p) => p,
            Run::Fill { ones, .. } => pattern(ones),
        }
    }
}

#[inline]
fn pattern(ones: bool) -> u32 {
    if ones {
        PAYLOAD
    } else {
        0
    }
}

#[inline]
fn fill_word(ones: bool, flip: u32, blocks: u64) -> u32 {
    debug_assert!((1..=MAX_FILL_BLOCKS).contains(&blocks));
    (u32::from(ones) << 30) | (flip << FLIP_SHIFT) | (blocks - 1) as u32
}

impl ConciseSet {
    /// Empty set. `wah` selects the WAH restriction.
    pub fn new(wah: bool) -> Self {
        Self {
            words: Vec::new(),
            len: 0,
            wah,
        }
    }

    /// Build from a strictly ascending slice.
    pub fn from_sorted(values: &[u32], wah: bool) -> Self {
        let mut builder = Builder::new(wah);
        let mut next_block = 0u64;
        for chunk in values.chunk_by(|a, b| a / BLOCK_BITS == b / BLOCK_BITS) {
            let block = u64::from(chunk[0] / BLOCK_BITS);
            builder.push_fill(false, block - next_block);
            builder.push_block(chunk.iter().fold(0, |acc, &v| acc | 1 << (v % BLOCK_BITS)));
            next_block = block + 1;
        }
        builder.finish()
    }

    /// Whether this set uses the WAH restriction.
    pub fn is_wah(&self) -> bool {
        self.wah
    }

    /// Number of elements. O(1).
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Return true if the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of 32-bit words in the encoding.
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Encoded size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * 4
    }

    fn runs(&self) -> Runs<'_> {
        Runs {
            words: self.words.iter(),
            pending: None,
        }
    }

    /// Check if value exists. Linear in the number of words.
    pub fn contains(&self, value: u32) -> bool {
        let target = u64::from(value / BLOCK_BITS);
        let bit = 1u32 << (value % BLOCK_BITS);
        let mut pos = 0u64;
        for run in self.runs() {
            let n = run.blocks();
            if target < pos + n {
                return match run {
                    Run::Literal(p) => p & bit != 0,
                    Run::Fill { ones, .. } => ones,
                };
            }
            pos += n;
        }
        false
    }

    /// Remove `value`, returning true if it was present.
    ///
    /// The word stream is re-emitted around the affected block so the encoding
    /// stays canonical.
    pub fn remove(&mut self, value: u32) -> bool {
        if !self.contains(value) {
            return false;
        }
        let target = u64::from(value / BLOCK_BITS);
        let bit = 1u32 << (value % BLOCK_BITS);
        let mut builder = Builder::new(self.wah);
        let mut pos = 0u64;
        for run in self.runs() {
            let n = run.blocks();
            if (pos..pos + n).contains(&target) {
                match run {
                    Run::Literal(p) => builder.push_block(p & !bit),
                    Run::Fill { ones, .. } => {
                        builder.push_fill(ones, target - pos);
                        builder.push_block(pattern(ones) & !bit);
                        builder.push_fill(ones, pos + n - target - 1);
                    }
                }
            } else {
                builder.push_run(run);
            }
            pos += n;
        }
        *self = builder.finish();
        true
    }

    /// Intersection with another set, without decompressing fills.
    pub fn and(&self, other: &ConciseSet) -> ConciseSet {
        self.combine(other, |a, b| a & b, false)
    }

    /// Union with another set, without decompressing fills.
    pub fn or(&self, other: &ConciseSet) -> ConciseSet {
        self.combine(other, |a, b| a | b, true)
    }

    /// Walk both run streams block-aligned. Fills against fills are combined in
    /// one step; anything involving a literal advances one block.
    fn combine(&self, other: &ConciseSet, op: fn(u32, u32) -> u32, keep_tail: bool) -> ConciseSet {
        let mut builder = Builder::new(self.wah);
        let mut a = Cursor::new(self.runs());
        let mut b = Cursor::new(other.runs());
        loop {
            match (a.head, b.head) {
                (None, None) => break,
                (Some(run), None) | (None, Some(run)) => {
                    if !keep_tail {
                        break;
                    }
                    builder.push_run(run);
                    a.skip_if(run);
                    b.skip_if(run);
                }
                (
                    Some(Run::Fill { ones: x, blocks: n }),
                    Some(Run::Fill { ones: y, blocks: m }),
                ) => {
                    let k = n.min(m);
                    builder.push_fill(op(pattern(x), pattern(y)) == PAYLOAD, k);
                    a.advance(k);
                    b.advance(k);
                }
                (Some(x), Some(y)) => {
                    builder.push_block(op(x.first_block(), y.first_block()));
                    a.advance(1);
                    b.advance(1);
                }
            }
        }
        builder.finish()
    }

    /// Iterate over values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.runs()
            .scan(0u64, |pos, run| {
                let start = *pos;
                *pos += run.blocks();
                Some((start, run))
            })
            .flat_map(|(start, run)| {
                let base = start * u64::from(BLOCK_BITS);
                let (literal, full) = match run {
                    Run::Literal(p) => (p, 0..0),
                    Run::Fill { ones: true, blocks } => {
                        (0, base..base + blocks * u64::from(BLOCK_BITS))
                    }
                    Run::Fill { ones: false, .. } => (0, 0..0),
                };
                (0..BLOCK_BITS)
                    .filter(move |i| literal >> i & 1 == 1)
                    .map(move |i| base + u64::from(i))
                    .chain(full)
                    .map(|v| v as u32)
            })
    }
}

/// Decodes words into runs, splitting a flipped fill into its literal first block and the rest.
struct Runs<'a> {
    words: std::slice::Iter<'a, u32>,
    pending: Option<Run>,
}

impl Iterator for Runs<'_> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        if let Some(run) = self.pending.take() {
            return Some(run);
        }
        let w = *self.words.next()?;
        if w & LITERAL_FLAG != 0 {
            return Some(Run::Literal(w & PAYLOAD));
        }
        let ones = w & ONES_FLAG != 0;
        let blocks = u64::from(w & COUNT_MASK) + 1;
        let flip = (w >> FLIP_SHIFT) & FLIP_MASK;
        if flip == 0 {
            return Some(Run::Fill { ones, blocks });
        }
        if blocks > 1 {
            self.pending = Some(Run::Fill {
                ones,
                blocks: blocks - 1,
            });
        }
        Some(Run::Literal(pattern(ones) ^ (1 << (flip - 1))))
    }
}

/// A run stream with a partially consumed head.
struct Cursor<'a> {
    runs: Runs<'a>,
    head: Option<Run>,
}

impl<'a> Cursor<'a> {
    fn new(mut runs: Runs<'a>) -> Self {
        let head = runs.next();
        Self { runs, head }
    }

    fn advance(&mut self, n: u64) {
        self.head = match self.head {
            Some(Run::Fill { ones, blocks }) if blocks > n => Some(Run::Fill {
                ones,
                blocks: blocks - n,
            }),
            _ => self.runs.next(),
        };
    }

    fn skip_if(&mut self, run: Run) {
        if self.head == Some(run) {
            self.head = self.runs.next();
        }
    }
}

/// Appends blocks and keeps the word stream canonical.
struct Builder {
    words: Vec<u32>,
    len: u64,
    pending_zeros: u64,
    wah: bool,
}

impl Builder {
    fn new(wah: bool) -> Self {
        Self {
            words: Vec::new(),
            len: 0,
            pending_zeros: 0,
            wah,
        }
    }

    fn push_run(&mut self, run: Run) {
        match run {
            Run::Literal(p) => self.push_block(p),
            Run::Fill { ones, blocks } => self.push_fill(ones, blocks),
        }
    }

    fn push_block(&mut self, payload: u32) {
        match payload {
            0 => self.pending_zeros += 1,
            PAYLOAD => self.push_fill(true, 1),
            p => {
                self.flush_zeros();
                self.len += u64::from(p.count_ones());
                self.words.push(LITERAL_FLAG | p);
            }
        }
    }

    fn push_fill(&mut self, ones: bool, blocks: u64) {
        if blocks == 0 {
            return;
        }
        if !ones {
            self.pending_zeros += blocks;
            return;
        }
        self.flush_zeros();
        self.len += blocks * u64::from(BLOCK_BITS);
        self.emit_fill(true, blocks);
    }

    // Zero blocks wait until a non-zero block follows, so none trail.
    fn flush_zeros(&mut self) {
        let n = std::mem::take(&mut self.pending_zeros);
        if n > 0 {
            self.emit_fill(false, n);
        }
    }

    fn emit_fill(&mut self, ones: bool, mut blocks: u64) {
        if let Some(last) = self.words.last_mut() {
            if *last & LITERAL_FLAG == 0 {
                if (*last & ONES_FLAG != 0) == ones {
                    let held = u64::from(*last & COUNT_MASK) + 1;
                    let add = blocks.min(MAX_FILL_BLOCKS - held);
                    *last = (*last & !COUNT_MASK) | (held + add - 1) as u32;
                    blocks -= add;
                }
            } else if !self.wah {
                let diff = (*last & PAYLOAD) ^ pattern(ones);
                if diff.count_ones() == 1 {
                    let add = blocks.min(MAX_FILL_BLOCKS - 1);
                    *last = fill_word(ones, diff.trailing_zeros() + 1, add + 1);
                    blocks -= add;
                }
            }
        }
        while blocks > 0 {
            let n = blocks.min(MAX_FILL_BLOCKS);
            self.words.push(fill_word(ones, 0, n));
            blocks -= n;
        }
    }

    fn finish(self) -> ConciseSet {
        ConciseSet {
            words: self.words,
            len: self.len,
            wah: self.wah,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both(values: &[u32]) -> [ConciseSet; 2] {
        [
            ConciseSet::from_sorted(values, false),
            ConciseSet::from_sorted(values, true),
        ]
    }

    #[test]
    fn test_concise_basic() {
        let values = vec![0, 30, 31, 1000, 1_000_000];
        for set in both(&values) {
            assert_eq!(set.len(), 5);
            assert!(set.contains(31));
            assert!(!set.contains(32));
            assert!(!set.contains(2_000_000));
            assert_eq!(set.iter().collect::<Vec<_>>(), values);
        }
        assert!(ConciseSet::new(false).is_empty());
        assert_eq!(ConciseSet::new(true).iter().count(), 0);
    }

    #[test]
    fn sparse_values_fold_into_fills() {
        // Each value is a zero gap followed by a single-bit literal.
        let values: Vec<u32> = (1..50).map(|i| i * 10_000).collect();
        let [concise, wah] = both(&values);
        assert!(!concise.is_wah() && wah.is_wah());
        assert!(concise.num_words() < wah.num_words());
        assert_eq!(concise.iter().collect::<Vec<_>>(), values);
        assert_eq!(wah.iter().collect::<Vec<_>>(), values);
    }

    #[test]
    fn dense_ranges_become_one_fills() {
        let values: Vec<u32> = (0..31 * 1000).collect();
        for set in both(&values) {
            assert_eq!(set.num_words(), 1);
            assert_eq!(set.size_bytes(), 4);
            assert_eq!(set.len(), values.len() as u64);
        }
    }

    #[test]
    fn remove_splits_fills() {
        let values: Vec<u32> = (0..31 * 100).collect();
        for mut set in both(&values) {
            assert!(set.remove(31 * 50 + 7));
            assert!(!set.remove(31 * 50 + 7));
            assert!(set.remove(0));
            assert!(set.remove(31 * 100 - 1));
            assert_eq!(set.len(), values.len() as u64 - 3);
            let expected: Vec<u32> = (1..31 * 100 - 1).filter(|&v| v != 31 * 50 + 7).collect();
            assert_eq!(set.iter().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn removing_everything_leaves_no_words() {
        for mut set in both(&[5, 100_000]) {
            assert!(set.remove(100_000));
            assert!(set.remove(5));
            assert!(set.is_empty());
            assert_eq!(set.num_words(), 0);
        }
    }

    #[test]
    fn and_or_mixed_runs() {
        let a: Vec<u32> = (0..5000).chain((20_000..20_100).map(|v| v * 3)).collect();
        let b: Vec<u32> = (0..3000).map(|v| v * 7).collect();
        let sa: std::collections::BTreeSet<u32> = a.iter().copied().collect();
        let sb: std::collections::BTreeSet<u32> = b.iter().copied().collect();
        for wah in [false, true] {
            let x = ConciseSet::from_sorted(&a, wah);
            let y = ConciseSet::from_sorted(&b, wah);
            let and: Vec<u32> = sa.intersection(&sb).copied().collect();
            let or: Vec<u32> = sa.union(&sb).copied().collect();
            assert_eq!(x.and(&y).iter().collect::<Vec<_>>(), and);
            assert_eq!(y.and(&x).len(), and.len() as u64);
            assert_eq!(x.or(&y).iter().collect::<Vec<_>>(), or);
            assert_eq!(y.or(&x).len(), or.len() as u64);
        }
    }

    #[test]
    fn results_stay_canonical() {
        let a: Vec<u32> = (0..3100).collect();
        let b: Vec<u32> = (0..3100).filter(|v| v % 2 == 0).collect();
        for wah in [false, true] {
            let x = ConciseSet::from_sorted(&a, wah);
            let y = ConciseSet::from_sorted(&b, wah);
            assert_eq!(x.and(&y), y);
            assert_eq!(x.or(&y), x);
        }
    }

    #[test]
    fn top_of_range() {
        let values = vec![u32::MAX - 40, u32::MAX - 1, u32::MAX];
        for set in both(&values) {
            assert_eq!(set.iter().collect::<Vec<_>>(), values);
            assert!(set.contains(u32::MAX));
        }
    }
}

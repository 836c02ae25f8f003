//! The operation contract every representation satisfies, and its adapters.
//!
//! An adapter is a thin, stateless translation from [`SetAdapter`] calls to one
//! representation's native API. Static encodings (Rank9, Elias–Fano) have no
//! in-place mutation; their adapters decode, edit and re-encode, which is
//! exactly the cost the harness is meant to expose.

use roaring::RoaringBitmap;

use crate::bitvec::BitVector;
use crate::concise::ConciseSet;
use crate::dense::DenseBitSet;
use crate::elias_fano::EliasFano;
use crate::hierarchical::HierarchicalSet;
use crate::hybrid::{HybridConfig, HybridSet};
use crate::partitioned_elias_fano::PartitionedEliasFano;
use crate::trial::Candidate;
use crate::workload::Workload;

/// Values per partition of the partitioned Elias–Fano candidate.
pub const PEF_BLOCK_SIZE: usize = 128;

/// Named tuning passed into every build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunableVariant {
    name: String,
    array_threshold: usize,
}

impl TunableVariant {
    /// Create a variant with an explicit name.
    pub fn new(name: impl Into<String>, array_threshold: usize) -> Self {
        Self {
            name: name.into(),
            array_threshold,
        }
    }

    /// Variant named after its array/bitmap switch point.
    pub fn threshold(array_threshold: usize) -> Self {
        Self::new(format!("threshold={array_threshold}"), array_threshold)
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container cardinality above which hybrid encodings switch to a bitmap.
    pub fn array_threshold(&self) -> usize {
        self.array_threshold
    }
}

/// Uniform capability contract over one set representation.
///
/// Implementations must keep `build(w)` equal to the elements of `w`, keep
/// `intersect`/`union` free of side effects on their operands, and treat
/// `delete` of an absent value as a no-op.
pub trait SetAdapter {
    /// The representation under test.
    type Set;

    /// Registered name; also the report column group.
    fn name(&self) -> &'static str;

    /// Construct a set holding exactly the workload's values.
    fn build(&self, workload: &Workload, variant: &TunableVariant) -> Self::Set;

    /// Return `a ∩ b`.
    fn intersect(&self, a: &Self::Set, b: &Self::Set) -> Self::Set;

    /// Return `a ∪ b`.
    fn union(&self, a: &Self::Set, b: &Self::Set) -> Self::Set;

    /// Remove `value` if present.
    fn delete(&self, set: &mut Self::Set, value: u32);

    /// Number of elements.
    fn cardinality(&self, set: &Self::Set) -> u64;

    /// The representation's own encoded size, in bits.
    fn estimated_footprint_bits(&self, set: &Self::Set) -> u64;

    /// All elements, for verification. Order is not significant.
    fn elements(&self, set: &Self::Set) -> Vec<u32>;
}

/// Receives each registered adapter with its concrete type.
///
/// Code that needs the typed operations (benchmarks, for instance) walks the
/// registry through [`visit_registry`] instead of keeping its own list.
pub trait AdapterVisitor {
    /// Called once per adapter, in registration order.
    fn visit<A: SetAdapter + 'static>(&mut self, adapter: A);
}

/// Hand every registered adapter to `visitor`, in column order.
pub fn visit_registry(visitor: &mut impl AdapterVisitor) {
    visitor.visit(DenseAdapter);
    visitor.visit(ConciseAdapter { wah: false });
    visitor.visit(ConciseAdapter { wah: true });
    visitor.visit(HierarchicalAdapter);
    visitor.visit(Rank9Adapter);
    visitor.visit(EliasFanoAdapter);
    visitor.visit(PartitionedEliasFanoAdapter {
        block_size: PEF_BLOCK_SIZE,
    });
    visitor.visit(HybridAdapter {
        run_containers: false,
    });
    visitor.visit(HybridAdapter {
        run_containers: true,
    });
    visitor.visit(RoaringAdapter);
}

/// The candidates measured by the experiment, in column order.
pub fn default_registry() -> Vec<Box<dyn Candidate>> {
    struct Collect(Vec<Box<dyn Candidate>>);

    impl AdapterVisitor for Collect {
        fn visit<A: SetAdapter + 'static>(&mut self, adapter: A) {
            self.0.push(Box::new(adapter));
        }
    }

    let mut registry = Collect(Vec::new());
    visit_registry(&mut registry);
    registry.0
}

/// Uncompressed bitset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseAdapter;

impl SetAdapter for DenseAdapter {
    type Set = DenseBitSet;

    fn name(&self) -> &'static str {
        "bitset"
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> DenseBitSet {
        DenseBitSet::from_values(workload.values(), workload.universe())
    }

    fn intersect(&self, a: &DenseBitSet, b: &DenseBitSet) -> DenseBitSet {
        a.and(b)
    }

    fn union(&self, a: &DenseBitSet, b: &DenseBitSet) -> DenseBitSet {
        a.or(b)
    }

    fn delete(&self, set: &mut DenseBitSet, value: u32) {
        set.remove(value);
    }

    fn cardinality(&self, set: &DenseBitSet) -> u64 {
        set.len() as u64
    }

    fn estimated_footprint_bits(&self, set: &DenseBitSet) -> u64 {
        set.serialized_size() as u64 * 8
    }

    fn elements(&self, set: &DenseBitSet) -> Vec<u32> {
        set.iter().collect()
    }
}

/// Word-aligned run-length bitmap; `wah` restricts Concise to plain WAH.
#[derive(Debug, Clone, Copy)]
pub struct ConciseAdapter {
    /// Disable folding single-bit literals into fills.
    pub wah: bool,
}

impl SetAdapter for ConciseAdapter {
    type Set = ConciseSet;

    fn name(&self) -> &'static str {
        if self.wah {
            "wah"
        } else {
            "concise"
        }
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> ConciseSet {
        ConciseSet::from_sorted(workload.values(), self.wah)
    }

    fn intersect(&self, a: &ConciseSet, b: &ConciseSet) -> ConciseSet {
        a.and(b)
    }

    fn union(&self, a: &ConciseSet, b: &ConciseSet) -> ConciseSet {
        a.or(b)
    }

    fn delete(&self, set: &mut ConciseSet, value: u32) {
        set.remove(value);
    }

    fn cardinality(&self, set: &ConciseSet) -> u64 {
        set.len()
    }

    fn estimated_footprint_bits(&self, set: &ConciseSet) -> u64 {
        set.size_bytes() as u64 * 8
    }

    fn elements(&self, set: &ConciseSet) -> Vec<u32> {
        set.iter().collect()
    }
}

/// Bitmap with summary layers (`hibitset`).
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalAdapter;

impl SetAdapter for HierarchicalAdapter {
    type Set = HierarchicalSet;

    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> HierarchicalSet {
        HierarchicalSet::from_values(workload.values())
    }

    fn intersect(&self, a: &HierarchicalSet, b: &HierarchicalSet) -> HierarchicalSet {
        a.and(b)
    }

    fn union(&self, a: &HierarchicalSet, b: &HierarchicalSet) -> HierarchicalSet {
        a.or(b)
    }

    fn delete(&self, set: &mut HierarchicalSet, value: u32) {
        set.remove(value);
    }

    fn cardinality(&self, set: &HierarchicalSet) -> u64 {
        set.len()
    }

    fn estimated_footprint_bits(&self, set: &HierarchicalSet) -> u64 {
        set.size_bits()
    }

    fn elements(&self, set: &HierarchicalSet) -> Vec<u32> {
        set.iter().collect()
    }
}

/// Rank9 succinct bit vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rank9Adapter;

impl SetAdapter for Rank9Adapter {
    type Set = BitVector;

    fn name(&self) -> &'static str {
        "rank9"
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> BitVector {
        BitVector::from_positions(workload.values(), workload.universe() as usize)
    }

    fn intersect(&self, a: &BitVector, b: &BitVector) -> BitVector {
        let words: Vec<u64> = a
            .to_words()
            .iter()
            .zip(b.to_words())
            .map(|(x, y)| x & y)
            .collect();
        BitVector::new(&words, a.len().min(b.len()))
    }

    fn union(&self, a: &BitVector, b: &BitVector) -> BitVector {
        let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
        let mut words = long.to_words();
        for (w, s) in words.iter_mut().zip(short.to_words()) {
            *w |= s;
        }
        BitVector::new(&words, long.len())
    }

    fn delete(&self, set: &mut BitVector, value: u32) {
        let pos = value as usize;
        if !set.get(pos) {
            return;
        }
        let mut words = set.to_words();
        words[pos / 64] &= !(1u64 << (pos % 64));
        *set = BitVector::new(&words, set.len());
    }

    fn cardinality(&self, set: &BitVector) -> u64 {
        set.count_ones() as u64
    }

    fn estimated_footprint_bits(&self, set: &BitVector) -> u64 {
        set.serialized_size() as u64 * 8
    }

    fn elements(&self, set: &BitVector) -> Vec<u32> {
        set.iter_ones().map(|p| p as u32).collect()
    }
}

/// Plain Elias–Fano over the whole universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct EliasFanoAdapter;

impl SetAdapter for EliasFanoAdapter {
    type Set = EliasFano;

    fn name(&self) -> &'static str {
        "elias_fano"
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> EliasFano {
        EliasFano::new(workload.values(), workload.universe())
    }

    fn intersect(&self, a: &EliasFano, b: &EliasFano) -> EliasFano {
        let values = intersect_sorted(a.iter(), b.iter());
        EliasFano::new(&values, a.universe_size().min(b.universe_size()))
    }

    fn union(&self, a: &EliasFano, b: &EliasFano) -> EliasFano {
        let values = union_sorted(a.iter(), b.iter());
        EliasFano::new(&values, a.universe_size().max(b.universe_size()))
    }

    fn delete(&self, set: &mut EliasFano, value: u32) {
        let mut values: Vec<u32> = set.iter().collect();
        if let Ok(pos) = values.binary_search(&value) {
            values.remove(pos);
            *set = EliasFano::new(&values, set.universe_size());
        }
    }

    fn cardinality(&self, set: &EliasFano) -> u64 {
        set.len() as u64
    }

    fn estimated_footprint_bits(&self, set: &EliasFano) -> u64 {
        set.serialized_size() as u64 * 8
    }

    fn elements(&self, set: &EliasFano) -> Vec<u32> {
        set.iter().collect()
    }
}

/// Elias–Fano with per-partition local universes.
#[derive(Debug, Clone, Copy)]
pub struct PartitionedEliasFanoAdapter {
    /// Values per partition.
    pub block_size: usize,
}

impl SetAdapter for PartitionedEliasFanoAdapter {
    type Set = PartitionedEliasFano;

    fn name(&self) -> &'static str {
        "pef"
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> PartitionedEliasFano {
        PartitionedEliasFano::new(workload.values(), workload.universe(), self.block_size)
    }

    fn intersect(
        &self,
        a: &PartitionedEliasFano,
        b: &PartitionedEliasFano,
    ) -> PartitionedEliasFano {
        let values = intersect_sorted(a.iter(), b.iter());
        PartitionedEliasFano::new(
            &values,
            a.universe_size().min(b.universe_size()),
            self.block_size,
        )
    }

    fn union(
        &self,
        a: &PartitionedEliasFano,
        b: &PartitionedEliasFano,
    ) -> PartitionedEliasFano {
        let values = union_sorted(a.iter(), b.iter());
        PartitionedEliasFano::new(
            &values,
            a.universe_size().max(b.universe_size()),
            self.block_size,
        )
    }

    fn delete(&self, set: &mut PartitionedEliasFano, value: u32) {
        let mut values: Vec<u32> = set.iter().collect();
        if let Ok(pos) = values.binary_search(&value) {
            values.remove(pos);
            *set = PartitionedEliasFano::new(&values, set.universe_size(), self.block_size);
        }
    }

    fn cardinality(&self, set: &PartitionedEliasFano) -> u64 {
        set.len() as u64
    }

    fn estimated_footprint_bits(&self, set: &PartitionedEliasFano) -> u64 {
        set.serialized_size() as u64 * 8
    }

    fn elements(&self, set: &PartitionedEliasFano) -> Vec<u32> {
        set.iter().collect()
    }
}

/// Array/bitmap hybrid whose switch point comes from the variant.
#[derive(Debug, Clone, Copy)]
pub struct HybridAdapter {
    /// Allow run-length containers.
    pub run_containers: bool,
}

impl SetAdapter for HybridAdapter {
    type Set = HybridSet;

    fn name(&self) -> &'static str {
        if self.run_containers {
            "hybrid_rle"
        } else {
            "hybrid"
        }
    }

    fn build(&self, workload: &Workload, variant: &TunableVariant) -> HybridSet {
        let config = HybridConfig {
            array_threshold: variant.array_threshold(),
            run_containers: self.run_containers,
        };
        HybridSet::from_sorted(workload.values(), config)
    }

    fn intersect(&self, a: &HybridSet, b: &HybridSet) -> HybridSet {
        a.and(b)
    }

    fn union(&self, a: &HybridSet, b: &HybridSet) -> HybridSet {
        a.or(b)
    }

    fn delete(&self, set: &mut HybridSet, value: u32) {
        set.remove(value);
    }

    fn cardinality(&self, set: &HybridSet) -> u64 {
        set.len()
    }

    fn estimated_footprint_bits(&self, set: &HybridSet) -> u64 {
        set.size_bytes() as u64 * 8
    }

    fn elements(&self, set: &HybridSet) -> Vec<u32> {
        set.iter().collect()
    }
}

/// The `roaring` crate. It has a fixed internal threshold and ignores the variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoaringAdapter;

impl SetAdapter for RoaringAdapter {
    type Set = RoaringBitmap;

    fn name(&self) -> &'static str {
        "roaring"
    }

    fn build(&self, workload: &Workload, _variant: &TunableVariant) -> RoaringBitmap {
        workload.values().iter().copied().collect()
    }

    fn intersect(&self, a: &RoaringBitmap, b: &RoaringBitmap) -> RoaringBitmap {
        a & b
    }

    fn union(&self, a: &RoaringBitmap, b: &RoaringBitmap) -> RoaringBitmap {
        a | b
    }

    fn delete(&self, set: &mut RoaringBitmap, value: u32) {
        set.remove(value);
    }

    fn cardinality(&self, set: &RoaringBitmap) -> u64 {
        set.len()
    }

    fn estimated_footprint_bits(&self, set: &RoaringBitmap) -> u64 {
        set.serialized_size() as u64 * 8
    }

    fn elements(&self, set: &RoaringBitmap) -> Vec<u32> {
        set.iter().collect()
    }
}

/// Merge-intersect two ascending streams.
fn intersect_sorted(a: impl Iterator<Item = u32>, b: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut out = Vec::new();
    let mut a = a.peekable();
    let mut b = b.peekable();
    while let (Some(&x), Some(&y)) = (a.peek(), b.peek()) {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => {
                a.next();
            }
            std::cmp::Ordering::Greater => {
                b.next();
            }
            std::cmp::Ordering::Equal => {
                out.push(x);
                a.next();
                b.next();
            }
        }
    }
    out
}

/// Merge-union two ascending streams.
fn union_sorted(a: impl Iterator<Item = u32>, b: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut out = Vec::new();
    let mut a = a.peekable();
    let mut b = b.peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (Some(x), Some(y)) => {
                out.push(x.min(y));
                if x <= y {
                    a.next();
                }
                if y <= x {
                    b.next();
                }
            }
            (Some(_), None) => {
                out.extend(a);
                break;
            }
            (None, Some(_)) => {
                out.extend(b);
                break;
            }
            (None, None) => break,
        }
    }
    out
}

//! # setbench
//!
//! *A comparative micro-benchmark harness for integer-set representations.*
//!
//! ## Intuition First
//!
//! A set of integers drawn from `[0, N)` can be stored many ways. A plain bitset
//! spends one bit per possible value and answers everything with word-wise
//! arithmetic. A sorted, compressed list spends a few bits per *present* value
//! but has to decode before it can combine. Hybrid encodings cut the universe
//! into chunks and pick a per-chunk container. Word-aligned run-length codes
//! collapse long empty or full stretches into single fill words, and
//! hierarchical bitmaps add summary layers that let combination skip empty
//! regions.
//!
//! Which one wins depends on how full the set is and how its values cluster.
//! This crate measures that: it generates reproducible workloads at controlled
//! densities, drives each representation through the same operations, checks
//! every result against an independent reference, and prints the averages.
//!
//! ## The Problem
//!
//! Comparative benchmarks go wrong in quiet ways:
//! - **Unequal work**: each representation gets a slightly different loop.
//!   Here every candidate implements one [`adapter::SetAdapter`] contract and
//!   runs through the same [`trial::TrialRunner`] sequence.
//! - **Fast but wrong**: a broken union can be very fast. In verified mode every
//!   intersection, union and delete is compared with a [`oracle::CorrectnessOracle`]
//!   and a mismatch aborts the run.
//! - **Dead code**: a result nobody reads may be optimized away. Every result is
//!   folded into a runner-owned [`trial::Sink`] whose value is printed.
//!
//! ## Candidates
//!
//! | name | structure |
//! |---|---|
//! | `bitset` | [`DenseBitSet`]: raw words, cached popcount |
//! | `concise` | [`ConciseSet`]: 31-bit literals and fills, mixed words folded |
//! | `wah` | [`ConciseSet`] in WAH mode: literals and fills only |
//! | `hierarchical` | [`HierarchicalSet`]: `hibitset` summary layers |
//! | `rank9` | [`BitVector`]: Rank9 interleaved succinct bit vector |
//! | `elias_fano` | [`EliasFano`]: $n \lceil \log_2(U/n) \rceil + 2n$ bits |
//! | `pef` | [`PartitionedEliasFano`]: Elias–Fano per 128-value partition |
//! | `hybrid` | [`HybridSet`]: array/bitmap chunks, threshold from the variant |
//! | `hybrid_rle` | [`HybridSet`] with run containers |
//! | `roaring` | `roaring::RoaringBitmap` |
//!
//! ## Measuring
//!
//! - **Time**: build (per element), intersect, union, delete, averaged over repetitions.
//! - **Space**: each structure's own encoded size, in bits per integer. With the
//!   [`probe::TrackingAllocator`] installed as the global allocator, the heap
//!   bytes actually allocated by each build are reported too.
//!
//! ## What Could Go Wrong
//!
//! 1. **Static structures pay for mutation**: `rank9`, `elias_fano` and `pef`
//!    rebuild on delete. That is the point of measuring them, not a defect.
//! 2. **Universe ceiling**: the hierarchical bitmap indexes at most
//!    [`hierarchical::MAX_UNIVERSE`] values, so larger `N` is rejected up front.
//! 3. **Sparse cells at small N**: a density with `round(N * d) == 0` has no
//!    elements to delete and is rejected during configuration.
//!
//! ## References
//!
//! - Wu, K., et al. (2006). "Optimizing bitmap indices with efficient compression."
//! - Colantonio, A., & Di Pietro, R. (2010). "Concise: Compressed 'n' Composable Integer Set."
//! - Elias, P. (1974). "Efficient storage and retrieval by content and address of static files."
//! - Vigna, S. (2008). "Broadword implementation of rank/select queries."
//! - Ottaviano, G., & Venturini, R. (2014). "Partitioned Elias-Fano indexes."
//! - Lemire, D., et al. (2016). "Better bitmap performance with Roaring bitmaps."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod bitvec;
pub mod concise;
pub mod config;
pub mod dense;
pub mod driver;
pub mod elias_fano;
pub mod error;
pub mod hierarchical;
pub mod hybrid;
pub mod metrics;
pub mod oracle;
pub mod partitioned_elias_fano;
pub mod probe;
pub mod report;
pub mod trial;
pub mod workload;

pub use adapter::{default_registry, SetAdapter, TunableVariant};
pub use bitvec::BitVector;
pub use concise::ConciseSet;
pub use config::ExperimentConfig;
pub use dense::DenseBitSet;
pub use driver::ExperimentDriver;
pub use elias_fano::EliasFano;
pub use error::{Error, Result};
pub use hierarchical::HierarchicalSet;
pub use hybrid::{HybridConfig, HybridSet};
pub use metrics::MetricsAggregator;
pub use oracle::CorrectnessOracle;
pub use partitioned_elias_fano::PartitionedEliasFano;
pub use probe::MemoryProbe;
pub use trial::{Candidate, Operation, TrialRunner, VerificationMode};
pub use workload::{Distribution, Workload, WorkloadGenerator};

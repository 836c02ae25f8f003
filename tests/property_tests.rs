use std::collections::BTreeSet;

use proptest::prelude::*;
use setbench::adapter::{
    ConciseAdapter, DenseAdapter, EliasFanoAdapter, HierarchicalAdapter, HybridAdapter,
    PartitionedEliasFanoAdapter, Rank9Adapter, RoaringAdapter, SetAdapter, TunableVariant,
};
use setbench::bitvec::BitVector;
use setbench::elias_fano::EliasFano;
use setbench::partitioned_elias_fano::PartitionedEliasFano;
use setbench::workload::Workload;

proptest! {
    #[test]
    fn test_bitvector_rank_property(
        bits in prop::collection::vec(any::<u64>(), 1..100),
        len_mult in 0..64usize,
    ) {
        let len = (bits.len() * 64).saturating_sub(len_mult);
        let bv = BitVector::new(&bits, len);

        // Check total rank
        let mut expected_total = 0;
        for i in 0..len {
            let word_idx = i / 64;
            let bit_idx = i % 64;
            if (bits[word_idx] & (1 << bit_idx)) != 0 {
                expected_total += 1;
            }
        }

        prop_assert_eq!(bv.rank1(len), expected_total);
        prop_assert_eq!(bv.count_ones(), expected_total);

        // Check individual ranks at random points
        for i in (0..len).step_by(13) {
            let mut expected_rank = 0;
            for j in 0..i {
                let word_idx = j / 64;
                let bit_idx = j % 64;
                if (bits[word_idx] & (1 << bit_idx)) != 0 {
                    expected_rank += 1;
                }
            }
            prop_assert_eq!(bv.rank1(i), expected_rank);
            prop_assert_eq!(bv.rank0(i), i - expected_rank);
        }

        // Check select1 for every set bit
        let mut count = 0;
        for i in 0..len {
            let word_idx = i / 64;
            let bit_idx = i % 64;
            if (bits[word_idx] & (1 << bit_idx)) != 0 {
                prop_assert_eq!(bv.select1(count), Some(i));
                count += 1;
            }
        }
        prop_assert_eq!(bv.select1(count), None);

        // Check select0 for every unset bit
        let mut count0 = 0;
        for i in 0..len {
            let word_idx = i / 64;
            let bit_idx = i % 64;
            if (bits[word_idx] & (1 << bit_idx)) == 0 {
                prop_assert_eq!(bv.select0(count0), Some(i));
                count0 += 1;
            }
        }
        prop_assert_eq!(bv.select0(count0), None);
    }

    #[test]
    fn test_bitvector_bytes_property(
        positions in prop::collection::btree_set(0..5000u32, 0..200),
    ) {
        let positions: Vec<u32> = positions.into_iter().collect();
        let bv = BitVector::from_positions(&positions, 5000);
        let bytes = bv.to_bytes();
        prop_assert_eq!(bytes.len(), bv.serialized_size());
        let back = BitVector::from_bytes(&bytes).unwrap();
        let ones: Vec<u32> = back.iter_ones().map(|p| p as u32).collect();
        prop_assert_eq!(ones, positions);
    }
}

proptest! {
    #[test]
    fn test_elias_fano_property(
        mut values in prop::collection::vec(0..10000u32, 1..100),
    ) {
        values.sort();
        values.dedup();
        if values.is_empty() { return Ok(()); }

        let universe_size = values.last().copied().unwrap() + 100;
        let ef = EliasFano::new(&values, universe_size);

        prop_assert_eq!(ef.len(), values.len());

        for (i, &expected) in values.iter().enumerate() {
            prop_assert_eq!(ef.get(i).unwrap(), expected);
        }

        let back = EliasFano::from_bytes(&ef.to_bytes()).unwrap();
        prop_assert_eq!(back.iter().collect::<Vec<_>>(), values);
    }

    #[test]
    fn test_partitioned_elias_fano_property(
        values in prop::collection::btree_set(0..100_000u32, 0..400),
        block_size in 1..200usize,
    ) {
        let values: Vec<u32> = values.into_iter().collect();
        let pef = PartitionedEliasFano::new(&values, 100_000, block_size);
        prop_assert_eq!(pef.len(), values.len());
        for (i, &expected) in values.iter().enumerate() {
            prop_assert_eq!(pef.get(i).unwrap(), expected);
        }
        let bytes = pef.to_bytes();
        prop_assert_eq!(bytes.len(), pef.serialized_size());
        let back = PartitionedEliasFano::from_bytes(&bytes).unwrap();
        prop_assert_eq!(back.iter().collect::<Vec<_>>(), values);
    }
}

/// Checks one adapter against `BTreeSet` semantics.
fn check_adapter<A: SetAdapter>(
    adapter: &A,
    a: &BTreeSet<u32>,
    b: &BTreeSet<u32>,
    universe: u32,
    threshold: usize,
    delete: u32,
) -> Result<(), TestCaseError> {
    let variant = TunableVariant::threshold(threshold);
    let wa = Workload::new(a.iter().copied().collect(), universe).unwrap();
    let wb = Workload::new(b.iter().copied().collect(), universe).unwrap();
    let sa = adapter.build(&wa, &variant);
    let mut sb = adapter.build(&wb, &variant);

    prop_assert_eq!(adapter.cardinality(&sa), a.len() as u64);
    prop_assert_eq!(adapter.cardinality(&sb), b.len() as u64);

    let sorted = |mut v: Vec<u32>| {
        v.sort_unstable();
        v
    };
    let inter = adapter.intersect(&sa, &sb);
    prop_assert_eq!(
        sorted(adapter.elements(&inter)),
        a.intersection(b).copied().collect::<Vec<_>>()
    );
    prop_assert_eq!(adapter.cardinality(&inter), a.intersection(b).count() as u64);

    let uni = adapter.union(&sa, &sb);
    prop_assert_eq!(
        sorted(adapter.elements(&uni)),
        a.union(b).copied().collect::<Vec<_>>()
    );
    prop_assert_eq!(adapter.cardinality(&uni), a.union(b).count() as u64);

    let before = adapter.cardinality(&sb);
    adapter.delete(&mut sb, delete);
    let expected = if b.contains(&delete) { before - 1 } else { before };
    prop_assert_eq!(adapter.cardinality(&sb), expected);
    prop_assert!(!adapter.elements(&sb).contains(&delete));
    Ok(())
}

fn sets() -> impl Strategy<Value = (u32, BTreeSet<u32>, BTreeSet<u32>, u32)> {
    (1000u32..200_000).prop_flat_map(|universe| {
        (
            Just(universe),
            prop::collection::btree_set(0..universe, 0..300),
            prop::collection::btree_set(0..universe, 0..300),
            0..universe,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn adapters_match_btreeset(
        (universe, a, b, delete) in sets(),
        threshold in prop::sample::select(vec![1usize, 4, 64, 1024, 4096]),
    ) {
        let t = threshold;
        check_adapter(&DenseAdapter, &a, &b, universe, t, delete)?;
        check_adapter(&ConciseAdapter { wah: false }, &a, &b, universe, t, delete)?;
        check_adapter(&ConciseAdapter { wah: true }, &a, &b, universe, t, delete)?;
        check_adapter(&HierarchicalAdapter, &a, &b, universe, t, delete)?;
        check_adapter(&Rank9Adapter, &a, &b, universe, t, delete)?;
        check_adapter(&EliasFanoAdapter, &a, &b, universe, t, delete)?;
        let pef = PartitionedEliasFanoAdapter { block_size: 16 };
        check_adapter(&pef, &a, &b, universe, t, delete)?;
        let hybrid = HybridAdapter { run_containers: false };
        check_adapter(&hybrid, &a, &b, universe, t, delete)?;
        let hybrid_rle = HybridAdapter { run_containers: true };
        check_adapter(&hybrid_rle, &a, &b, universe, t, delete)?;
        check_adapter(&RoaringAdapter, &a, &b, universe, t, delete)?;
    }

    #[test]
    fn dense_ranges_match_btreeset(
        start in 0u32..70_000,
        len in 0u32..5_000,
        gap in 1u32..4,
        delete in 0u32..80_000,
    ) {
        // Runs and full chunks exercise bitmap and run containers.
        let universe = 80_000;
        let a: BTreeSet<u32> = (start..(start + len).min(universe)).collect();
        let b: BTreeSet<u32> = (0..universe).step_by(gap as usize).collect();
        for t in [1usize, 4096] {
            let hybrid = HybridAdapter { run_containers: false };
            check_adapter(&hybrid, &a, &b, universe, t, delete)?;
            let hybrid_rle = HybridAdapter { run_containers: true };
            check_adapter(&hybrid_rle, &a, &b, universe, t, delete)?;
        }
        // Long runs become one-fills.
        check_adapter(&ConciseAdapter { wah: false }, &a, &b, universe, 1, delete)?;
        check_adapter(&ConciseAdapter { wah: true }, &a, &b, universe, 1, delete)?;
        check_adapter(&HierarchicalAdapter, &a, &b, universe, 1, delete)?;
        check_adapter(&Rank9Adapter, &a, &b, universe, 1, delete)?;
        check_adapter(&EliasFanoAdapter, &a, &b, universe, 1, delete)?;
    }
}

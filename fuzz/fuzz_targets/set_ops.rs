#![no_main]
use libfuzzer_sys::fuzz_target;
use setbench::adapter::{default_registry, TunableVariant};
use setbench::trial::{Candidate, Cell, Sink, TrialInput};
use setbench::{CorrectnessOracle, Distribution, Workload};

fuzz_target!(|data: (Vec<u32>, Vec<u32>, u32, u16)| {
    let (a, b, universe_raw, threshold) = data;
    let universe = universe_raw % (1 << 20) + 1;

    let v1 = Workload::new(a.into_iter().map(|v| v % universe).collect(), universe).unwrap();
    let v2 = Workload::new(b.into_iter().map(|v| v % universe).collect(), universe).unwrap();
    let Some(&target) = v1.values().first() else {
        return;
    };

    let variant = TunableVariant::threshold(threshold as usize);
    let input = TrialInput {
        v1: &v1,
        v2: &v2,
        target,
        cell: Cell {
            distribution: Distribution::Uniform,
            variant: &variant,
            density: v1.len() as f64 / universe as f64,
        },
    };
    let oracle = CorrectnessOracle::new(&v1, &v2, target);
    let mut sink = Sink::default();

    for candidate in default_registry() {
        if let Err(e) = candidate.measure(&input, Some(&oracle), None, &mut sink) {
            panic!("{e}");
        }
    }
});

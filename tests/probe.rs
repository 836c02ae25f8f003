//! Probe behavior with the tracking allocator installed.

use setbench::adapter::{default_registry, TunableVariant};
use setbench::probe::{MemoryProbe, TrackingAllocator};
use setbench::trial::{Cell, TrialRunner, VerificationMode};
use setbench::{Distribution, WorkloadGenerator};

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

#[test]
fn probe_initializes_and_counts() {
    let probe = MemoryProbe::init().unwrap();
    let buf = vec![1u8; 1 << 20];
    assert!(probe.live_bytes() >= buf.len());
}

#[test]
fn probed_cell_reports_true_footprint() {
    let probe = MemoryProbe::init().unwrap();
    let registry = default_registry();
    let variant = TunableVariant::threshold(4096);
    let mut runner = TrialRunner::new(&registry, 2, VerificationMode::Verified, Some(&probe));
    let mut generator = WorkloadGenerator::new(20_000, 5, 1.0).unwrap();
    let cell = Cell {
        distribution: Distribution::Uniform,
        variant: &variant,
        density: 0.1,
    };
    let metrics = runner.run_cell(&mut generator, cell).unwrap();
    for s in metrics.summarize(20_000, 0.1) {
        let bits = s.true_bits_per_int.unwrap();
        assert!(bits.is_finite() && bits > 0.0, "{}: {bits}", s.name);
    }
}

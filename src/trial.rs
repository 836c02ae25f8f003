//! One cell of the experiment matrix, run across its repetitions.
//!
//! Per repetition the runner draws two workloads, picks a delete target from
//! the first, and puts every registered representation through the same
//! sequence: build both, intersect, union, delete. Each timed region contains
//! only the operation itself; verification, footprint accounting and probe
//! reads happen between regions.

use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::adapter::{SetAdapter, TunableVariant};
use crate::error::{Error, Result};
use crate::metrics::MetricsAggregator;
use crate::oracle::CorrectnessOracle;
use crate::probe::MemoryProbe;
use crate::workload::{Distribution, Workload, WorkloadGenerator};

/// Operations every representation is timed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Construct a set from a workload.
    Build,
    /// Non-mutating intersection of two sets.
    Intersect,
    /// Non-mutating union of two sets.
    Union,
    /// Remove one value in place.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Build => "build",
            Operation::Intersect => "intersect",
            Operation::Union => "union",
            Operation::Delete => "delete",
        })
    }
}

/// Whether results are checked against the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Every result is compared with the oracle; a mismatch aborts the run.
    Verified,
    /// No oracle is built. Used for warm-up.
    Unverified,
}

/// Accumulator that keeps operation results observable to the optimizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sink(u64);

impl Sink {
    /// Fold a result into the sink.
    #[inline]
    pub fn consume(&mut self, value: u64) {
        self.0 = black_box(self.0.wrapping_add(value));
    }

    /// Current accumulated value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Costs measured for one representation in one repetition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    /// Both builds together.
    pub build: Duration,
    /// Intersection time.
    pub intersect: Duration,
    /// Union time.
    pub union: Duration,
    /// Delete time.
    pub delete: Duration,
    /// Values inserted across both builds.
    pub elements_built: u64,
    /// Analytic footprint of both built sets, in bits.
    pub estimated_bits: u64,
    /// Probed footprint of both built sets, in bits.
    pub true_bits: Option<u64>,
}

/// Coordinates of a matrix cell.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    /// Value distribution of both workloads.
    pub distribution: Distribution,
    /// Tuning passed into every build.
    pub variant: &'a TunableVariant,
    /// Workload density.
    pub density: f64,
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "distribution={} variant={} density={}",
            self.distribution,
            self.variant.name(),
            self.density
        )
    }
}

/// Inputs shared by every representation within one repetition.
#[derive(Debug, Clone, Copy)]
pub struct TrialInput<'a> {
    /// First workload.
    pub v1: &'a Workload,
    /// Second workload; its set receives the delete.
    pub v2: &'a Workload,
    /// Value deleted from the second set, drawn from `v1`.
    pub target: u32,
    /// Cell the repetition belongs to.
    pub cell: Cell<'a>,
}

/// Object-safe view of a [`SetAdapter`], so the registry can mix set types.
pub trait Candidate {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// Run one repetition and return its costs.
    ///
    /// With an oracle, every result is verified and the first mismatch is
    /// returned as [`Error::CorrectnessDefect`].
    fn measure(
        &self,
        input: &TrialInput<'_>,
        oracle: Option<&CorrectnessOracle>,
        probe: Option<&MemoryProbe>,
        sink: &mut Sink,
    ) -> Result<Measurement>;
}

impl<A: SetAdapter> Candidate for A {
    fn name(&self) -> &'static str {
        SetAdapter::name(self)
    }

    fn measure(
        &self,
        input: &TrialInput<'_>,
        oracle: Option<&CorrectnessOracle>,
        probe: Option<&MemoryProbe>,
        sink: &mut Sink,
    ) -> Result<Measurement> {
        let variant = input.cell.variant;
        let defect = |operation: Operation, detail: String| Error::CorrectnessDefect {
            representation: SetAdapter::name(self),
            operation,
            cell: input.cell.to_string(),
            detail,
        };
        let verify = |operation: Operation, actual: Vec<u32>| -> Result<()> {
            match oracle {
                Some(o) => o.check(operation, actual).map_err(|d| defect(operation, d)),
                None => Ok(()),
            }
        };

        let live0 = probe.map(MemoryProbe::live_bytes);
        let start = Instant::now();
        let s1 = black_box(self.build(black_box(input.v1), variant));
        let mut build = start.elapsed();

        let live1 = probe.map(MemoryProbe::live_bytes);
        let start = Instant::now();
        let mut s2 = black_box(self.build(black_box(input.v2), variant));
        build += start.elapsed();
        let live2 = probe.map(MemoryProbe::live_bytes);

        let true_bits = match (live0, live1, live2) {
            (Some(b0), Some(b1), Some(b2)) => Some(
                MemoryProbe::footprint_bits::<A::Set>(b0, b1)
                    + MemoryProbe::footprint_bits::<A::Set>(b1, b2),
            ),
            _ => None,
        };

        let (c1, c2) = (self.cardinality(&s1), self.cardinality(&s2));
        sink.consume(c1.wrapping_add(c2));
        if oracle.is_some() {
            for (card, workload) in [(c1, input.v1), (c2, input.v2)] {
                if card != workload.len() as u64 {
                    return Err(defect(
                        Operation::Build,
                        format!("expected cardinality {}, got {card}", workload.len()),
                    ));
                }
            }
        }
        let estimated_bits =
            self.estimated_footprint_bits(&s1) + self.estimated_footprint_bits(&s2);

        let start = Instant::now();
        let inter = black_box(self.intersect(black_box(&s1), black_box(&s2)));
        let intersect = start.elapsed();
        sink.consume(self.cardinality(&inter));
        if oracle.is_some() {
            verify(Operation::Intersect, self.elements(&inter))?;
        }
        drop(inter);

        let start = Instant::now();
        let uni = black_box(self.union(black_box(&s1), black_box(&s2)));
        let union = start.elapsed();
        sink.consume(self.cardinality(&uni));
        if oracle.is_some() {
            verify(Operation::Union, self.elements(&uni))?;
        }
        drop(uni);

        let start = Instant::now();
        self.delete(black_box(&mut s2), black_box(input.target));
        let delete = start.elapsed();
        sink.consume(self.cardinality(&s2));
        if oracle.is_some() {
            verify(Operation::Delete, self.elements(&s2))?;
        }

        Ok(Measurement {
            build,
            intersect,
            union,
            delete,
            elements_built: (input.v1.len() + input.v2.len()) as u64,
            estimated_bits,
            true_bits,
        })
    }
}

/// Runs matrix cells over a fixed candidate list.
pub struct TrialRunner<'a> {
    candidates: &'a [Box<dyn Candidate>],
    repetitions: usize,
    mode: VerificationMode,
    probe: Option<&'a MemoryProbe>,
    sink: Sink,
}

impl<'a> TrialRunner<'a> {
    /// Create a runner. Candidates are measured in slice order.
    pub fn new(
        candidates: &'a [Box<dyn Candidate>],
        repetitions: usize,
        mode: VerificationMode,
        probe: Option<&'a MemoryProbe>,
    ) -> Self {
        Self {
            candidates,
            repetitions,
            mode,
            probe,
            sink: Sink::default(),
        }
    }

    /// Results folded in so far.
    pub fn sink(&self) -> Sink {
        self.sink
    }

    /// Run every repetition of `cell` and return the per-candidate totals.
    pub fn run_cell(
        &mut self,
        generator: &mut WorkloadGenerator,
        cell: Cell<'_>,
    ) -> Result<MetricsAggregator> {
        let mut metrics = MetricsAggregator::new(self.candidates.iter().map(|c| c.name()));
        for rep in 0..self.repetitions {
            let v1 = generator.generate(cell.density, cell.distribution)?;
            let v2 = generator.generate(cell.density, cell.distribution)?;
            let target = generator.pick(&v1).ok_or(Error::InvalidDensity {
                density: cell.density,
                universe: generator.universe(),
            })?;
            let oracle = match self.mode {
                VerificationMode::Verified => Some(CorrectnessOracle::new(&v1, &v2, target)),
                VerificationMode::Unverified => None,
            };
            let input = TrialInput {
                v1: &v1,
                v2: &v2,
                target,
                cell,
            };
            for (idx, candidate) in self.candidates.iter().enumerate() {
                let m = candidate.measure(&input, oracle.as_ref(), self.probe, &mut self.sink)?;
                metrics.record(idx, &m);
            }
            if rep == 0 {
                debug!(%cell, v1 = v1.len(), v2 = v2.len(), "first repetition done");
            }
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::default_registry;

    #[test]
    fn sink_accumulates() {
        let mut sink = Sink::default();
        sink.consume(3);
        sink.consume(u64::MAX);
        assert_eq!(sink.value(), 2);
    }

    #[test]
    fn verified_cell_runs_all_candidates() {
        let registry = default_registry();
        let variant = TunableVariant::new("t64", 64);
        let mut runner = TrialRunner::new(&registry, 3, VerificationMode::Verified, None);
        let mut generator = WorkloadGenerator::new(5000, 11, 1.0).unwrap();
        let cell = Cell {
            distribution: Distribution::Uniform,
            variant: &variant,
            density: 0.1,
        };
        let metrics = runner.run_cell(&mut generator, cell).unwrap();
        assert_eq!(metrics.totals().len(), registry.len());
        for totals in metrics.totals() {
            assert_eq!(totals.repetitions, 3);
            assert_eq!(totals.elements_built, 3 * 2 * 500);
            assert!(totals.true_bits.is_none());
        }
        assert_ne!(runner.sink().value(), 0);
    }

    #[test]
    fn cell_display_names_coordinates() {
        let variant = TunableVariant::new("threshold=1024", 1024);
        let cell = Cell {
            distribution: Distribution::Zipfian,
            variant: &variant,
            density: 0.01,
        };
        assert_eq!(
            cell.to_string(),
            "distribution=zipfian variant=threshold=1024 density=0.01"
        );
    }
}

//! Top-level sequencing of the experiment matrix.
//!
//! For each distribution (uniform, then Zipfian):
//! 1. an unverified warm-up pass over one trivial variant, not reported;
//! 2. a verified pass over every configured threshold variant, one table each.
//!
//! The warm-up pass is announced by `# running a dry run` and the verified
//! pass by `# start counting benchmark performances`. Each pass ends with the
//! `# ignore = <sink>` line. One seeded generator
//! feeds the whole run, so a configuration reproduces the same workloads.

use std::io::Write;
use std::time::Instant;

use tracing::{debug, info};

use crate::adapter::{default_registry, TunableVariant};
use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::probe::MemoryProbe;
use crate::report::{self, ReportRow, VariantReport};
use crate::trial::{Candidate, Cell, TrialRunner, VerificationMode};
use crate::workload::{Distribution, WorkloadGenerator};

const DRY_RUN: &str = "running a dry run";
const START_COUNTING: &str = "start counting benchmark performances";

/// Owns the configuration, the candidate registry and the optional probe.
pub struct ExperimentDriver {
    config: ExperimentConfig,
    registry: Vec<Box<dyn Candidate>>,
    probe: Option<MemoryProbe>,
}

impl ExperimentDriver {
    /// Driver over the default registry. Fails if the configuration is invalid.
    pub fn new(config: ExperimentConfig, probe: Option<MemoryProbe>) -> Result<Self> {
        Self::with_registry(config, default_registry(), probe)
    }

    /// Driver over a custom registry, measured in the given order.
    pub fn with_registry(
        config: ExperimentConfig,
        registry: Vec<Box<dyn Candidate>>,
        probe: Option<MemoryProbe>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            probe,
        })
    }

    /// Run every phase, writing the report to `out`.
    ///
    /// Returns the verified sections in output order. A correctness defect
    /// aborts the run with the sections already written left in `out`.
    pub fn run(&self, out: &mut impl Write) -> Result<Vec<VariantReport>> {
        let probed = self.probe.is_some();
        let densities = self.config.densities();
        let mut generator = WorkloadGenerator::new(
            self.config.universe,
            self.config.seed,
            self.config.zipf_exponent,
        )?;

        report::write_header(out, &self.config, probed)?;

        let mut reports = Vec::new();
        for distribution in Distribution::ALL {
            let started = Instant::now();
            info!(%distribution, "warm-up pass");
            report::write_marker(out, DRY_RUN)?;
            let warmup = self.config.warmup_variant();
            let sink = self.pass(
                &mut generator,
                distribution,
                std::slice::from_ref(&warmup),
                &densities,
                VerificationMode::Unverified,
                |_| Ok(()),
            )?;
            report::write_sink(out, sink)?;

            info!(%distribution, variants = self.config.thresholds.len(), "verified pass");
            report::write_marker(out, START_COUNTING)?;
            let variants = self.config.variants();
            let sink = self.pass(
                &mut generator,
                distribution,
                &variants,
                &densities,
                VerificationMode::Verified,
                |section| {
                    report::write_section(&mut *out, &section, probed)?;
                    reports.push(section);
                    Ok(())
                },
            )?;
            report::write_sink(out, sink)?;
            out.flush()?;
            info!(%distribution, elapsed = ?started.elapsed(), "distribution done");
        }
        Ok(reports)
    }

    /// Run one pass and hand each finished variant section to `emit`. Returns the sink value.
    fn pass(
        &self,
        generator: &mut WorkloadGenerator,
        distribution: Distribution,
        variants: &[TunableVariant],
        densities: &[f64],
        mode: VerificationMode,
        mut emit: impl FnMut(VariantReport) -> Result<()>,
    ) -> Result<u64> {
        let mut runner = TrialRunner::new(
            &self.registry,
            self.config.repetitions,
            mode,
            self.probe.as_ref(),
        );
        for variant in variants {
            let mut rows = Vec::with_capacity(densities.len());
            for &density in densities {
                let cell = Cell {
                    distribution,
                    variant,
                    density,
                };
                let metrics = runner.run_cell(generator, cell)?;
                debug!(%cell, "cell done");
                rows.push(ReportRow {
                    density,
                    summaries: metrics.summarize(self.config.universe, density),
                });
            }
            emit(VariantReport {
                distribution,
                variant: variant.name().to_string(),
                rows,
            })?;
        }
        Ok(runner.sink().value())
    }
}

//! Experiment configuration loaded from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `SETBENCH_UNIVERSE` | `100000` |
//! | `SETBENCH_REPETITIONS` | `100` |
//! | `SETBENCH_SEED` | `42` |
//! | `SETBENCH_MIN_DENSITY_EXP` | `-3` |
//! | `SETBENCH_ZIPF_EXPONENT` | `1.0` |
//! | `SETBENCH_THRESHOLDS` | `1024,4096,8192,16384` |
//! | `SETBENCH_PROBE` | `1` |
//!
//! Values that fail to parse fall back to the default.

use std::str::FromStr;

use crate::adapter::TunableVariant;
use crate::error::{Error, Result};
use crate::hierarchical::MAX_UNIVERSE;

/// Settings for one experiment run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    /// Universe size `N`.
    pub universe: u32,
    /// Repetitions per cell.
    pub repetitions: usize,
    /// Seed of the workload generator.
    pub seed: u64,
    /// Densities run from `10^min_density_exp` up to `10^0`.
    pub min_density_exp: i32,
    /// Zipf exponent `s`.
    pub zipf_exponent: f64,
    /// Array/bitmap switch points of the verified variants.
    pub thresholds: Vec<usize>,
    /// Whether to try the allocator-backed memory probe.
    pub probe: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            universe: 100_000,
            repetitions: 100,
            seed: 42,
            min_density_exp: -3,
            zipf_exponent: 1.0,
            thresholds: vec![1024, 4096, 8192, 16384],
            probe: true,
        }
    }
}

impl ExperimentConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let thresholds = lookup("SETBENCH_THRESHOLDS")
            .and_then(|s| {
                s.split(',')
                    .map(|t| t.trim().parse().ok())
                    .collect::<Option<Vec<usize>>>()
            })
            .unwrap_or(defaults.thresholds);

        let probe = lookup("SETBENCH_PROBE")
            .map(|s| !matches!(s.trim(), "0" | "false" | "off" | "no"))
            .unwrap_or(defaults.probe);

        Self {
            universe: parse_var(&lookup, "SETBENCH_UNIVERSE").unwrap_or(defaults.universe),
            repetitions: parse_var(&lookup, "SETBENCH_REPETITIONS").unwrap_or(defaults.repetitions),
            seed: parse_var(&lookup, "SETBENCH_SEED").unwrap_or(defaults.seed),
            min_density_exp: parse_var(&lookup, "SETBENCH_MIN_DENSITY_EXP")
                .unwrap_or(defaults.min_density_exp),
            zipf_exponent: parse_var(&lookup, "SETBENCH_ZIPF_EXPONENT")
                .unwrap_or(defaults.zipf_exponent),
            thresholds,
            probe,
        }
    }

    /// Reject settings no experiment can run with.
    pub fn validate(&self) -> Result<()> {
        if self.universe == 0 {
            return Err(Error::InvalidUniverse(self.universe));
        }
        if self.universe > MAX_UNIVERSE {
            return Err(Error::InvalidConfig(format!(
                "universe {} exceeds the hierarchical bitmap limit of {MAX_UNIVERSE}",
                self.universe
            )));
        }
        if self.repetitions == 0 {
            return Err(Error::InvalidConfig("repetitions must be >= 1".to_string()));
        }
        if self.min_density_exp > 0 {
            return Err(Error::InvalidConfig(format!(
                "min density exponent must be <= 0, got {}",
                self.min_density_exp
            )));
        }
        if !(self.zipf_exponent.is_finite() && self.zipf_exponent >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "zipf exponent must be finite and non-negative, got {}",
                self.zipf_exponent
            )));
        }
        if self.thresholds.is_empty() {
            return Err(Error::InvalidConfig("no thresholds configured".to_string()));
        }
        for d in self.densities() {
            if (f64::from(self.universe) * d).round() < 1.0 {
                return Err(Error::InvalidDensity {
                    density: d,
                    universe: self.universe,
                });
            }
        }
        Ok(())
    }

    /// Densities `10^e` for `e` from the minimum exponent up to 0, ascending.
    pub fn densities(&self) -> Vec<f64> {
        (self.min_density_exp..=0)
            .map(|e| 1.0 / 10f64.powi(-e))
            .collect()
    }

    /// Verified variants, one per configured threshold.
    pub fn variants(&self) -> Vec<TunableVariant> {
        self.thresholds
            .iter()
            .map(|&t| TunableVariant::threshold(t))
            .collect()
    }

    /// The single trivial variant of the unreported warm-up pass.
    pub fn warmup_variant(&self) -> TunableVariant {
        TunableVariant::new("warm-up", 1)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

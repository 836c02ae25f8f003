//! Reproducible synthetic workloads.
//!
//! A workload is a sorted, duplicate-free array of integers drawn from
//! `[0, N)` at a target density `d`, so it always holds exactly `round(N * d)`
//! values. Two value distributions are supported:
//!
//! - **Uniform**: every value is equally likely.
//! - **Zipfian**: value `i` is weighted `1 / (i + 1)^s`, so small values dominate
//!   and the set clusters at the front of the universe.
//!
//! Both are sampled *without replacement*. For Zipf this uses the
//! Efraimidis–Spirakis keys `E_i * (i + 1)^s` with `E_i ~ Exp(1)` and keeps the
//! `k` smallest, which yields the same distribution as drawing with replacement
//! and discarding duplicates, in `O(N)` time even at density 1.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;

use crate::error::{Error, Result};

/// Value distribution of a generated workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    /// Every value of the universe is equally likely.
    Uniform,
    /// Value `i` has weight `1 / (i + 1)^s`.
    Zipfian,
}

impl Distribution {
    /// Both distributions, in the order the experiment runs them.
    pub const ALL: [Distribution; 2] = [Distribution::Uniform, Distribution::Zipfian];

    /// Lowercase name used in reports and logs.
    pub fn name(self) -> &'static str {
        match self {
            Distribution::Uniform => "uniform",
            Distribution::Zipfian => "zipfian",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ascending, duplicate-free set of values below `universe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    values: Vec<u32>,
    universe: u32,
}

impl Workload {
    /// Build a workload from arbitrary values.
    ///
    /// Values are sorted and deduplicated; any value `>= universe` is rejected.
    pub fn new(mut values: Vec<u32>, universe: u32) -> Result<Self> {
        if universe == 0 {
            return Err(Error::InvalidUniverse(universe));
        }
        values.sort_unstable();
        values.dedup();
        if let Some(&value) = values.last() {
            if value >= universe {
                return Err(Error::ValueOutOfUniverse { value, universe });
            }
        }
        Ok(Self { values, universe })
    }

    /// The values, ascending.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if the workload holds no value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Exclusive upper bound of the values.
    pub fn universe(&self) -> u32 {
        self.universe
    }

    /// Membership test by binary search.
    pub fn contains(&self, value: u32) -> bool {
        self.values.binary_search(&value).is_ok()
    }
}

/// Seeded generator of [`Workload`]s over a fixed universe.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    rng: StdRng,
    universe: u32,
    zipf_exponent: f64,
}

impl WorkloadGenerator {
    /// Create a generator. Identical arguments produce identical workload streams.
    pub fn new(universe: u32, seed: u64, zipf_exponent: f64) -> Result<Self> {
        if universe == 0 {
            return Err(Error::InvalidUniverse(universe));
        }
        if !(zipf_exponent.is_finite() && zipf_exponent >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "zipf exponent must be finite and non-negative, got {zipf_exponent}"
            )));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            universe,
            zipf_exponent,
        })
    }

    /// The universe size `N`.
    pub fn universe(&self) -> u32 {
        self.universe
    }

    /// Number of values a workload at `density` holds, after validation.
    pub fn target_cardinality(&self, density: f64) -> Result<usize> {
        let invalid = Error::InvalidDensity {
            density,
            universe: self.universe,
        };
        if !(density.is_finite() && density > 0.0 && density <= 1.0) {
            return Err(invalid);
        }
        let k = (f64::from(self.universe) * density).round() as usize;
        if k == 0 {
            return Err(invalid);
        }
        Ok(k.min(self.universe as usize))
    }

    /// Draw a workload of exactly `round(N * density)` distinct values.
    pub fn generate(&mut self, density: f64, distribution: Distribution) -> Result<Workload> {
        let k = self.target_cardinality(density)?;
        let n = self.universe as usize;
        let values: Vec<u32> = match distribution {
            Distribution::Uniform => index::sample(&mut self.rng, n, k)
                .into_iter()
                .map(|i| i as u32)
                .collect(),
            Distribution::Zipfian => self.zipf_sample(k),
        };
        Workload::new(values, self.universe)
    }

    /// Uniformly chosen element of `workload`, or `None` if it is empty.
    pub fn pick(&mut self, workload: &Workload) -> Option<u32> {
        if workload.is_empty() {
            return None;
        }
        Some(workload.values[self.rng.random_range(0..workload.len())])
    }

    fn zipf_sample(&mut self, k: usize) -> Vec<u32> {
        let n = self.universe as usize;
        if k >= n {
            return (0..self.universe).collect();
        }
        let s = self.zipf_exponent;
        let mut keyed: Vec<(f64, u32)> = (0..self.universe)
            .map(|i| {
                let e: f64 = self.rng.sample(Exp1);
                (e * f64::from(i + 1).powf(s), i)
            })
            .collect();
        keyed.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
        keyed.truncate(k);
        keyed.into_iter().map(|(_, i)| i).collect()
    }
}

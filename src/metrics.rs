//! Per-cell accumulation and normalization of trial measurements.

use std::time::Duration;

use crate::trial::Measurement;

/// Sums of every [`Measurement`] recorded for one representation in one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationTotals {
    /// Registered representation name.
    pub name: &'static str,
    /// Total build time, both workloads.
    pub build: Duration,
    /// Total intersection time.
    pub intersect: Duration,
    /// Total union time.
    pub union: Duration,
    /// Total delete time.
    pub delete: Duration,
    /// Values inserted across all builds.
    pub elements_built: u64,
    /// Analytic footprint across all builds, in bits.
    pub estimated_bits: u64,
    /// Probed footprint across all builds; `None` once any repetition lacked a probe.
    pub true_bits: Option<u64>,
    /// Repetitions recorded.
    pub repetitions: u64,
}

impl RepresentationTotals {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            build: Duration::ZERO,
            intersect: Duration::ZERO,
            union: Duration::ZERO,
            delete: Duration::ZERO,
            elements_built: 0,
            estimated_bits: 0,
            true_bits: Some(0),
            repetitions: 0,
        }
    }

    fn add(&mut self, m: &Measurement) {
        self.build += m.build;
        self.intersect += m.intersect;
        self.union += m.union;
        self.delete += m.delete;
        self.elements_built += m.elements_built;
        self.estimated_bits += m.estimated_bits;
        self.true_bits = self.true_bits.zip(m.true_bits).map(|(a, b)| a + b);
        self.repetitions += 1;
    }

    /// Normalize these totals for a cell at `density` over `universe`.
    ///
    /// Times are averaged per repetition, build time is divided by the number
    /// of elements built, and footprints are divided by the nominal element
    /// count `repetitions * 2 * N * d`. Empty totals normalize to zero.
    pub fn summarize(&self, universe: u32, density: f64) -> RepresentationSummary {
        let reps = self.repetitions as f64;
        let nominal = reps * 2.0 * f64::from(universe) * density;
        let bits = |total: u64| ratio(total as f64, nominal);
        RepresentationSummary {
            name: self.name,
            intersect_ns: ratio(nanos(self.intersect), reps),
            build_ns_per_element: ratio(nanos(self.build), self.elements_built as f64),
            delete_ns: ratio(nanos(self.delete), reps),
            union_ns: ratio(nanos(self.union), reps),
            bits_per_int: bits(self.estimated_bits),
            true_bits_per_int: if self.repetitions == 0 {
                None
            } else {
                self.true_bits.map(bits)
            },
        }
    }
}

/// One representation's normalized numbers for one report row.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationSummary {
    /// Registered representation name.
    pub name: &'static str,
    /// Average intersection time, ns.
    pub intersect_ns: f64,
    /// Build time per element, ns.
    pub build_ns_per_element: f64,
    /// Average delete time, ns.
    pub delete_ns: f64,
    /// Average union time, ns.
    pub union_ns: f64,
    /// Analytic bits per integer.
    pub bits_per_int: f64,
    /// Probed bits per integer, when a probe was available.
    pub true_bits_per_int: Option<f64>,
}

/// Accumulates measurements for every representation of one cell.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    totals: Vec<RepresentationTotals>,
}

impl MetricsAggregator {
    /// One slot per representation, in registration order.
    pub fn new(names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            totals: names.into_iter().map(RepresentationTotals::new).collect(),
        }
    }

    /// Add a measurement for the representation at `index`.
    ///
    /// Indices outside the registry are ignored.
    pub fn record(&mut self, index: usize, measurement: &Measurement) {
        if let Some(totals) = self.totals.get_mut(index) {
            totals.add(measurement);
        }
    }

    /// Raw sums, in registration order.
    pub fn totals(&self) -> &[RepresentationTotals] {
        &self.totals
    }

    /// Normalized numbers, in registration order.
    pub fn summarize(&self, universe: u32, density: f64) -> Vec<RepresentationSummary> {
        self.totals
            .iter()
            .map(|t| t.summarize(universe, density))
            .collect()
    }
}

fn nanos(d: Duration) -> f64 {
    d.as_nanos() as f64
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(ns: u64, true_bits: Option<u64>) -> Measurement {
        Measurement {
            build: Duration::from_nanos(ns * 200),
            intersect: Duration::from_nanos(ns),
            union: Duration::from_nanos(ns * 2),
            delete: Duration::from_nanos(ns * 3),
            elements_built: 200,
            estimated_bits: 1600,
            true_bits,
        }
    }

    #[test]
    fn normalization() {
        let mut agg = MetricsAggregator::new(["a", "b"]);
        agg.record(0, &measurement(10, Some(3200)));
        agg.record(0, &measurement(30, Some(3200)));
        let s = &agg.summarize(1000, 0.1)[0];
        assert_eq!(s.name, "a");
        assert_eq!(s.intersect_ns, 20.0);
        assert_eq!(s.union_ns, 40.0);
        assert_eq!(s.delete_ns, 60.0);
        // 8000 ns of build over 400 elements.
        assert_eq!(s.build_ns_per_element, 20.0);
        // 3200 bits over 2 reps * 2 * 100 elements.
        assert_eq!(s.bits_per_int, 8.0);
        assert_eq!(s.true_bits_per_int, Some(16.0));
    }

    #[test]
    fn probe_gap_drops_true_bits() {
        let mut agg = MetricsAggregator::new(["a"]);
        agg.record(0, &measurement(10, Some(100)));
        agg.record(0, &measurement(10, None));
        assert_eq!(agg.totals()[0].true_bits, None);
        assert_eq!(agg.summarize(1000, 0.1)[0].true_bits_per_int, None);
    }

    #[test]
    fn empty_totals_are_finite() {
        let agg = MetricsAggregator::new(["a"]);
        let s = &agg.summarize(1000, 0.1)[0];
        for v in [s.intersect_ns, s.build_ns_per_element, s.bits_per_int] {
            assert!(v.is_finite() && v >= 0.0);
        }
        assert_eq!(s.true_bits_per_int, None);
    }
}

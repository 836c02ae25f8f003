//! Ground truth for one repetition, computed independently of every representation.

use crate::trial::Operation;
use crate::workload::Workload;

const IN_FIRST: u8 = 1;
const IN_SECOND: u8 = 2;

/// Reference results for a pair of workloads and a delete target.
///
/// Built from a presence table over `[0, N)`: byte `i` records whether `i` is in
/// the first workload, the second, or both. The table is only used during
/// construction.
#[derive(Debug, Clone)]
pub struct CorrectnessOracle {
    intersection: Vec<u32>,
    union: Vec<u32>,
    after_delete: Vec<u32>,
}

impl CorrectnessOracle {
    /// Compute `v1 ∩ v2`, `v1 ∪ v2` and `v2 \ {target}`.
    pub fn new(v1: &Workload, v2: &Workload, target: u32) -> Self {
        let n = v1.universe().max(v2.universe()) as usize;
        let mut table = vec![0u8; n];
        for &v in v1.values() {
            table[v as usize] |= IN_FIRST;
        }
        for &v in v2.values() {
            table[v as usize] |= IN_SECOND;
        }

        let mut intersection = Vec::new();
        let mut union = Vec::new();
        for (i, &flags) in table.iter().enumerate() {
            if flags != 0 {
                union.push(i as u32);
                if flags == IN_FIRST | IN_SECOND {
                    intersection.push(i as u32);
                }
            }
        }
        let after_delete = v2.values().iter().copied().filter(|&v| v != target).collect();

        Self {
            intersection,
            union,
            after_delete,
        }
    }

    /// Expected `v1 ∩ v2`, ascending.
    pub fn intersection(&self) -> &[u32] {
        &self.intersection
    }

    /// Expected `v1 ∪ v2`, ascending.
    pub fn union(&self) -> &[u32] {
        &self.union
    }

    /// Expected contents of the `v2` set after deleting the target.
    pub fn after_delete(&self) -> &[u32] {
        &self.after_delete
    }

    /// Reference result for `operation`. Builds are checked by cardinality and have none.
    pub fn expected(&self, operation: Operation) -> Option<&[u32]> {
        match operation {
            Operation::Build => None,
            Operation::Intersect => Some(&self.intersection),
            Operation::Union => Some(&self.union),
            Operation::Delete => Some(&self.after_delete),
        }
    }

    /// Compare `actual` with the reference by set equality.
    ///
    /// On mismatch, returns a summary of expected vs. actual cardinality and the
    /// first value on which they differ.
    pub fn check(&self, operation: Operation, mut actual: Vec<u32>) -> Result<(), String> {
        let Some(expected) = self.expected(operation) else {
            return Err(format!("no reference result for {operation}"));
        };
        actual.sort_unstable();
        actual.dedup();
        if actual == expected {
            return Ok(());
        }
        let first_diff = expected
            .iter()
            .zip(&actual)
            .position(|(e, a)| e != a)
            .unwrap_or(expected.len().min(actual.len()));
        let describe = |values: &[u32]| {
            values
                .get(first_diff)
                .map_or_else(|| "<end>".to_string(), u32::to_string)
        };
        Err(format!(
            "expected {} values, got {}; first difference at index {first_diff}: expected {}, got {}",
            expected.len(),
            actual.len(),
            describe(expected),
            describe(&actual),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> CorrectnessOracle {
        let v1 = Workload::new(vec![1, 4, 7, 9], 10).unwrap();
        let v2 = Workload::new(vec![0, 4, 9], 10).unwrap();
        CorrectnessOracle::new(&v1, &v2, 4)
    }

    #[test]
    fn reference_sets() {
        let o = oracle();
        assert_eq!(o.intersection(), &[4, 9]);
        assert_eq!(o.union(), &[0, 1, 4, 7, 9]);
        assert_eq!(o.after_delete(), &[0, 9]);
        assert!(o.expected(Operation::Build).is_none());
    }

    #[test]
    fn check_uses_set_equality() {
        let o = oracle();
        assert!(o.check(Operation::Intersect, vec![9, 4, 9]).is_ok());
        assert!(o.check(Operation::Delete, vec![0, 9]).is_ok());
    }

    #[test]
    fn check_reports_first_difference() {
        let o = oracle();
        let err = o.check(Operation::Union, vec![0, 1, 5, 7, 9]).unwrap_err();
        assert!(err.contains("expected 5 values, got 5"), "{err}");
        assert!(err.contains("index 2: expected 4, got 5"), "{err}");

        let err = o.check(Operation::Intersect, vec![4]).unwrap_err();
        assert!(err.contains("index 1: expected 9, got <end>"), "{err}");
    }

    #[test]
    fn absent_target_leaves_second_set() {
        let v1 = Workload::new(vec![2], 10).unwrap();
        let v2 = Workload::new(vec![3, 5], 10).unwrap();
        let o = CorrectnessOracle::new(&v1, &v2, 2);
        assert_eq!(o.after_delete(), &[3, 5]);
    }
}

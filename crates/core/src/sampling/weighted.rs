use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DistributionError {
    #[error("distribution `{name}` has no entries")]
    Empty { name: String },
    #[error("distribution `{name}` has a negative or non-finite weight at entry {index}")]
    InvalidWeight { name: String, index: usize },
    #[error("distribution `{name}` weights sum to zero")]
    ZeroSum { name: String },
}

/// One configured `(value, weight)` pair as it appears in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> WeightedValue<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Validated categorical distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution<T> {
    name: String,
    entries: Vec<(T, f64)>,
    total: f64,
}

impl<T: Clone> Distribution<T> {
    pub fn new(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (T, f64)>,
    ) -> Result<Self, DistributionError> {
        let name = name.into();
        let entries = entries.into_iter().collect::<Vec<_>>();
        if entries.is_empty() {
            return Err(DistributionError::Empty { name });
        }

        let mut total = 0.0;
        for (index, (_, weight)) in entries.iter().enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(DistributionError::InvalidWeight { name, index });
            }
            total += weight;
        }
        if total <= 0.0 {
            return Err(DistributionError::ZeroSum { name });
        }

        Ok(Self { name, entries, total })
    }

    pub fn from_table(
        name: impl Into<String>,
        table: &[WeightedValue<T>],
    ) -> Result<Self, DistributionError> {
        Self::new(name, table.iter().map(|entry| (entry.value.clone(), entry.weight)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(value, _)| value)
    }

    /// Resolves a uniform draw in `[0, 1)` to a value by walking cumulative weights.
    ///
    /// A target landing exactly on a boundary resolves to the earlier entry, and
    /// zero-weight entries are never selected.
    pub fn sample_at(&self, unit: f64) -> &T {
        let target = unit.clamp(0.0, 1.0) * self.total;
        let mut cumulative = 0.0;
        let mut last_positive = 0;

        for (index, (value, weight)) in self.entries.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = index;
            if target <= cumulative {
                return value;
            }
        }

        // Floating point drift can leave the target a hair above the final boundary.
        &self.entries[last_positive].0
    }
}

impl<T: Clone + PartialEq> Distribution<T> {
    /// Configured share of `value`, `weight / sum(weights)`.
    pub fn share_of(&self, value: &T) -> f64 {
        self.entries
            .iter()
            .filter(|(candidate, _)| candidate == value)
            .map(|(_, weight)| weight)
            .sum::<f64>()
            / self.total
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Distribution, DistributionError, WeightedValue};
    use crate::sampling::{PhaseRng, SeedDomain};

    #[test]
    fn boundary_hits_resolve_to_earlier_entry() {
        let distribution =
            Distribution::new("split", [("a", 1.0), ("b", 1.0), ("c", 2.0)]).expect("valid");

        assert_eq!(*distribution.sample_at(0.0), "a");
        assert_eq!(*distribution.sample_at(0.25), "a");
        assert_eq!(*distribution.sample_at(0.2500001), "b");
        assert_eq!(*distribution.sample_at(0.5), "b");
        assert_eq!(*distribution.sample_at(0.75), "c");
        assert_eq!(*distribution.sample_at(0.999_999), "c");
    }

    #[test]
    fn zero_weight_entries_are_never_selected() {
        let distribution =
            Distribution::new("single", [("never", 0.0), ("always", 3.0), ("tail", 0.0)])
                .expect("valid");

        for step in 0..100 {
            assert_eq!(*distribution.sample_at(f64::from(step) / 100.0), "always");
        }
    }

    #[test]
    fn rejects_invalid_tables() {
        assert_eq!(
            Distribution::<u8>::new("empty", []).expect_err("empty"),
            DistributionError::Empty { name: "empty".into() }
        );
        assert_eq!(
            Distribution::new("neg", [(1, 1.0), (2, -0.5)]).expect_err("negative"),
            DistributionError::InvalidWeight { name: "neg".into(), index: 1 }
        );
        assert_eq!(
            Distribution::new("zero", [(1, 0.0), (2, 0.0)]).expect_err("zero sum"),
            DistributionError::ZeroSum { name: "zero".into() }
        );
        assert!(Distribution::new("nan", [(1, f64::NAN)]).is_err());
    }

    #[test]
    fn empirical_frequencies_converge_to_weights() {
        let table = vec![
            WeightedValue::new("closed", 90.0),
            WeightedValue::new("open", 7.0),
            WeightedValue::new("new", 3.0),
        ];
        let distribution = Distribution::from_table("status", &table).expect("valid");
        let mut rng = PhaseRng::from_seed(SeedDomain::Cases, 99);
        let draws = 20_000u32;
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(*rng.sample(&distribution)).or_default() += 1;
        }

        for entry in &table {
            let hits = counts.get(&entry.value).copied().unwrap_or(0);
            let observed = f64::from(hits) / f64::from(draws);
            let expected = distribution.share_of(&entry.value);
            assert!(
                (observed - expected).abs() < 0.01,
                "{} observed {observed} expected {expected}",
                entry.value
            );
        }
    }
}

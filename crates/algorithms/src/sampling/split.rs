//! Reproducible training/validation split

use crate::rng::derive_seed;
use geofuse_core::{Algorithm, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Partition, SampleSet};

/// How samples are assigned to the two partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Each sample independently: value <= ratio goes to training
    #[default]
    Random,
    /// Within each class, the `round(ratio * n)` lowest values go to training;
    /// every class with two or more samples lands on both sides
    Stratified,
}

/// Parameters for [`DatasetSplitter`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    /// Training share, strictly between 0 and 1
    pub ratio: f64,
    pub seed: u64,
    pub strategy: SplitStrategy,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            ratio: 0.5,
            seed: 0,
            strategy: SplitStrategy::Random,
        }
    }
}

/// Partition sizes after a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub training: usize,
    pub validation: usize,
}

/// Splitting stage
#[derive(Debug, Clone, Default)]
pub struct DatasetSplitter;

impl Algorithm for DatasetSplitter {
    type Input = SampleSet;
    type Output = SampleSet;
    type Params = SplitParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DatasetSplitter"
    }

    fn description(&self) -> &'static str {
        "Tag samples as training or validation from a seeded per-sample draw"
    }

    fn execute(&self, mut input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        split_samples(&mut input, &params)?;
        Ok(input)
    }
}

/// Uniform value in [0, 1) owned by one sample under one seed
fn split_value(seed: u64, id: usize) -> f64 {
    StdRng::seed_from_u64(derive_seed(seed, id as u64)).gen::<f64>()
}

/// Tag every sample of `samples` with a partition.
///
/// The assignment depends only on the seed, each sample's id and (for the
/// stratified strategy) its label, so re-running on the same input gives
/// the same partitions. When either side would be empty the set is left
/// untouched and [`Error::EmptyPartition`] is returned.
pub fn split_samples(samples: &mut SampleSet, params: &SplitParams) -> Result<SplitSummary> {
    if !(params.ratio > 0.0 && params.ratio < 1.0) {
        return Err(Error::InvalidParameter {
            name: "ratio",
            value: params.ratio.to_string(),
            reason: "split ratio must lie strictly between 0 and 1".into(),
        });
    }

    let values: Vec<f64> = samples
        .iter()
        .map(|s| split_value(params.seed, s.id))
        .collect();

    let tags: Vec<Partition> = match params.strategy {
        SplitStrategy::Random => values
            .iter()
            .map(|&v| {
                if v <= params.ratio {
                    Partition::Training
                } else {
                    Partition::Validation
                }
            })
            .collect(),
        SplitStrategy::Stratified => {
            let mut by_class: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
            for (i, s) in samples.iter().enumerate() {
                by_class.entry(s.label).or_default().push(i);
            }
            let mut tags = vec![Partition::Validation; values.len()];
            for members in by_class.values_mut() {
                members.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
                let n = members.len();
                let n_train = if n == 1 {
                    1
                } else {
                    ((params.ratio * n as f64).round() as usize).clamp(1, n - 1)
                };
                for &i in &members[..n_train] {
                    tags[i] = Partition::Training;
                }
            }
            tags
        }
    };

    let training = tags.iter().filter(|&&t| t == Partition::Training).count();
    let validation = tags.len() - training;
    for (partition, count) in [("training", training), ("validation", validation)] {
        if count == 0 {
            return Err(Error::EmptyPartition {
                partition,
                training,
                validation,
                total: tags.len(),
            });
        }
    }

    for (sample, tag) in samples.samples_mut().iter_mut().zip(tags) {
        sample.partition = Some(tag);
    }
    Ok(SplitSummary {
        training,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::Sample;

    fn make_samples(n: usize, classes: u32) -> SampleSet {
        let samples = (0..n)
            .map(|i| Sample::new(i, vec![i as f64], (i as u32 % classes) + 1))
            .collect();
        SampleSet::from_samples(vec!["x".into()], samples).unwrap()
    }

    fn tags(set: &SampleSet) -> Vec<Option<Partition>> {
        set.iter().map(|s| s.partition).collect()
    }

    #[test]
    fn test_split_is_exhaustive_and_reproducible() {
        let params = SplitParams {
            ratio: 0.7,
            seed: 42,
            ..Default::default()
        };
        let mut a = make_samples(200, 3);
        let mut b = make_samples(200, 3);
        let sa = split_samples(&mut a, &params).unwrap();
        split_samples(&mut b, &params).unwrap();

        assert_eq!(sa.training + sa.validation, 200);
        assert_eq!(a.training().count(), sa.training);
        assert!(a.iter().all(|s| s.partition.is_some()));
        assert_eq!(tags(&a), tags(&b));
        assert!(sa.training > 100 && sa.training < 180);
    }

    #[test]
    fn test_different_seed_changes_split() {
        let mut a = make_samples(100, 2);
        let mut b = make_samples(100, 2);
        split_samples(&mut a, &SplitParams { seed: 1, ..Default::default() }).unwrap();
        split_samples(&mut b, &SplitParams { seed: 2, ..Default::default() }).unwrap();
        assert_ne!(tags(&a), tags(&b));
    }

    #[test]
    fn test_stratified_covers_every_class() {
        let mut set = make_samples(30, 3);
        let params = SplitParams {
            ratio: 0.8,
            seed: 9,
            strategy: SplitStrategy::Stratified,
        };
        let summary = split_samples(&mut set, &params).unwrap();
        assert_eq!(summary.training, 24);
        for class in 1..=3 {
            assert_eq!(set.training().filter(|s| s.label == class).count(), 8);
            assert_eq!(set.validation().filter(|s| s.label == class).count(), 2);
        }
    }

    #[test]
    fn test_degenerate_split_fails_untouched() {
        let mut set = make_samples(1, 1);
        let err = split_samples(&mut set, &SplitParams::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyPartition { total: 1, .. }));
        assert_eq!(tags(&set), vec![None]);
    }

    #[test]
    fn test_tiny_ratio_leaves_training_empty() {
        let mut set = make_samples(3, 1);
        let params = SplitParams {
            ratio: 1e-12,
            seed: 5,
            ..Default::default()
        };
        let err = split_samples(&mut set, &params).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyPartition {
                partition: "training",
                training: 0,
                validation: 3,
                total: 3
            }
        ));
        assert_eq!(tags(&set), vec![None; 3]);
    }

    #[test]
    fn test_singleton_classes_leave_validation_empty() {
        let mut set = make_samples(4, 4);
        let params = SplitParams {
            strategy: SplitStrategy::Stratified,
            ..Default::default()
        };
        let err = split_samples(&mut set, &params).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyPartition {
                partition: "validation",
                training: 4,
                validation: 0,
                total: 4
            }
        ));
        assert!(!set.is_split());
    }

    #[test]
    fn test_ratio_bounds() {
        let mut set = make_samples(10, 2);
        for ratio in [0.0, 1.0, -0.5, f64::NAN] {
            let params = SplitParams {
                ratio,
                ..Default::default()
            };
            assert!(matches!(
                split_samples(&mut set, &params),
                Err(Error::InvalidParameter { name: "ratio", .. })
            ));
        }
    }
}

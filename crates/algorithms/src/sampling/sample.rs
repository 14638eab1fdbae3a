//! Labeled feature vectors

use geofuse_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which side of the split a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Training,
    Validation,
}

/// One feature vector with its class code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Identity of the sample, stable across runs (index of the source point)
    pub id: usize,
    /// One value per feature stack band
    pub features: Vec<f64>,
    pub label: u32,
    /// Unset until the set has been split
    pub partition: Option<Partition>,
}

impl Sample {
    pub fn new(id: usize, features: Vec<f64>, label: u32) -> Self {
        Self {
            id,
            features,
            label,
            partition: None,
        }
    }

    pub fn in_partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }
}

/// Samples drawn from one feature stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    band_names: Vec<String>,
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(band_names: Vec<String>) -> Self {
        Self {
            band_names,
            samples: Vec::new(),
        }
    }

    /// Build from existing samples, checking every vector has one value per band
    pub fn from_samples(band_names: Vec<String>, samples: Vec<Sample>) -> Result<Self> {
        let mut set = Self::new(band_names);
        for s in samples {
            set.push(s)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, sample: Sample) -> Result<()> {
        if sample.features.len() != self.band_names.len() {
            return Err(Error::InvalidParameter {
                name: "features",
                value: sample.features.len().to_string(),
                reason: format!(
                    "sample {} must have one value per band ({})",
                    sample.id,
                    self.band_names.len()
                ),
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn band_names(&self) -> &[String] {
        &self.band_names
    }

    pub fn num_features(&self) -> usize {
        self.band_names.len()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Samples tagged with `partition`, in input order
    pub fn partition(&self, partition: Partition) -> impl Iterator<Item = &Sample> {
        self.samples
            .iter()
            .filter(move |s| s.partition == Some(partition))
    }

    pub fn training(&self) -> impl Iterator<Item = &Sample> {
        self.partition(Partition::Training)
    }

    pub fn validation(&self) -> impl Iterator<Item = &Sample> {
        self.partition(Partition::Validation)
    }

    /// Whether any sample carries a partition tag
    pub fn is_split(&self) -> bool {
        self.samples.iter().any(|s| s.partition.is_some())
    }

    /// Samples a model is fitted on: the training partition, or every
    /// sample when the set was never split.
    pub fn training_or_all(&self) -> impl Iterator<Item = &Sample> {
        let split = self.is_split();
        self.samples
            .iter()
            .filter(move |s| !split || s.partition == Some(Partition::Training))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_checks_vector_length() {
        let mut set = SampleSet::new(vec!["VV".into(), "VH".into()]);
        set.push(Sample::new(0, vec![-11.0, -18.0], 1)).unwrap();
        let err = set.push(Sample::new(1, vec![-11.0], 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "features", .. }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_partition_views_keep_order() {
        let set = SampleSet::from_samples(
            vec!["ndvi".into()],
            vec![
                Sample::new(0, vec![0.1], 1).in_partition(Partition::Validation),
                Sample::new(1, vec![0.2], 2).in_partition(Partition::Training),
                Sample::new(2, vec![0.3], 1),
                Sample::new(3, vec![0.4], 2).in_partition(Partition::Training),
            ],
        )
        .unwrap();
        let training: Vec<usize> = set.training().map(|s| s.id).collect();
        assert_eq!(training, vec![1, 3]);
        assert_eq!(set.validation().count(), 1);
        assert!(set.is_split());
        let fitted: Vec<usize> = set.training_or_all().map(|s| s.id).collect();
        assert_eq!(fitted, vec![1, 3]);
    }

    #[test]
    fn test_unsplit_set_fits_on_everything() {
        let set = SampleSet::from_samples(
            vec!["ndvi".into()],
            (0..3).map(|i| Sample::new(i, vec![0.1 * i as f64], 1)).collect(),
        )
        .unwrap();
        assert!(!set.is_split());
        assert_eq!(set.training().count(), 0);
        assert_eq!(set.training_or_all().count(), 3);
    }
}

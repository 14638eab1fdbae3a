//! Confusion matrices and accuracy metrics

use geofuse_core::{Algorithm, ClassSet, Error, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::ForestModel;
use crate::sampling::{Sample, SampleSet};

/// K x K counts; rows are true classes, columns predicted classes, both in
/// class-code order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    classes: ClassSet,
    counts: Array2<u64>,
}

impl ConfusionMatrix {
    /// Empty matrix over `classes`
    pub fn new(classes: &ClassSet) -> Self {
        let k = classes.len();
        Self {
            classes: classes.clone(),
            counts: Array2::zeros((k, k)),
        }
    }

    /// Tally paired labels. Fails with [`Error::Matrix`] when the sequences
    /// differ in length or a label is not a declared class.
    pub fn from_labels(predicted: &[u32], truth: &[u32], classes: &ClassSet) -> Result<Self> {
        if predicted.len() != truth.len() {
            return Err(Error::Matrix(format!(
                "{} predicted labels against {} true labels",
                predicted.len(),
                truth.len()
            )));
        }
        let mut matrix = Self::new(classes);
        for (&p, &t) in predicted.iter().zip(truth) {
            matrix.record(t, p)?;
        }
        Ok(matrix)
    }

    /// Count one observation
    pub fn record(&mut self, truth: u32, predicted: u32) -> Result<()> {
        let index = |code: u32, role: &str| {
            self.classes.index_of(code).ok_or_else(|| {
                Error::Matrix(format!(
                    "{} label {} is not one of the classes {:?}",
                    role,
                    code,
                    self.classes.codes()
                ))
            })
        };
        let row = index(truth, "true")?;
        let col = index(predicted, "predicted")?;
        self.counts[(row, col)] += 1;
        Ok(())
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Counts as nested rows, true class first
    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.counts.outer_iter().map(|r| r.to_vec()).collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    fn trace(&self) -> u64 {
        self.counts.diag().sum()
    }

    /// Overall accuracy, `trace / total`; 0 for an empty matrix
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.trace() as f64 / total as f64
    }

    /// Cohen's kappa.
    ///
    /// 0 for an empty matrix. When chance agreement is already perfect
    /// (a single class observed and predicted) kappa is 1 if every
    /// observation agrees and 0 otherwise.
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 0.0;
        }
        let observed = self.accuracy();
        let rows = self.counts.sum_axis(Axis(1));
        let cols = self.counts.sum_axis(Axis(0));
        let expected: f64 = rows
            .iter()
            .zip(cols.iter())
            .map(|(&r, &c)| r as f64 * c as f64)
            .sum::<f64>()
            / (total * total);
        if (1.0 - expected).abs() < f64::EPSILON {
            return if observed == 1.0 { 1.0 } else { 0.0 };
        }
        (observed - expected) / (1.0 - expected)
    }

    /// Per true class: correct / observed (recall). 0 for unobserved classes.
    pub fn producers_accuracy(&self) -> Vec<f64> {
        self.ratio_along(Axis(1))
    }

    /// Per predicted class: correct / predicted (precision). 0 for classes
    /// never predicted.
    pub fn consumers_accuracy(&self) -> Vec<f64> {
        self.ratio_along(Axis(0))
    }

    fn ratio_along(&self, axis: Axis) -> Vec<f64> {
        let sums = self.counts.sum_axis(axis);
        self.counts
            .diag()
            .iter()
            .zip(sums.iter())
            .map(|(&d, &s)| if s == 0 { 0.0 } else { d as f64 / s as f64 })
            .collect()
    }
}

/// Matrices for both partitions, scored by the same model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub training: ConfusionMatrix,
    pub validation: ConfusionMatrix,
}

fn score<'a>(
    model: &ForestModel,
    samples: impl Iterator<Item = &'a Sample>,
) -> Result<ConfusionMatrix> {
    let mut matrix = ConfusionMatrix::new(model.classes());
    for s in samples {
        let predicted = model.classify_vector(&s.features)?.ok_or_else(|| {
            Error::Matrix(format!("sample {} has no-data features", s.id))
        })?;
        matrix.record(s.label, predicted)?;
    }
    Ok(matrix)
}

/// Resubstitution matrix on the samples the model was trained on and
/// held-out matrix on the validation partition.
///
/// As in [`ForestModel::train`], an unsplit set counts entirely as training.
pub fn assess(model: &ForestModel, samples: &SampleSet) -> Result<AccuracyReport> {
    Ok(AccuracyReport {
        training: score(model, samples.training_or_all())?,
        validation: score(model, samples.validation())?,
    })
}

/// Accuracy assessment stage
#[derive(Debug, Clone, Default)]
pub struct AccuracyAssessor;

impl Algorithm for AccuracyAssessor {
    type Input = (ForestModel, SampleSet);
    type Output = AccuracyReport;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "AccuracyAssessor"
    }

    fn description(&self) -> &'static str {
        "Confusion matrices for the training and validation partitions"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let (model, samples) = input;
        assess(&model, &samples)
    }
}

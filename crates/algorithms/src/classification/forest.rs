//! Random forest classifier
//!
//! Bagged CART trees with a random feature subset per split. Every tree
//! draws from its own generator seeded from the forest seed and the tree
//! index, so training is reproducible and trees can be grown in parallel.

use crate::maybe_rayon::*;
use crate::rng::{derive_seed, stream};
use crate::sampling::{Sample, SampleSet};
use geofuse_core::raster::{Raster, RasterStack};
use geofuse_core::{Algorithm, ClassSet, Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tree::{argmax_lowest, DecisionTree, GrowParams, TrainingView};

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub num_trees: usize,
    /// Features tried at each split; `None` means `floor(sqrt(d))`
    pub variables_per_split: Option<usize>,
    /// Nodes at or below this population become leaves
    pub min_leaf_population: usize,
    /// Bag size as a fraction of the training set, drawn with replacement
    pub bag_fraction: f64,
    /// Cap on nodes per tree; `None` means unlimited
    pub max_nodes: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            num_trees: 800,
            variables_per_split: None,
            min_leaf_population: 1,
            bag_fraction: 0.5,
            max_nodes: None,
            seed: 0,
        }
    }
}

impl ForestParams {
    fn grow_params(&self, num_features: usize) -> Result<GrowParams> {
        let invalid = |name: &'static str, value: String, reason: &str| Error::InvalidParameter {
            name,
            value,
            reason: reason.to_string(),
        };
        if self.num_trees == 0 {
            return Err(invalid("num_trees", "0".into(), "a forest needs at least one tree"));
        }
        if !(self.bag_fraction > 0.0 && self.bag_fraction <= 1.0) {
            return Err(invalid(
                "bag_fraction",
                self.bag_fraction.to_string(),
                "must lie in (0, 1]",
            ));
        }
        if self.min_leaf_population == 0 {
            return Err(invalid("min_leaf_population", "0".into(), "must be at least 1"));
        }
        let variables_per_split = self
            .variables_per_split
            .unwrap_or_else(|| ((num_features as f64).sqrt().floor() as usize).max(1));
        if variables_per_split == 0 || variables_per_split > num_features {
            return Err(invalid(
                "variables_per_split",
                variables_per_split.to_string(),
                &format!("must lie in 1..={}", num_features),
            ));
        }
        let max_nodes = self.max_nodes.unwrap_or(usize::MAX);
        if max_nodes == 0 {
            return Err(invalid("max_nodes", "0".into(), "must be at least 1"));
        }
        Ok(GrowParams {
            variables_per_split,
            min_leaf_population: self.min_leaf_population,
            max_nodes,
        })
    }
}

/// Per-band importance as reported by [`ForestModel::explain`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandImportance {
    pub band: String,
    /// Share of the total impurity decrease; sums to 1 over all bands
    pub importance: f64,
    /// Summed Gini decrease across every split on this band
    pub raw: f64,
}

/// Summary of a trained forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub num_trees: usize,
    pub importance: Vec<BandImportance>,
    /// Out-of-bag misclassification rate, when any sample was left out of some bag
    pub oob_error: Option<f64>,
}

/// A trained forest. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    band_names: Vec<String>,
    classes: ClassSet,
    trees: Vec<DecisionTree>,
    importance: Vec<f64>,
    oob_error: Option<f64>,
}

struct GrownTree {
    tree: DecisionTree,
    importance: Vec<f64>,
    in_bag: Vec<bool>,
}

impl ForestModel {
    /// Train on the training partition of `samples`.
    ///
    /// A set that has not been split trains on every sample. Fails with
    /// [`Error::InsufficientSamples`] when a class of `classes` has no
    /// training sample, and with [`Error::Matrix`] when a label is not in
    /// `classes`.
    pub fn train(samples: &SampleSet, classes: &ClassSet, params: &ForestParams) -> Result<Self> {
        let rows: Vec<&Sample> = samples.training_or_all().collect();
        Self::fit(samples.band_names(), &rows, classes, params)
    }

    /// Train on `rows`, whose features follow `band_names`
    pub fn fit(
        band_names: &[String],
        rows: &[&Sample],
        classes: &ClassSet,
        params: &ForestParams,
    ) -> Result<Self> {
        let num_features = band_names.len();
        if num_features == 0 {
            return Err(Error::InvalidParameter {
                name: "band_names",
                value: "[]".into(),
                reason: "training needs at least one feature band".into(),
            });
        }
        let grow = params.grow_params(num_features)?;

        let mut labels = Vec::with_capacity(rows.len());
        let mut per_class = vec![0usize; classes.len()];
        for s in rows {
            let idx = classes.index_of(s.label).ok_or_else(|| {
                Error::Matrix(format!(
                    "sample {} has label {} outside the declared classes {:?}",
                    s.id,
                    s.label,
                    classes.codes()
                ))
            })?;
            if s.features.len() != num_features || s.features.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "features",
                    value: format!("sample {}", s.id),
                    reason: format!("expected {} finite feature values", num_features),
                });
            }
            per_class[idx] += 1;
            labels.push(idx);
        }
        if let Some(empty) = per_class.iter().position(|&n| n == 0) {
            let class = classes.iter().nth(empty);
            return Err(Error::InsufficientSamples {
                code: class.map_or(0, |c| c.code),
                name: class.map_or_else(String::new, |c| c.name.clone()),
            });
        }

        let features: Vec<&[f64]> = rows.iter().map(|s| s.features.as_slice()).collect();
        let view = TrainingView {
            features: &features,
            labels: &labels,
            num_classes: classes.len(),
        };
        let n = rows.len();
        let bag_size = ((params.bag_fraction * n as f64).round() as usize).max(1);
        let forest_seed = derive_seed(params.seed, stream::FOREST);

        info!(
            trees = params.num_trees,
            samples = n,
            features = num_features,
            variables_per_split = grow.variables_per_split,
            bag_size,
            "training random forest"
        );

        let grown: Vec<GrownTree> = (0..params.num_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(derive_seed(forest_seed, t as u64));
                let bag: Vec<usize> = (0..bag_size).map(|_| rng.gen_range(0..n)).collect();
                let mut in_bag = vec![false; n];
                for &i in &bag {
                    in_bag[i] = true;
                }
                let mut importance = vec![0.0; num_features];
                let tree = DecisionTree::grow(&view, bag, grow, &mut rng, &mut importance);
                GrownTree {
                    tree,
                    importance,
                    in_bag,
                }
            })
            .collect();

        let mut importance = vec![0.0; num_features];
        for g in &grown {
            for (acc, v) in importance.iter_mut().zip(&g.importance) {
                *acc += v;
            }
        }
        let oob_error = out_of_bag_error(&grown, &features, &labels, classes.len());
        debug!(?oob_error, "forest trained");

        Ok(Self {
            band_names: band_names.to_vec(),
            classes: classes.clone(),
            trees: grown.into_iter().map(|g| g.tree).collect(),
            importance,
            oob_error,
        })
    }

    pub fn band_names(&self) -> &[String] {
        &self.band_names
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Class code with the most tree votes.
    ///
    /// Fails with [`Error::Matrix`] when a tree votes for a class index the
    /// model does not know, which only a hand-edited model can produce.
    fn vote(&self, x: &[f64]) -> Result<u32> {
        let mut votes = vec![0u32; self.classes.len()];
        for tree in &self.trees {
            let index = tree.vote(x);
            let slot = votes.get_mut(index).ok_or_else(|| {
                Error::Matrix(format!(
                    "tree voted for class index {} of {}",
                    index,
                    self.classes.len()
                ))
            })?;
            *slot += 1;
        }
        let index = argmax_lowest(&votes);
        self.classes
            .code_at(index)
            .ok_or_else(|| Error::Matrix(format!("model has no class at index {}", index)))
    }

    /// Majority vote over all trees; ties go to the lowest class code.
    ///
    /// Returns `None` when any feature is no-data.
    pub fn classify_vector(&self, x: &[f64]) -> Result<Option<u32>> {
        if x.len() != self.band_names.len() {
            return Err(Error::InvalidParameter {
                name: "features",
                value: x.len().to_string(),
                reason: format!("model expects {} features", self.band_names.len()),
            });
        }
        if x.iter().any(|v| v.is_nan()) {
            return Ok(None);
        }
        self.vote(x).map(Some)
    }

    /// Classify every pixel of `stack`.
    ///
    /// Bands are looked up by the names the model was trained on, so extra
    /// bands in `stack` are ignored. Pixels with no-data in any used band
    /// are NaN in the output.
    pub fn classify_raster(&self, stack: &RasterStack) -> Result<Raster<f64>> {
        let bands = self
            .band_names
            .iter()
            .map(|name| stack.band(name))
            .collect::<Result<Vec<_>>>()?;
        let (rows, cols) = stack.shape();

        let classified: Vec<Vec<f64>> = (0..rows)
            .into_par_iter()
            .map(|row| {
                let mut row_data = vec![f64::NAN; cols];
                let mut x = vec![0.0; bands.len()];
                for (col, out) in row_data.iter_mut().enumerate() {
                    for (v, band) in x.iter_mut().zip(&bands) {
                        *v = unsafe { band.get_unchecked(row, col) };
                    }
                    if x.iter().any(|v| v.is_nan()) {
                        continue;
                    }
                    *out = f64::from(self.vote(&x)?);
                }
                Ok(row_data)
            })
            .collect::<Result<_>>()?;
        let data: Vec<f64> = classified.into_iter().flatten().collect();

        let mut output = Raster::on_grid(stack.grid(), f64::NAN);
        output.set_nodata(Some(f64::NAN));
        *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(output)
    }

    /// Importance per band plus forest summary.
    ///
    /// Importance is each band's summed impurity decrease divided by the
    /// total; a forest without a single split reports zeros.
    pub fn explain(&self) -> Explanation {
        let total: f64 = self.importance.iter().sum();
        let importance = self
            .band_names
            .iter()
            .zip(&self.importance)
            .map(|(band, &raw)| BandImportance {
                band: band.clone(),
                importance: if total > 0.0 { raw / total } else { 0.0 },
                raw,
            })
            .collect();
        Explanation {
            num_trees: self.trees.len(),
            importance,
            oob_error: self.oob_error,
        }
    }
}

fn out_of_bag_error(
    grown: &[GrownTree],
    features: &[&[f64]],
    labels: &[usize],
    num_classes: usize,
) -> Option<f64> {
    let mut scored = 0usize;
    let mut wrong = 0usize;
    let mut votes = vec![0u32; num_classes];
    for (i, x) in features.iter().enumerate() {
        votes.iter_mut().for_each(|v| *v = 0);
        let mut any = false;
        for g in grown.iter().filter(|g| !g.in_bag[i]) {
            votes[g.tree.vote(x)] += 1;
            any = true;
        }
        if any {
            scored += 1;
            if argmax_lowest(&votes) != labels[i] {
                wrong += 1;
            }
        }
    }
    (scored > 0).then(|| wrong as f64 / scored as f64)
}

/// Forest training stage
#[derive(Debug, Clone, Default)]
pub struct RandomForestTrainer;

impl Algorithm for RandomForestTrainer {
    type Input = (SampleSet, ClassSet);
    type Output = ForestModel;
    type Params = ForestParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "RandomForest"
    }

    fn description(&self) -> &'static str {
        "Train a seeded random forest on the training partition"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (samples, classes) = input;
        ForestModel::train(&samples, &classes, &params)
    }
}

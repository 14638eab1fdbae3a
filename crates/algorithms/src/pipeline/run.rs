//! Pipeline execution

use std::collections::BTreeMap;

use crate::classification::{assess, AccuracyReport, Explanation, ForestModel, ForestParams};
use crate::compositing::{composite, composite_windows, stack_images};
use crate::features::{build_feature_stack, FeatureSource};
use crate::imagery::add_indices;
use crate::rng::{derive_seed, stream};
use crate::sampling::{extract_samples, split_samples, SampleSet, SplitParams, SplitSummary};
use geofuse_core::raster::{Raster, RasterStack};
use geofuse_core::{Error, LabeledPointSet, RasterCollection, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{PipelineConfig, SourceConfig, SourceMode};

/// Data behind one configured source
#[derive(Debug, Clone)]
pub enum SourceData {
    /// Dated acquisitions to composite or stack
    Collection(RasterCollection),
    /// A single image used as is (elevation, land cover, ...)
    Image(RasterStack),
}

/// Data for a run, keyed by source name
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub sources: BTreeMap<String, SourceData>,
    pub points: LabeledPointSet,
}

impl PipelineInputs {
    pub fn new(points: LabeledPointSet) -> Self {
        Self {
            sources: BTreeMap::new(),
            points,
        }
    }

    pub fn with_source(mut self, name: impl Into<String>, data: SourceData) -> Self {
        self.sources.insert(name.into(), data);
        self
    }
}

/// Sample counts after extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub points: usize,
    pub samples: usize,
    pub dropped_outside: usize,
    pub nodata_dropped: usize,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub band_names: Vec<String>,
    /// One class code per pixel, NaN where any feature band is no-data
    pub classified: Raster<f64>,
    pub model: ForestModel,
    pub samples: SampleSet,
    pub extraction: ExtractionSummary,
    pub split: SplitSummary,
    pub accuracy: AccuracyReport,
    pub explanation: Explanation,
}

/// The classification pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shorthand for `Pipeline::new(config.clone()).execute(inputs)`
    pub fn run(inputs: &PipelineInputs, config: &PipelineConfig) -> Result<PipelineOutput> {
        Pipeline::new(config.clone()).execute(inputs)
    }

    /// Build one source's stack: composite or stack, rename, add indices, clip
    pub fn prepare_source(&self, source: &SourceConfig, data: &SourceData) -> Result<RasterStack> {
        let mut stack = match data {
            SourceData::Collection(collection) => {
                let dated;
                let collection = match source.period {
                    Some((start, end)) => {
                        dated = collection.filter_dates(start, end);
                        debug!(source = %source.name, scenes = dated.len(), "filtered by date");
                        &dated
                    }
                    None => collection,
                };
                let selected;
                let collection = if source.select.is_empty() {
                    collection
                } else {
                    selected = collection.select(&source.select)?;
                    &selected
                };
                match source.mode {
                    SourceMode::Composite if source.windows.is_empty() => {
                        composite(collection, source.reducer)?
                    }
                    SourceMode::Composite => {
                        composite_windows(collection, &source.windows, source.reducer)?
                    }
                    SourceMode::Stack => stack_images(collection)?,
                }
            }
            SourceData::Image(image) if source.select.is_empty() => image.clone(),
            SourceData::Image(image) => image.select(&source.select)?,
        };

        if !source.rename.is_empty() {
            stack.rename(&source.rename)?;
        }
        if !source.indices.is_empty() {
            stack = add_indices(&stack, &source.indices)?;
        }
        if let Some(aoi) = &self.config.aoi {
            stack = stack.clip(aoi);
        }
        Ok(stack)
    }

    /// Feature stack from every configured source, in configuration order
    pub fn feature_stack(&self, inputs: &PipelineInputs) -> Result<RasterStack> {
        let sources = self
            .config
            .sources
            .iter()
            .map(|source| {
                let data = inputs.sources.get(&source.name).ok_or_else(|| {
                    Error::InvalidParameter {
                        name: "sources",
                        value: source.name.clone(),
                        reason: format!(
                            "no input data (available: {})",
                            inputs.sources.keys().cloned().collect::<Vec<_>>().join(", ")
                        ),
                    }
                })?;
                let stack = self.prepare_source(source, data)?;
                info!(source = %source.name, bands = stack.len(), "prepared source");
                Ok(FeatureSource::new(source.name.clone(), stack))
            })
            .collect::<Result<Vec<_>>>()?;

        let stack = build_feature_stack(&sources, self.config.naming)?;
        info!(
            bands = stack.len(),
            rows = stack.rows(),
            cols = stack.cols(),
            "feature stack built"
        );
        Ok(stack)
    }

    /// Run every stage. Nothing is returned unless every stage succeeds.
    pub fn execute(&self, inputs: &PipelineInputs) -> Result<PipelineOutput> {
        let config = &self.config;
        let classes = config.class_set()?;
        let features = self.feature_stack(inputs)?;

        let extraction = extract_samples(&features, &inputs.points, &config.extract)?;
        let summary = ExtractionSummary {
            points: inputs.points.len(),
            samples: extraction.samples.len(),
            dropped_outside: extraction.dropped_outside,
            nodata_dropped: extraction.nodata_dropped,
        };
        info!(
            samples = summary.samples,
            dropped_outside = summary.dropped_outside,
            nodata_dropped = summary.nodata_dropped,
            "samples extracted"
        );

        let mut samples = extraction.samples;
        let split = split_samples(
            &mut samples,
            &SplitParams {
                seed: derive_seed(config.seed, stream::SPLIT),
                ..config.split
            },
        )?;
        info!(training = split.training, validation = split.validation, "samples split");

        let model = ForestModel::train(
            &samples,
            &classes,
            &ForestParams {
                seed: derive_seed(config.seed, stream::FOREST),
                ..config.forest
            },
        )?;
        let classified = model.classify_raster(&features)?;
        let accuracy = assess(&model, &samples)?;
        info!(
            training_accuracy = accuracy.training.accuracy(),
            validation_accuracy = accuracy.validation.accuracy(),
            "accuracy assessed"
        );

        Ok(PipelineOutput {
            band_names: features.band_names().to_vec(),
            classified,
            explanation: model.explain(),
            model,
            samples,
            extraction: summary,
            split,
            accuracy,
        })
    }
}

//! # GeoFuse Algorithms
//!
//! Stages of the multi-sensor classification pipeline.
//!
//! ## Modules
//!
//! - **compositing**: Pixel-wise temporal reduction per time window, image stacking
//! - **imagery**: Band math and spectral indices (ratio, NDVI, SAVI, NDWI, MSI, ENDVI)
//! - **features**: Co-registered feature stack assembly
//! - **sampling**: Sample extraction at ground points, seeded train/validation split
//! - **classification**: Random forest training and inference, accuracy assessment
//! - **pipeline**: End-to-end run driven by one configuration and one seed

pub(crate) mod maybe_rayon;

pub mod classification;
pub mod compositing;
pub mod features;
pub mod imagery;
pub mod pipeline;
pub mod reducer;
pub mod rng;
pub mod sampling;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        assess, AccuracyAssessor, AccuracyReport, ConfusionMatrix, Explanation, ForestModel,
        ForestParams, RandomForestTrainer,
    };
    pub use crate::compositing::{
        composite, composite_windows, reduce_bands, stack_images, TemporalCompositor, TimeWindow,
    };
    pub use crate::features::{build_feature_stack, BandNaming, FeatureSource, FeatureStackBuilder};
    pub use crate::imagery::{
        add_indices, compute_index, ndvi, BandMathEngine, IndexSpec, SpectralIndex,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineInputs, PipelineOutput, SourceData};
    pub use crate::reducer::Reducer;
    pub use crate::sampling::{
        extract_samples, split_samples, DatasetSplitter, ExtractParams, SampleExtractor, SampleSet,
        SplitParams, SplitStrategy,
    };
    pub use geofuse_core::prelude::*;
}

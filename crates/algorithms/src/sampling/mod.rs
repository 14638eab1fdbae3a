//! Training data preparation
//!
//! - **Extraction**: feature vectors sampled at ground reference points
//! - **Splitting**: seeded, reproducible training/validation partition

mod extract;
mod sample;
mod split;

pub use extract::{extract_samples, ExtractParams, Extraction, SampleExtractor};
pub use sample::{Partition, Sample, SampleSet};
pub use split::{split_samples, DatasetSplitter, SplitParams, SplitStrategy, SplitSummary};

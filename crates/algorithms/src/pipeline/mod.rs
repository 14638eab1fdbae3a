//! End-to-end classification run
//!
//! Sources → composites and indices → feature stack → samples → split →
//! forest → classified raster and accuracy report. Every random step is
//! seeded from [`PipelineConfig::seed`].

mod config;
mod run;

pub use config::{PipelineConfig, SourceConfig, SourceMode};
pub use run::{ExtractionSummary, Pipeline, PipelineInputs, PipelineOutput, SourceData};

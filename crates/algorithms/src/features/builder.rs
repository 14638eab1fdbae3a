//! Feature stack builder

use geofuse_core::raster::RasterStack;
use geofuse_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A named input to the feature stack
#[derive(Debug, Clone)]
pub struct FeatureSource {
    pub name: String,
    pub stack: RasterStack,
}

impl FeatureSource {
    pub fn new(name: impl Into<String>, stack: RasterStack) -> Self {
        Self {
            name: name.into(),
            stack,
        }
    }
}

/// How band names from different sources are kept unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandNaming {
    /// Keep names; a band whose name is taken becomes `{band}_{source index}`
    #[default]
    TagSourceIndex,
    /// Keep names; a band whose name is taken becomes `{band}_{source name}`
    TagSourceName,
    /// Every band becomes `{source name}_{band}`
    PrefixSource,
    /// Keep names and fail on any collision
    Strict,
}

impl BandNaming {
    fn resolve(self, band: &str, index: usize, source: &str, taken: &RasterStack) -> String {
        match self {
            BandNaming::PrefixSource => format!("{}_{}", source, band),
            BandNaming::Strict => band.to_string(),
            _ if !taken.contains(band) => band.to_string(),
            BandNaming::TagSourceIndex => format!("{}_{}", band, index),
            BandNaming::TagSourceName => format!("{}_{}", band, source),
        }
    }
}

/// Concatenate `sources` band-wise in the given order.
///
/// All sources are checked against the first one's grid before any band is
/// copied; a mismatch fails with [`Error::Alignment`] naming the source.
/// The resulting band order depends only on the inputs.
pub fn build_feature_stack(sources: &[FeatureSource], naming: BandNaming) -> Result<RasterStack> {
    let reference = sources.first().ok_or_else(|| Error::InvalidParameter {
        name: "sources",
        value: "0".into(),
        reason: "a feature stack needs at least one source".into(),
    })?;

    for source in &sources[1..] {
        reference
            .stack
            .grid()
            .check_aligned(source.stack.grid(), &source.name)?;
    }

    let mut out = RasterStack::new(reference.stack.grid().clone());
    for (index, source) in sources.iter().enumerate() {
        for (band_name, band) in source.stack.iter() {
            let name = naming.resolve(band_name, index, &source.name, &out);
            out.add_band(name, band.clone())?;
        }
        debug!(source = %source.name, bands = source.stack.len(), "stacked source");
    }
    Ok(out)
}

/// Incremental builder over [`build_feature_stack`]
#[derive(Debug, Clone, Default)]
pub struct FeatureStackBuilder {
    sources: Vec<FeatureSource>,
    naming: BandNaming,
}

impl FeatureStackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naming(mut self, naming: BandNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn source(mut self, name: impl Into<String>, stack: RasterStack) -> Self {
        self.sources.push(FeatureSource::new(name, stack));
        self
    }

    pub fn build(&self) -> Result<RasterStack> {
        build_feature_stack(&self.sources, self.naming)
    }
}

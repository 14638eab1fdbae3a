//! Run configuration

use crate::classification::ForestParams;
use crate::compositing::TimeWindow;
use crate::features::BandNaming;
use crate::imagery::IndexSpec;
use crate::reducer::Reducer;
use crate::sampling::{ExtractParams, SplitParams};
use chrono::NaiveDate;
use geofuse_core::io::ExportOptions;
use geofuse_core::{ClassDef, ClassSet, Extent, Result};
use serde::{Deserialize, Serialize};

/// How a dated collection becomes a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Pixel-wise reduction per time window
    #[default]
    Composite,
    /// Every acquisition's bands side by side, repeats tagged `_1`, `_2`, ...
    Stack,
}

/// One input to the feature stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Key into [`PipelineInputs::sources`](super::PipelineInputs)
    pub name: String,
    pub mode: SourceMode,
    /// Inclusive `[start, end]` acquisition dates; `None` keeps every scene
    pub period: Option<(NaiveDate, NaiveDate)>,
    /// Bands to keep before compositing; empty keeps all
    pub select: Vec<String>,
    /// Composite windows; empty composites the whole collection
    pub windows: Vec<TimeWindow>,
    pub reducer: Reducer,
    /// `(old, new)` band renames applied after compositing
    pub rename: Vec<(String, String)>,
    /// Index bands appended after renaming
    pub indices: Vec<IndexSpec>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            mode: SourceMode::Composite,
            period: None,
            select: Vec::new(),
            windows: Vec::new(),
            reducer: Reducer::Median,
            rename: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl SourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Everything a run needs besides the data.
///
/// The `seed` fields of `split` and `forest` are ignored: both stages get
/// seeds derived from the top-level `seed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    pub naming: BandNaming,
    /// Clip every source to this extent before stacking
    pub aoi: Option<Extent>,
    pub classes: Vec<ClassDef>,
    pub extract: ExtractParams,
    pub split: SplitParams,
    pub forest: ForestParams,
    pub export: ExportOptions,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            naming: BandNaming::default(),
            aoi: None,
            classes: Vec::new(),
            extract: ExtractParams::default(),
            split: SplitParams::default(),
            forest: ForestParams::default(),
            export: ExportOptions::default(),
            seed: 0,
        }
    }
}

impl PipelineConfig {
    /// Validated class enumeration
    pub fn class_set(&self) -> Result<ClassSet> {
        ClassSet::new(self.classes.iter().map(|c| (c.code, c.name.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::SpectralIndex;

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "sources": [
                {"name": "s1", "windows": [{"id": "a", "first_day": 1, "last_day": 366}],
                 "rename": [["VV_a", "s1vva"]],
                 "indices": [{"index": "ratio", "bands": ["s1vva", "VH_a"]}]},
                {"name": "s2", "mode": "stack"}
            ],
            "classes": [{"code": 1, "name": "Flood"}, {"code": 2, "name": "Fire"}],
            "extract": {"label_field": "Incident_C", "scale": 10.0},
            "seed": 42
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].reducer, Reducer::Median);
        assert_eq!(config.sources[0].indices[0].index, SpectralIndex::Ratio);
        assert_eq!(config.sources[1].mode, SourceMode::Stack);
        assert_eq!(config.extract.label_field, "Incident_C");
        assert_eq!(config.split.ratio, 0.5);
        assert_eq!(config.forest.num_trees, 800);
        assert_eq!(config.class_set().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_classes_rejected() {
        assert!(PipelineConfig::default().class_set().is_err());
    }
}

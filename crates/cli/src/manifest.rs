//! Run file: where the input rasters and points live, the pipeline
//! configuration, and where to write results.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use geofuse_algorithms::pipeline::{PipelineConfig, PipelineInputs, SourceData};
use geofuse_core::io::read_band;
use geofuse_core::{
    AttributeValue, GroundPoint, LabeledPointSet, Raster, RasterCollection, RasterStack,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct RunFile {
    pub inputs: InputManifest,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub output: OutputPaths,
}

#[derive(Debug, Deserialize)]
pub struct InputManifest {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionManifest>,
    /// Single-date sources, bands in stack order
    #[serde(default)]
    pub images: BTreeMap<String, Vec<BandFile>>,
    pub points: PointsManifest,
}

#[derive(Debug, Deserialize)]
pub struct BandFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct CollectionManifest {
    /// Band schema shared by every scene
    pub bands: Vec<String>,
    pub scenes: Vec<SceneManifest>,
}

#[derive(Debug, Deserialize)]
pub struct SceneManifest {
    pub date: NaiveDate,
    /// One GeoTIFF per schema band
    pub files: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct PointsManifest {
    pub path: PathBuf,
    #[serde(default = "default_x")]
    pub x: String,
    #[serde(default = "default_y")]
    pub y: String,
    #[serde(default)]
    pub id: Option<String>,
}

fn default_x() -> String {
    "x".into()
}

fn default_y() -> String {
    "y".into()
}

#[derive(Debug, Deserialize)]
pub struct OutputPaths {
    pub classified: PathBuf,
    pub report: PathBuf,
    #[serde(default)]
    pub model: Option<PathBuf>,
}

impl RunFile {
    /// Parse a run file; relative paths are resolved against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file {}", path.display()))?;
        let mut run: RunFile = serde_json::from_str(&text)
            .with_context(|| format!("Invalid run file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        run.resolve_paths(base);
        Ok(run)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for collection in self.inputs.collections.values_mut() {
            for scene in &mut collection.scenes {
                for path in scene.files.values_mut() {
                    fix(path);
                }
            }
        }
        for bands in self.inputs.images.values_mut() {
            for band in bands.iter_mut() {
                fix(&mut band.path);
            }
        }
        fix(&mut self.inputs.points.path);
        fix(&mut self.output.classified);
        fix(&mut self.output.report);
        if let Some(model) = &mut self.output.model {
            fix(model);
        }
    }

    /// Read every raster and the point table
    pub fn read_inputs(&self) -> Result<PipelineInputs> {
        let mut inputs = PipelineInputs::new(read_points(&self.inputs.points)?);
        for (name, manifest) in &self.inputs.collections {
            let collection = read_collection(name, manifest)?;
            info!("Collection {}: {} scenes", name, collection.len());
            inputs.sources.insert(name.clone(), SourceData::Collection(collection));
        }
        for (name, bands) in &self.inputs.images {
            let stack = read_stack(bands.iter().map(|b| (b.name.as_str(), b.path.as_path())))
                .with_context(|| format!("Failed to read image source '{}'", name))?;
            inputs.sources.insert(name.clone(), SourceData::Image(stack));
        }
        Ok(inputs)
    }
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let raster = read_band(path).with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Read {} ({} x {})", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

fn read_stack<'a>(bands: impl IntoIterator<Item = (&'a str, &'a Path)>) -> Result<RasterStack> {
    let bands = bands
        .into_iter()
        .map(|(name, path)| Ok((name, read_raster(path)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(RasterStack::from_bands(bands)?)
}

fn read_collection(name: &str, manifest: &CollectionManifest) -> Result<RasterCollection> {
    let mut scenes = Vec::with_capacity(manifest.scenes.len());
    for scene in &manifest.scenes {
        let files = manifest
            .bands
            .iter()
            .map(|band| match scene.files.get(band) {
                Some(path) => Ok((band.as_str(), path.as_path())),
                None => bail!("Scene {} of '{}' has no file for band {}", scene.date, name, band),
            })
            .collect::<Result<Vec<_>>>()?;
        let stack = read_stack(files)
            .with_context(|| format!("Failed to read scene {} of '{}'", scene.date, name))?;
        scenes.push((scene.date, stack));
    }

    let Some((_, first)) = scenes.first() else {
        bail!("Collection '{}' has no scenes", name);
    };
    let mut collection = RasterCollection::new(manifest.bands.iter().cloned(), first.grid().clone());
    for (date, stack) in scenes {
        collection.push(date, stack)?;
    }
    Ok(collection)
}

/// Points from a CSV table; every column besides the coordinates becomes an attribute
fn read_points(manifest: &PointsManifest) -> Result<LabeledPointSet> {
    let mut reader = csv::Reader::from_path(&manifest.path)
        .with_context(|| format!("Failed to open points {}", manifest.path.display()))?;
    let headers = reader.headers()?.clone();
    let column = |field: &str| {
        headers
            .iter()
            .position(|h| h == field)
            .with_context(|| format!("Points table has no '{}' column", field))
    };
    let (xi, yi) = (column(&manifest.x)?, column(&manifest.y)?);
    let id_index = manifest.id.as_deref().map(column).transpose()?;

    let mut points = LabeledPointSet::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let coord = |i: usize| -> Result<f64> {
            let raw = record.get(i).unwrap_or("");
            raw.trim()
                .parse()
                .with_context(|| format!("Row {}: bad coordinate '{}'", line + 1, raw))
        };
        let mut point = GroundPoint::new(coord(xi)?, coord(yi)?);
        for (i, (header, value)) in headers.iter().zip(record.iter()).enumerate() {
            if i == xi || i == yi {
                continue;
            }
            point.set_property(header, AttributeValue::parse(value));
        }
        point.id = id_index.and_then(|i| record.get(i)).map(str::to_string);
        points.push(point);
    }
    info!("Points: {}", points.len());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geofuse-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = scratch_dir("runfile");
        let run_path = dir.join("run.json");
        std::fs::write(
            &run_path,
            r#"{
                "inputs": {
                    "images": { "dem": [ { "name": "elevation", "path": "dem.tif" } ] },
                    "points": { "path": "/data/points.csv", "x": "lon", "y": "lat" }
                },
                "pipeline": { "seed": 7 },
                "output": { "classified": "out/classified.tif", "report": "out/report.json" }
            }"#,
        )
        .unwrap();

        let run = RunFile::load(&run_path).unwrap();
        assert_eq!(run.inputs.images["dem"][0].path, dir.join("dem.tif"));
        assert_eq!(run.inputs.points.path, PathBuf::from("/data/points.csv"));
        assert_eq!(run.inputs.points.x, "lon");
        assert_eq!(run.output.classified, dir.join("out/classified.tif"));
        assert!(run.output.model.is_none());
        assert_eq!(run.pipeline.seed, 7);
    }

    #[test]
    fn test_read_points_keeps_attributes() {
        let dir = scratch_dir("points");
        let path = dir.join("points.csv");
        std::fs::write(&path, "fid,x,y,Incident_C\np1,105.0,35.0,3\np2,115.5,25.0,1\n").unwrap();

        let manifest = PointsManifest {
            path,
            x: "x".into(),
            y: "y".into(),
            id: Some("fid".into()),
        };
        let points: Vec<GroundPoint> = read_points(&manifest).unwrap().into_iter().collect();
        assert_eq!(points.len(), 2);
        assert_eq!((points[1].x(), points[1].y()), (115.5, 25.0));
        assert_eq!(points[0].label("Incident_C"), Some(3));
        assert_eq!(points[0].id.as_deref(), Some("p1"));
        assert!(points[0].get_property("x").is_none());
    }

    #[test]
    fn test_read_points_missing_column() {
        let dir = scratch_dir("badpoints");
        let path = dir.join("points.csv");
        std::fs::write(&path, "east,north,class\n1,2,1\n").unwrap();

        let manifest = PointsManifest {
            path,
            x: "x".into(),
            y: "y".into(),
            id: None,
        };
        let err = read_points(&manifest).unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }
}

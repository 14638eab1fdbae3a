//! Feature extraction at ground reference points

use crate::maybe_rayon::*;
use crate::reducer::Reducer;
use geofuse_core::raster::RasterStack;
use geofuse_core::{Algorithm, Error, GroundPoint, LabeledPointSet, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Sample, SampleSet};

/// Parameters for [`SampleExtractor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractParams {
    /// Point attribute holding the class code
    pub label_field: String,
    /// Side of the square footprint in map units; at or below the cell size
    /// the nearest pixel is used
    pub scale: f64,
    /// Aggregate over the footprint when it spans several pixels
    pub reducer: Reducer,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            label_field: "class".into(),
            scale: 0.0,
            reducer: Reducer::Mean,
        }
    }
}

/// Samples plus the points that produced none
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub samples: SampleSet,
    /// Points outside the stack extent
    pub dropped_outside: usize,
    /// Points whose footprint had no data in at least one band
    pub nodata_dropped: usize,
}

impl Extraction {
    pub fn dropped(&self) -> usize {
        self.dropped_outside + self.nodata_dropped
    }
}

/// Extraction stage
#[derive(Debug, Clone, Default)]
pub struct SampleExtractor;

impl Algorithm for SampleExtractor {
    type Input = (RasterStack, LabeledPointSet);
    type Output = Extraction;
    type Params = ExtractParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SampleExtractor"
    }

    fn description(&self) -> &'static str {
        "Sample feature stack values under labeled ground points"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (stack, points) = input;
        extract_samples(&stack, &points, &params)
    }
}

enum Outcome {
    Kept(Sample),
    Outside,
    NoData,
}

/// Pixel index range whose centers fall inside `[center - radius, center + radius]`
fn footprint_range(center: f64, radius: f64, len: usize) -> std::ops::Range<usize> {
    let lo = (center - radius - 0.5).ceil().max(0.0) as usize;
    let hi = ((center + radius - 0.5).floor() + 1.0).clamp(0.0, len as f64) as usize;
    lo.min(hi)..hi
}

fn extract_point(
    stack: &RasterStack,
    id: usize,
    point: &GroundPoint,
    label: u32,
    params: &ExtractParams,
) -> Outcome {
    let (rows, cols) = stack.shape();
    let (col_f, row_f) = stack.transform().geo_to_pixel(point.x(), point.y());
    if !(col_f >= 0.0 && row_f >= 0.0 && col_f < cols as f64 && row_f < rows as f64) {
        return Outcome::Outside;
    }

    let transform = stack.transform();
    let features = if params.scale <= transform.cell_size() {
        match stack.pixel(row_f.floor() as usize, col_f.floor() as usize) {
            Some(v) => v,
            None => return Outcome::Outside,
        }
    } else {
        let half = params.scale / 2.0;
        let row_range = footprint_range(row_f, half / transform.pixel_height.abs(), rows);
        let col_range = footprint_range(col_f, half / transform.pixel_width.abs(), cols);
        let mut buf = Vec::with_capacity(row_range.len() * col_range.len());
        stack
            .iter()
            .map(|(_, band)| {
                buf.clear();
                let data = band.data();
                for r in row_range.clone() {
                    for c in col_range.clone() {
                        buf.push(data[(r, c)]);
                    }
                }
                params.reducer.reduce(&mut buf)
            })
            .collect()
    };

    if features.iter().any(|v| v.is_nan()) {
        return Outcome::NoData;
    }
    Outcome::Kept(Sample::new(id, features, label))
}

/// Sample `stack` at every point of `points`.
///
/// Samples keep the input order of their points and carry the point index
/// as their id. Points outside the stack, or whose footprint is no-data in
/// any band, are dropped and counted. A point without a usable class code
/// under `label_field` is an error.
pub fn extract_samples(
    stack: &RasterStack,
    points: &LabeledPointSet,
    params: &ExtractParams,
) -> Result<Extraction> {
    if !(params.scale >= 0.0) || !params.scale.is_finite() {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: params.scale.to_string(),
            reason: "extraction scale must be a finite, non-negative length".into(),
        });
    }

    let labels = points
        .iter()
        .enumerate()
        .map(|(index, p)| {
            p.label(&params.label_field)
                .ok_or_else(|| Error::MissingAttribute {
                    index,
                    field: params.label_field.clone(),
                })
        })
        .collect::<Result<Vec<u32>>>()?;

    let outcomes: Vec<Outcome> = points
        .points
        .par_iter()
        .zip(labels.par_iter())
        .enumerate()
        .map(|(id, (point, &label))| extract_point(stack, id, point, label, params))
        .collect();

    let mut out = Extraction {
        samples: SampleSet::new(stack.band_names().to_vec()),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Kept(sample) => out.samples.push(sample)?,
            Outcome::Outside => out.dropped_outside += 1,
            Outcome::NoData => out.nodata_dropped += 1,
        }
    }

    debug!(
        samples = out.samples.len(),
        outside = out.dropped_outside,
        nodata = out.nodata_dropped,
        "extracted samples"
    );
    Ok(out)
}

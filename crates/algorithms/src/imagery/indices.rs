//! Spectral and backscatter indices
//!
//! Fixed-form pixel-wise indices over two or three bands. Each index is a
//! pure function of its inputs; zero denominators and no-data inputs give
//! NaN for that pixel.

use serde::{Deserialize, Serialize};
use geofuse_core::raster::{Raster, RasterStack};
use geofuse_core::{Algorithm, Error, Result};

use super::band_math::{band_math_binary, band_math_n, safe_div, BandMathOp};

/// Enumeration of supported indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    /// Backscatter difference `a - b` (a ratio when inputs are in dB)
    Ratio,
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Soil Adjusted Vegetation Index
    Savi,
    /// Normalized Difference Water Index (NIR/SWIR form)
    Ndwi,
    /// Moisture Stress Index
    Msi,
    /// Enhanced Normalized Difference Vegetation Index
    Endvi,
}

impl SpectralIndex {
    /// Number of input bands
    pub fn arity(self) -> usize {
        match self {
            SpectralIndex::Ratio
            | SpectralIndex::Ndvi
            | SpectralIndex::Savi
            | SpectralIndex::Ndwi => 2,
            SpectralIndex::Msi | SpectralIndex::Endvi => 3,
        }
    }

    /// Output band name used when none is given
    pub fn default_name(self) -> &'static str {
        match self {
            SpectralIndex::Ratio => "ratio",
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Savi => "SAVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Msi => "MSI",
            SpectralIndex::Endvi => "ENDVI",
        }
    }
}

// ---------------------------------------------------------------------------
// Index functions
// ---------------------------------------------------------------------------

/// Log-scale backscatter ratio
///
/// `ratio = a - b`
///
/// With VV and VH in dB this is the VV/VH ratio.
pub fn ratio(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_binary(a, b, BandMathOp::Subtract)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_n(&[nir, red], |v| safe_div(v[0] - v[1], v[0] + v[1]))
}

/// Parameters for SAVI
#[derive(Debug, Clone, Copy)]
pub struct SaviParams {
    /// Soil brightness correction factor (0 = dense vegetation, 1 = sparse).
    /// Default: 0.5
    pub l_factor: f64,
}

impl Default for SaviParams {
    fn default() -> Self {
        Self { l_factor: 0.5 }
    }
}

/// Soil Adjusted Vegetation Index (Huete, 1988)
///
/// `SAVI = (1 + L) * (NIR - Red) / (NIR + Red + L)`
pub fn savi(nir: &Raster<f64>, red: &Raster<f64>, params: SaviParams) -> Result<Raster<f64>> {
    let l = params.l_factor;
    band_math_n(&[nir, red], move |v| {
        (1.0 + l) * safe_div(v[0] - v[1], v[0] + v[1] + l)
    })
}

/// Normalized Difference Water Index (Gao, 1996)
///
/// `NDWI = (NIR - SWIR) / (NIR + SWIR)`
pub fn ndwi(nir: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_n(&[nir, swir], |v| safe_div(v[0] - v[1], v[0] + v[1]))
}

/// Moisture Stress Index
///
/// `MSI = (NIR - Red) / (SWIR1 + Red)`
pub fn msi(nir: &Raster<f64>, red: &Raster<f64>, swir1: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_n(&[nir, red, swir1], |v| safe_div(v[0] - v[1], v[2] + v[1]))
}

/// Enhanced Normalized Difference Vegetation Index
///
/// `ENDVI = (NIR + Red - 2 * Blue) / (NIR + Red + 2 * Blue)`
pub fn endvi(nir: &Raster<f64>, red: &Raster<f64>, blue: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_n(&[nir, red, blue], |v| {
        safe_div(v[0] + v[1] - 2.0 * v[2], v[0] + v[1] + 2.0 * v[2])
    })
}

// ---------------------------------------------------------------------------
// Stack-level evaluation
// ---------------------------------------------------------------------------

/// One index to derive from named bands of a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub index: SpectralIndex,
    /// Input band names in the order of the index signature
    pub bands: Vec<String>,
    /// Output band name, defaults to the index's conventional name
    #[serde(default)]
    pub name: Option<String>,
    /// SAVI soil factor
    #[serde(default)]
    pub l_factor: Option<f64>,
}

impl IndexSpec {
    pub fn new<S: Into<String>>(index: SpectralIndex, bands: impl IntoIterator<Item = S>) -> Self {
        Self {
            index,
            bands: bands.into_iter().map(Into::into).collect(),
            name: None,
            l_factor: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn output_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.index.default_name())
    }
}

/// Evaluate one index against the bands of `stack`
pub fn compute_index(stack: &RasterStack, spec: &IndexSpec) -> Result<Raster<f64>> {
    if spec.bands.len() != spec.index.arity() {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: spec.bands.join(","),
            reason: format!(
                "{:?} takes {} bands, got {}",
                spec.index,
                spec.index.arity(),
                spec.bands.len()
            ),
        });
    }

    let inputs = spec
        .bands
        .iter()
        .map(|name| stack.band(name))
        .collect::<Result<Vec<_>>>()?;

    match spec.index {
        SpectralIndex::Ratio => ratio(inputs[0], inputs[1]),
        SpectralIndex::Ndvi => ndvi(inputs[0], inputs[1]),
        SpectralIndex::Savi => {
            let params = spec
                .l_factor
                .map_or_else(SaviParams::default, |l_factor| SaviParams { l_factor });
            savi(inputs[0], inputs[1], params)
        }
        SpectralIndex::Ndwi => ndwi(inputs[0], inputs[1]),
        SpectralIndex::Msi => msi(inputs[0], inputs[1], inputs[2]),
        SpectralIndex::Endvi => endvi(inputs[0], inputs[1], inputs[2]),
    }
}

/// Copy of `stack` with every index in `specs` appended, in order.
///
/// Later specs may reference bands produced by earlier ones.
pub fn add_indices(stack: &RasterStack, specs: &[IndexSpec]) -> Result<RasterStack> {
    let mut out = stack.clone();
    for spec in specs {
        let band = compute_index(&out, spec)?;
        out.add_band(spec.output_name(), band)?;
    }
    Ok(out)
}

/// Band math stage: derives index bands and appends them to the input stack
#[derive(Debug, Clone, Default)]
pub struct BandMathEngine;

impl Algorithm for BandMathEngine {
    type Input = RasterStack;
    type Output = RasterStack;
    type Params = Vec<IndexSpec>;
    type Error = Error;

    fn name(&self) -> &'static str {
        "BandMathEngine"
    }

    fn description(&self) -> &'static str {
        "Derive spectral and backscatter indices from named bands"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        add_indices(&input, &params)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

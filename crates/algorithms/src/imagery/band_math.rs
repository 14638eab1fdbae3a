//! Band math operations
//!
//! Pixel-wise raster algebra over co-registered bands. A no-data cell in any
//! input yields NaN in the output; so does any non-finite result, which is
//! how division by zero surfaces.

use ndarray::Array2;
use crate::maybe_rayon::*;
use geofuse_core::raster::Raster;
use geofuse_core::{Error, Result};

/// Denominators with magnitude below this are treated as zero
pub const DIVISION_EPSILON: f64 = 1e-10;

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BandMathOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BandMathOp::Add => a + b,
            BandMathOp::Subtract => a - b,
            BandMathOp::Multiply => a * b,
            BandMathOp::Divide => safe_div(a, b),
        }
    }
}

/// `num / den`, NaN when `den` is (numerically) zero
#[inline]
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() < DIVISION_EPSILON {
        f64::NAN
    } else {
        num / den
    }
}

/// Apply a binary operation between two rasters element-wise.
///
/// Both rasters must have the same dimensions. Nodata in either input
/// produces nodata in the output.
pub fn band_math_binary(a: &Raster<f64>, b: &Raster<f64>, op: BandMathOp) -> Result<Raster<f64>> {
    band_math_n(&[a, b], |v| op.apply(v[0], v[1]))
}

/// Apply `f` to the pixel values of `bands` at every cell.
///
/// `f` receives one value per input band, in input order. It must be a pure
/// function of its arguments; rows are evaluated in parallel.
///
/// # Example
/// ```ignore
/// let evi2 = band_math_n(&[&nir, &red], |v| 2.5 * (v[0] - v[1]) / (v[0] + 2.4 * v[1] + 1.0))?;
/// ```
pub fn band_math_n<F>(bands: &[&Raster<f64>], f: F) -> Result<Raster<f64>>
where
    F: Fn(&[f64]) -> f64 + Sync + Send,
{
    let first = bands.first().ok_or_else(|| Error::InvalidParameter {
        name: "bands",
        value: "0".into(),
        reason: "band math needs at least one input band".into(),
    })?;
    for other in &bands[1..] {
        if other.shape() != first.shape() {
            return Err(Error::SizeMismatch {
                er: first.rows(),
                ec: first.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
    }

    let (rows, cols) = first.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values = vec![0.0; bands.len()];
            'cells: for (col, out) in row_data.iter_mut().enumerate() {
                for (slot, band) in values.iter_mut().zip(bands) {
                    let v = unsafe { band.get_unchecked(row, col) };
                    if band.is_nodata(v) {
                        continue 'cells;
                    }
                    *slot = v;
                }
                let result = f(&values);
                if result.is_finite() {
                    *out = result;
                }
            }
            row_data
        })
        .collect();

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

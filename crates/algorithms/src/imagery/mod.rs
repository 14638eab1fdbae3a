//! Imagery analysis algorithms
//!
//! Band math over co-registered bands and the fixed index set used to
//! build classification features:
//! - Backscatter ratio (VV - VH in dB)
//! - NDVI, SAVI, NDWI, MSI, ENDVI from optical reflectance

mod band_math;
mod indices;

pub use band_math::{band_math_binary, band_math_n, safe_div, BandMathOp, DIVISION_EPSILON};
pub use indices::{
    add_indices, compute_index, endvi, msi, ndvi, ndwi, ratio, savi, BandMathEngine, IndexSpec,
    SaviParams, SpectralIndex,
};

//! Grid descriptions used for alignment checks

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform};
use serde::{Deserialize, Serialize};

/// Shape and georeferencing shared by every band of a stack.
///
/// Two rasters are aligned when their `GridSpec`s have the same shape,
/// the same pixel lattice (origin and resolution) and equivalent CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform, crs: Option<CRS>) -> Self {
        Self { rows, cols, transform, crs }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn extent(&self) -> Extent {
        Extent::from_bounds(self.transform.bounds(self.cols, self.rows))
    }

    /// Describe the first difference between two grids, `None` when aligned
    pub fn mismatch(&self, other: &GridSpec) -> Option<String> {
        if !self.transform.same_resolution(&other.transform) {
            return Some(format!(
                "resolution {}x{} does not match {}x{}",
                other.transform.pixel_width,
                other.transform.pixel_height,
                self.transform.pixel_width,
                self.transform.pixel_height
            ));
        }
        if self.shape() != other.shape() {
            return Some(format!(
                "shape {}x{} does not match {}x{}",
                other.rows, other.cols, self.rows, self.cols
            ));
        }
        if !self.transform.same_grid(&other.transform) {
            return Some(format!(
                "origin ({}, {}) does not match ({}, {})",
                other.transform.origin_x,
                other.transform.origin_y,
                self.transform.origin_x,
                self.transform.origin_y
            ));
        }
        match (&self.crs, &other.crs) {
            (None, None) => None,
            (Some(a), Some(b)) if a.is_equivalent(b) => None,
            (a, b) => Some(format!(
                "CRS {} does not match {}",
                describe_crs(b.as_ref()),
                describe_crs(a.as_ref())
            )),
        }
    }

    /// Fail with an alignment error naming `source_name` when grids differ
    pub fn check_aligned(&self, other: &GridSpec, source_name: &str) -> Result<()> {
        match self.mismatch(other) {
            None => Ok(()),
            Some(reason) => Err(Error::Alignment {
                source_name: source_name.to_string(),
                reason,
            }),
        }
    }
}

fn describe_crs(crs: Option<&CRS>) -> String {
    crs.map_or_else(|| "none".to_string(), |c| c.identifier())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cell: f64) -> GridSpec {
        GridSpec::new(10, 10, GeoTransform::new(0.0, 100.0, cell, -cell), Some(CRS::from_epsg(32632)))
    }

    #[test]
    fn test_identical_grids_align() {
        assert!(grid(10.0).check_aligned(&grid(10.0), "s2").is_ok());
    }

    #[test]
    fn test_resolution_mismatch_names_source() {
        let err = grid(10.0).check_aligned(&grid(20.0), "s1").unwrap_err();
        match err {
            Error::Alignment { source_name, reason } => {
                assert_eq!(source_name, "s1");
                assert!(reason.contains("resolution"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_crs_mismatch() {
        let mut other = grid(10.0);
        other.crs = Some(CRS::wgs84());
        assert!(grid(10.0).mismatch(&other).unwrap().contains("CRS"));
    }
}

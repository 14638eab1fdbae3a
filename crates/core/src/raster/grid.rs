//! Single-band georeferenced grid

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, GridSpec, RasterElement};
use ndarray::Array2;

/// One band of cells on a georeferenced grid.
///
/// Cells are stored row-major as `(row, col)`. Stacks of named bands are
/// held by [`RasterStack`](crate::RasterStack), which normalizes every band
/// to `Raster<f64>` with NaN as no-data.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Zero-filled raster with an identity transform
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Raster from row-major values
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        Array2::from_shape_vec((rows, cols), data)
            .map(Self::from_array)
            .map_err(|_| Error::InvalidDimensions {
                width: cols,
                height: rows,
            })
    }

    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Raster covering `grid`, every cell set to `value`
    pub fn on_grid(grid: &GridSpec, value: T) -> Self {
        Self {
            data: Array2::from_elem(grid.shape(), value),
            transform: grid.transform,
            crs: grid.crs.clone(),
            nodata: None,
        }
    }

    /// Zero-filled raster sharing this raster's transform and CRS
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    /// # Safety
    /// `row < self.rows()` and `col < self.cols()`
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let err = self.out_of_bounds(row, col);
        let cell = self.data.get_mut((row, col)).ok_or(err)?;
        *cell = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell width in map units
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    pub fn extent(&self) -> Extent {
        Extent::from_bounds(self.transform.bounds(self.cols(), self.rows()))
    }

    /// Shape, transform and CRS of this raster
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::new(self.rows(), self.cols(), self.transform, self.crs.clone())
    }

    /// Map coordinates of the center of `(col, row)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional `(col, row)` of a map coordinate
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Min, max and mean over the valid cells
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut stats = RasterStatistics {
            min: None,
            max: None,
            mean: None,
            valid_count: 0,
            nodata_count: 0,
        };
        let mut sum = 0.0;
        for &value in self.data.iter() {
            let Some(v) = value.to_f64().filter(|_| !self.is_nodata(value)) else {
                stats.nodata_count += 1;
                continue;
            };
            if stats.min.map_or(true, |m| value < m) {
                stats.min = Some(value);
            }
            if stats.max.map_or(true, |m| value > m) {
                stats.max = Some(value);
            }
            sum += v;
            stats.valid_count += 1;
        }
        stats.mean = (stats.valid_count > 0).then(|| sum / stats.valid_count as f64);
        stats
    }
}

/// Summary of the valid cells of a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

//! Multi-band raster stacks
//!
//! A [`RasterStack`] is an ordered set of uniquely named `f64` bands that all
//! live on one [`GridSpec`]. Every band stored in a stack uses NaN as its
//! no-data marker: declared no-data values are rewritten to NaN on insertion,
//! so downstream pixel arithmetic only has to test `is_nan()`.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, GridSpec, Raster};
use ndarray::Array2;

/// Ordered, uniquely named bands sharing one grid.
#[derive(Debug, Clone)]
pub struct RasterStack {
    grid: GridSpec,
    names: Vec<String>,
    bands: Vec<Raster<f64>>,
}

impl RasterStack {
    /// Create an empty stack on `grid`
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            names: Vec::new(),
            bands: Vec::new(),
        }
    }

    /// Build a stack from `(name, band)` pairs; the first band defines the grid.
    pub fn from_bands<I, S>(bands: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Raster<f64>)>,
        S: Into<String>,
    {
        let mut iter = bands.into_iter();
        let (name, first) = iter.next().ok_or_else(|| Error::InvalidParameter {
            name: "bands",
            value: "0".into(),
            reason: "a stack needs at least one band to define its grid".into(),
        })?;

        let mut stack = Self::new(first.grid_spec());
        stack.add_band(name, first)?;
        for (name, band) in iter {
            stack.add_band(name, band)?;
        }
        Ok(stack)
    }

    // Grid

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn cols(&self) -> usize {
        self.grid.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.grid.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.grid.crs.as_ref()
    }

    pub fn extent(&self) -> Extent {
        self.grid.extent()
    }

    // Bands

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Whether the stack has no bands
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Whether the stack covers no pixels
    pub fn has_no_pixels(&self) -> bool {
        self.grid.rows == 0 || self.grid.cols == 0
    }

    pub fn band_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.index_of(name)
            .map(|i| &self.bands[i])
            .ok_or_else(|| Error::missing_band(name, &self.names))
    }

    /// Iterate over `(name, band)` in stack order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.names.iter().map(String::as_str).zip(self.bands.iter())
    }

    /// Append a band.
    ///
    /// Fails with [`Error::DuplicateBand`] when the name is taken or when the
    /// band's grid differs from the stack grid.
    pub fn add_band(&mut self, name: impl Into<String>, band: Raster<f64>) -> Result<()> {
        let name = name.into();
        self.check_insert(&name, &band.grid_spec())?;
        self.names.push(name);
        self.bands.push(normalize_nodata(band));
        Ok(())
    }

    /// Builder-style [`add_band`](Self::add_band)
    pub fn with_band(mut self, name: impl Into<String>, band: Raster<f64>) -> Result<Self> {
        self.add_band(name, band)?;
        Ok(self)
    }

    /// Append every band of `other`, keeping its names.
    ///
    /// Nothing is added unless all bands can be added.
    pub fn add_bands(&mut self, other: &RasterStack) -> Result<()> {
        for (i, name) in other.names.iter().enumerate() {
            self.check_insert(name, &other.grid)?;
            if other.names[..i].contains(name) {
                return Err(duplicate(name));
            }
        }
        self.names.extend(other.names.iter().cloned());
        self.bands.extend(other.bands.iter().cloned());
        Ok(())
    }

    fn check_insert(&self, name: &str, grid: &GridSpec) -> Result<()> {
        if self.contains(name) {
            return Err(duplicate(name));
        }
        if let Some(reason) = self.grid.mismatch(grid) {
            return Err(Error::DuplicateBand {
                name: name.to_string(),
                reason: format!("band grid differs from stack: {}", reason),
            });
        }
        Ok(())
    }

    /// Stack restricted to `names`, in the requested order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<RasterStack> {
        let mut out = RasterStack::new(self.grid.clone());
        for name in names {
            let name = name.as_ref();
            let band = self.band(name)?;
            if out.contains(name) {
                return Err(duplicate(name));
            }
            out.names.push(name.to_string());
            out.bands.push(band.clone());
        }
        Ok(out)
    }

    /// Rename bands given `(old, new)` pairs, applied in order
    pub fn rename<S: AsRef<str>>(&mut self, pairs: &[(S, S)]) -> Result<()> {
        let mut names = self.names.clone();
        for (old, new) in pairs {
            let (old, new) = (old.as_ref(), new.as_ref());
            let idx = names
                .iter()
                .position(|n| n == old)
                .ok_or_else(|| Error::missing_band(old, &names))?;
            if old != new && names.iter().any(|n| n == new) {
                return Err(duplicate(new));
            }
            names[idx] = new.to_string();
        }
        self.names = names;
        Ok(())
    }

    /// Spatially cropped copy covering the pixels that intersect `extent`.
    ///
    /// Cropping entirely outside the stack yields a stack with the same band
    /// names and zero rows/columns.
    pub fn clip(&self, extent: &Extent) -> RasterStack {
        let window = self
            .extent()
            .intersection(extent)
            .and_then(|overlap| self.pixel_window(&overlap));

        let (row, col, rows, cols) = match window {
            Some(w) => w,
            None => return self.empty_like(),
        };

        let grid = GridSpec::new(
            rows,
            cols,
            self.grid.transform.offset(col, row),
            self.grid.crs.clone(),
        );
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let data = b
                    .data()
                    .slice(ndarray::s![row..row + rows, col..col + cols])
                    .to_owned();
                on_grid(&grid, data)
            })
            .collect();

        RasterStack {
            grid,
            names: self.names.clone(),
            bands,
        }
    }

    /// Pixel window `(row, col, rows, cols)` covering a sub-extent
    fn pixel_window(&self, overlap: &Extent) -> Option<(usize, usize, usize, usize)> {
        let t = &self.grid.transform;
        let (c0, r0) = t.geo_to_pixel(overlap.min_x, overlap.max_y);
        let (c1, r1) = t.geo_to_pixel(overlap.max_x, overlap.min_y);
        if !(c0.is_finite() && c1.is_finite() && r0.is_finite() && r1.is_finite()) {
            return None;
        }

        // Snap tiny floating point overshoot before flooring
        let snap = |v: f64| (v * 1e9).round() / 1e9;
        let col_start = snap(c0.min(c1)).floor().max(0.0) as usize;
        let col_end = (snap(c0.max(c1)).ceil() as usize).min(self.cols());
        let row_start = snap(r0.min(r1)).floor().max(0.0) as usize;
        let row_end = (snap(r0.max(r1)).ceil() as usize).min(self.rows());

        if col_end <= col_start || row_end <= row_start {
            return None;
        }
        Some((row_start, col_start, row_end - row_start, col_end - col_start))
    }

    fn empty_like(&self) -> RasterStack {
        let grid = GridSpec::new(0, 0, self.grid.transform, self.grid.crs.clone());
        let bands = self
            .bands
            .iter()
            .map(|_| on_grid(&grid, Array2::zeros((0, 0))))
            .collect();
        RasterStack {
            grid,
            names: self.names.clone(),
            bands,
        }
    }

    /// Feature vector of all bands at (row, col), NaN where no-data
    pub fn pixel(&self, row: usize, col: usize) -> Option<Vec<f64>> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(
            self.bands
                .iter()
                .map(|b| unsafe { b.get_unchecked(row, col) })
                .collect(),
        )
    }
}

fn duplicate(name: &str) -> Error {
    Error::DuplicateBand {
        name: name.to_string(),
        reason: "a band with this name already exists".into(),
    }
}

fn on_grid(grid: &GridSpec, data: Array2<f64>) -> Raster<f64> {
    let mut band = Raster::from_array(data);
    band.set_transform(grid.transform);
    band.set_crs(grid.crs.clone());
    band.set_nodata(Some(f64::NAN));
    band
}

fn normalize_nodata(mut band: Raster<f64>) -> Raster<f64> {
    if let Some(nd) = band.nodata() {
        if !nd.is_nan() {
            band.data_mut().mapv_inplace(|v| {
                if (v - nd).abs() < f64::EPSILON * 100.0 {
                    f64::NAN
                } else {
                    v
                }
            });
        }
    }
    band.set_nodata(Some(f64::NAN));
    band
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r
    }

    fn make_stack() -> RasterStack {
        RasterStack::from_bands(vec![
            ("B4", make_band(4, 4, 0.1)),
            ("B8", make_band(4, 4, 0.5)),
        ])
        .unwrap()
    }

    #[test]
    fn test_add_then_select_round_trips() {
        let mut stack = make_stack();
        let mut swir = make_band(4, 4, 0.2);
        swir.set(1, 2, 0.9).unwrap();
        stack.add_band("B11", swir.clone()).unwrap();

        let selected = stack.select(&["B11"]).unwrap();
        assert_eq!(selected.band_names(), &["B11".to_string()]);
        assert_eq!(selected.band("B11").unwrap().data(), swir.data());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut stack = make_stack();
        let err = stack.add_band("B4", make_band(4, 4, 1.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateBand { ref name, .. } if name == "B4"));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut stack = make_stack();
        let err = stack.add_band("B2", make_band(5, 4, 1.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateBand { .. }));
    }

    #[test]
    fn test_select_missing_band() {
        let stack = make_stack();
        let err = stack.select(&["B4", "B12"]).unwrap_err();
        assert!(matches!(err, Error::MissingBand { ref name, .. } if name == "B12"));
    }

    #[test]
    fn test_declared_nodata_becomes_nan() {
        let mut band = make_band(4, 4, 1.0);
        band.set(0, 0, -9999.0).unwrap();
        band.set_nodata(Some(-9999.0));

        let stack = RasterStack::from_bands(vec![("VV", band)]).unwrap();
        assert!(stack.band("VV").unwrap().get(0, 0).unwrap().is_nan());
        assert_eq!(stack.band("VV").unwrap().get(1, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_rename() {
        let mut stack = make_stack();
        stack.rename(&[("B4", "red"), ("B8", "nir")]).unwrap();
        assert_eq!(stack.band_names(), &["red".to_string(), "nir".to_string()]);
        assert!(stack.rename(&[("red", "nir")]).is_err());
        assert!(stack.rename(&[("B4", "x")]).is_err());
    }

    #[test]
    fn test_add_bands_is_all_or_nothing() {
        let mut stack = make_stack();
        let other = RasterStack::from_bands(vec![
            ("B2", make_band(4, 4, 0.3)),
            ("B4", make_band(4, 4, 0.3)),
        ])
        .unwrap();
        assert!(stack.add_bands(&other).is_err());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_clip_inside() {
        // Grid covers x 0..40, y 0..40 with 10 unit pixels
        let mut band = make_band(4, 4, 0.0);
        band.set(1, 1, 5.0).unwrap();
        let stack = RasterStack::from_bands(vec![("b", band)]).unwrap();

        let clipped = stack.clip(&Extent::new(10.0, 10.0, 30.0, 30.0));
        assert_eq!(clipped.shape(), (2, 2));
        assert_eq!(clipped.band("b").unwrap().get(0, 0).unwrap(), 5.0);
        assert_eq!(clipped.extent(), Extent::new(10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn test_clip_outside_is_empty() {
        let stack = make_stack();
        let clipped = stack.clip(&Extent::new(100.0, 100.0, 200.0, 200.0));
        assert!(clipped.has_no_pixels());
        assert_eq!(clipped.len(), 2);
    }

    #[test]
    fn test_pixel_vector() {
        let stack = make_stack();
        assert_eq!(stack.pixel(0, 0), Some(vec![0.1, 0.5]));
        assert_eq!(stack.pixel(4, 0), None);
    }
}

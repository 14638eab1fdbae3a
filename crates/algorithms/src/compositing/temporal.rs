//! Pixel-wise temporal reduction of raster collections

use crate::maybe_rayon::*;
use crate::reducer::Reducer;
use geofuse_core::raster::{Raster, RasterStack};
use geofuse_core::{Algorithm, Error, RasterCollection, Result};
use ndarray::Array2;
use tracing::debug;

use super::TimeWindow;

/// Parameters for [`TemporalCompositor`]
#[derive(Debug, Clone, Default)]
pub struct CompositeParams {
    pub reducer: Reducer,
    /// Windows to composite; empty means one composite over the whole collection
    pub windows: Vec<TimeWindow>,
}

/// Compositing stage
#[derive(Debug, Clone, Default)]
pub struct TemporalCompositor;

impl Algorithm for TemporalCompositor {
    type Input = RasterCollection;
    type Output = RasterStack;
    type Params = CompositeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TemporalCompositor"
    }

    fn description(&self) -> &'static str {
        "Reduce a dated raster collection to per-window composite bands"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        if params.windows.is_empty() {
            composite(&input, params.reducer)
        } else {
            composite_windows(&input, &params.windows, params.reducer)
        }
    }
}

/// Reduce every band of `collection` across its acquisitions.
///
/// The output carries the collection's band schema and grid. An empty
/// collection yields bands that are no-data everywhere.
pub fn composite(collection: &RasterCollection, reducer: Reducer) -> Result<RasterStack> {
    let grid = collection.grid();
    let mut out = RasterStack::new(grid.clone());

    for name in collection.schema() {
        let inputs = collection
            .iter()
            .map(|a| a.stack.band(name))
            .collect::<Result<Vec<_>>>()?;
        let band = if inputs.is_empty() {
            Raster::on_grid(grid, f64::NAN)
        } else {
            reduce_pixelwise(&inputs, reducer)?
        };
        out.add_band(name.clone(), band)?;
    }
    Ok(out)
}

/// One composite per window, concatenated in window order.
///
/// Bands are named `{band}_{window.id}`. Windows are reduced in parallel;
/// windows with no acquisitions contribute all-no-data bands.
pub fn composite_windows(
    collection: &RasterCollection,
    windows: &[TimeWindow],
    reducer: Reducer,
) -> Result<RasterStack> {
    let composites: Vec<Result<RasterStack>> = windows
        .par_iter()
        .map(|window| {
            let slice = window.select(collection);
            debug!(window = %window.id, acquisitions = slice.len(), "compositing window");
            let mut stack = composite(&slice, reducer)?;
            let renames: Vec<(String, String)> = stack
                .band_names()
                .iter()
                .map(|b| (b.clone(), format!("{}_{}", b, window.id)))
                .collect();
            stack.rename(&renames)?;
            Ok(stack)
        })
        .collect();

    let mut out = RasterStack::new(collection.grid().clone());
    for stack in composites {
        out.add_bands(&stack?)?;
    }
    Ok(out)
}

/// Concatenate all acquisitions band-wise in date order.
///
/// The first acquisition keeps the schema names; the n-th repeat of a band
/// is tagged `{band}_{n}` (`B2`, `B2_1`, `B2_2`, ...).
pub fn stack_images(collection: &RasterCollection) -> Result<RasterStack> {
    let mut out = RasterStack::new(collection.grid().clone());
    for (i, acquisition) in collection.iter().enumerate() {
        for (name, band) in acquisition.stack.iter() {
            let tagged = if i == 0 {
                name.to_string()
            } else {
                format!("{}_{}", name, i)
            };
            out.add_band(tagged, band.clone())?;
        }
    }
    Ok(out)
}

/// Collapse all bands of `stack` into one band with `reducer`
pub fn reduce_bands(stack: &RasterStack, reducer: Reducer) -> Result<Raster<f64>> {
    let bands: Vec<&Raster<f64>> = stack.iter().map(|(_, b)| b).collect();
    if bands.is_empty() {
        return Ok(Raster::on_grid(stack.grid(), f64::NAN));
    }
    reduce_pixelwise(&bands, reducer)
}

fn reduce_pixelwise(bands: &[&Raster<f64>], reducer: Reducer) -> Result<Raster<f64>> {
    let first = bands[0];
    let (rows, cols) = first.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut stack = Vec::with_capacity(bands.len());
            for (col, out) in row_data.iter_mut().enumerate() {
                stack.clear();
                stack.extend(bands.iter().map(|b| unsafe { b.get_unchecked(row, col) }));
                *out = reducer.reduce(&mut stack);
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geofuse_core::{GeoTransform, GridSpec};

    fn grid() -> GridSpec {
        GridSpec::new(2, 2, GeoTransform::new(0.0, 20.0, 10.0, -10.0), None)
    }

    fn scene(vv: f64, vh: f64) -> RasterStack {
        let g = grid();
        RasterStack::new(g.clone())
            .with_band("VV", Raster::on_grid(&g, vv))
            .unwrap()
            .with_band("VH", Raster::on_grid(&g, vh))
            .unwrap()
    }

    fn collection(items: &[(u32, u32, f64, f64)]) -> RasterCollection {
        let mut c = RasterCollection::new(["VV", "VH"], grid());
        for &(month, day, vv, vh) in items {
            let date = NaiveDate::from_ymd_opt(2022, month, day).unwrap();
            c.push(date, scene(vv, vh)).unwrap();
        }
        c
    }

    #[test]
    fn test_median_composite() {
        let c = collection(&[(1, 3, -10.0, -20.0), (1, 15, -12.0, -18.0), (1, 27, -8.0, -19.0)]);
        let out = composite(&c, Reducer::Median).unwrap();
        assert_eq!(out.band("VV").unwrap().get(0, 0).unwrap(), -10.0);
        assert_eq!(out.band("VH").unwrap().get(1, 1).unwrap(), -19.0);
    }

    #[test]
    fn test_mean_skips_nodata_dates() {
        let mut c = collection(&[(1, 3, -10.0, -20.0)]);
        let g = grid();
        let mut vv = Raster::on_grid(&g, -14.0);
        vv.set(0, 0, f64::NAN).unwrap();
        let s = RasterStack::new(g.clone())
            .with_band("VV", vv)
            .unwrap()
            .with_band("VH", Raster::on_grid(&g, -22.0))
            .unwrap();
        c.push(NaiveDate::from_ymd_opt(2022, 1, 9).unwrap(), s).unwrap();

        let out = composite(&c, Reducer::Mean).unwrap();
        assert_eq!(out.band("VV").unwrap().get(0, 0).unwrap(), -10.0);
        assert_eq!(out.band("VV").unwrap().get(0, 1).unwrap(), -12.0);
    }

    #[test]
    fn test_empty_collection_is_all_nodata() {
        let c = collection(&[]);
        let out = composite(&c, Reducer::Median).unwrap();
        assert_eq!(out.band_names(), &["VV".to_string(), "VH".to_string()]);
        assert!(out.band("VV").unwrap().data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_windows_are_tagged_in_order() {
        let c = collection(&[(1, 10, -10.0, -20.0), (2, 10, -6.0, -16.0)]);
        let windows = vec![TimeWindow::new("jan", 1, 31), TimeWindow::new("feb", 32, 59), TimeWindow::new("mar", 60, 90)];
        let out = composite_windows(&c, &windows, Reducer::Median).unwrap();

        let names: Vec<&str> = out.band_names().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["VV_jan", "VH_jan", "VV_feb", "VH_feb", "VV_mar", "VH_mar"]);
        assert_eq!(out.band("VV_feb").unwrap().get(0, 0).unwrap(), -6.0);
        assert!(out.band("VH_mar").unwrap().get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_stack_images_tags_repeats() {
        let c = collection(&[(1, 10, -10.0, -20.0), (2, 10, -6.0, -16.0)]);
        let out = stack_images(&c).unwrap();
        let names: Vec<&str> = out.band_names().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["VV", "VH", "VV_1", "VH_1"]);
    }

    #[test]
    fn test_reduce_bands_mean() {
        let out = reduce_bands(&scene(-10.0, -20.0), Reducer::Mean).unwrap();
        assert_eq!(out.get(1, 0).unwrap(), -15.0);
    }

    #[test]
    fn test_compositor_without_windows() {
        let c = collection(&[(5, 1, -10.0, -20.0)]);
        let out = TemporalCompositor.execute_default(c).unwrap();
        assert_eq!(out.len(), 2);
    }
}

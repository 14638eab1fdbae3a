//! GeoTIFF reading of input bands and export of classified rasters
//!
//! Uses the `tiff` crate directly: one band per file on input, a single
//! 32-bit float band with ModelPixelScale/ModelTiepoint/GDAL_NODATA tags
//! on output.

mod geotiff;

pub use geotiff::{
    read_band, read_band_from_buffer, write_classified, write_classified_to_buffer, ExportOptions,
};

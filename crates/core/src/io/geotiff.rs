//! Minimal GeoTIFF codec for single-band rasters

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// The decoder maps GeoTIFF tag numbers to named variants, so lookups
/// must go through the same mapping rather than `Tag::Unknown`.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

// GeoKey ids
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Options for exporting a classified raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Refuse to write rasters with more than this many pixels
    pub max_pixels: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            max_pixels: 1_000_000_000,
        }
    }
}

/// Read the first band of a GeoTIFF file as `f64`.
///
/// A GDAL_NODATA tag, when present, is carried into the raster's no-data value.
pub fn read_band<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    let file = File::open(path.as_ref())?;
    decode(file)
}

/// Same as [`read_band`] for an in-memory buffer
pub fn read_band_from_buffer(data: &[u8]) -> Result<Raster<f64>> {
    decode(Cursor::new(data))
}

fn decode<R: Read + Seek>(reader: R) -> Result<Raster<f64>> {
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let (rows, cols) = (height as usize, width as usize);

    let image = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<f64> = match image {
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    // Interleaved multi-sample images are not split into bands here
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_transform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Ok(keys) = decoder.get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY)) {
        raster.set_crs(crs_from_geokeys(&keys));
    }
    if let Ok(text) = decoder.get_tag_ascii_string(geo_tag(GDAL_NODATA)) {
        if let Ok(nd) = text.trim_matches(char::from(0)).trim().parse::<f64>() {
            raster.set_nodata(Some(nd));
        }
    }
    Ok(raster)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from a GeoKey directory: the projected key wins over the
/// geographic one. Only inline (short) key values are considered.
fn crs_from_geokeys(keys: &[u16]) -> Option<CRS> {
    let count = *keys.get(3)? as usize;
    let entries = keys.get(4..4 + 4 * count)?;
    let value = |id: u16| {
        entries
            .chunks_exact(4)
            .find(|e| e[0] == id && e[1] == 0)
            .map(|e| e[3])
            .filter(|&v| v != 0 && v != USER_DEFINED)
    };
    value(PROJECTED_CS_TYPE)
        .or_else(|| value(GEOGRAPHIC_TYPE))
        .map(|code| CRS::from_epsg(u32::from(code)))
}

/// GeoKey directory v1.1.0 for a pixel-is-area raster in `crs`
fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs
        .and_then(CRS::epsg)
        .and_then(|c| u16::try_from(c).ok());
    let geographic = crs.map_or(false, CRS::is_geographic);
    let model_type = if geographic { 2 } else { 1 };

    let mut keys = vec![1, 1, 0, 2, GT_MODEL_TYPE, 0, 1, model_type, GT_RASTER_TYPE, 0, 1, 1];
    if let Some(code) = code {
        let key = if geographic { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
        keys.extend_from_slice(&[key, 0, 1, code]);
        keys[3] = 3;
    }
    keys
}

/// Write a classified raster as a single-band float GeoTIFF.
///
/// The image is encoded in memory first, so a failed export leaves nothing
/// on disk. Fails with [`Error::ExportLimit`] when the raster holds more than
/// `options.max_pixels` cells. Missing parent directories are created.
pub fn write_classified<T, P>(raster: &Raster<T>, path: P, options: &ExportOptions) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let buf = write_classified_to_buffer(raster, options)?;
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, buf)?;
    Ok(())
}

/// Same as [`write_classified`] into an in-memory buffer
pub fn write_classified_to_buffer<T: RasterElement>(
    raster: &Raster<T>,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    check_pixel_limit(raster, options)?;
    let mut buf = Vec::new();
    encode(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn check_pixel_limit<T: RasterElement>(raster: &Raster<T>, options: &ExportOptions) -> Result<()> {
    let pixels = raster.len() as u64;
    if pixels > options.max_pixels {
        return Err(Error::ExportLimit {
            pixels,
            max_pixels: options.max_pixels,
        });
    }
    Ok(())
}

fn encode<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let tiff_err = |what: &str, e: tiff::TiffError| Error::Other(format!("{}: {}", what, e));

    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_err("TIFF encoder error", e))?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                f32::NAN
            } else {
                num_traits::cast(v).unwrap_or(f32::NAN)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    let geokeys = geokeys_for(raster.crs());

    let enc = image.encoder();
    enc.write_tag(geo_tag(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(|e| tiff_err("Cannot write scale tag", e))?;
    enc.write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;
    enc.write_tag(geo_tag(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(|e| tiff_err("Cannot write geokey tag", e))?;
    enc.write_tag(geo_tag(GDAL_NODATA), "nan")
        .map_err(|e| tiff_err("Cannot write nodata tag", e))?;

    image
        .write_data(&data)
        .map_err(|e| tiff_err("Cannot write image data", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified() -> Raster<f64> {
        let mut r = Raster::filled(3, 4, 2.0);
        r.set_transform(GeoTransform::new(500_000.0, 4_000_060.0, 20.0, -20.0));
        r.set_crs(Some(CRS::from_epsg(32630)));
        r.set(0, 0, f64::NAN).unwrap();
        r.set(2, 3, 5.0).unwrap();
        r
    }

    #[test]
    fn test_buffer_round_trip_keeps_georeferencing() {
        let raster = classified();
        let buf = write_classified_to_buffer(&raster, &ExportOptions::default()).unwrap();
        let back = read_band_from_buffer(&buf).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert!(back.get(0, 0).unwrap().is_nan());
        assert_eq!(back.get(2, 3).unwrap(), 5.0);
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.crs(), Some(&CRS::from_epsg(32630)));
        assert!(back.nodata().is_some_and(f64::is_nan));
        assert_eq!(back.statistics().nodata_count, 1);
    }

    #[test]
    fn test_read_declared_nodata() {
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            let mut image = encoder.new_image::<Gray32Float>(2, 1).unwrap();
            image.encoder().write_tag(geo_tag(GDAL_NODATA), "-9999").unwrap();
            image.write_data(&[-9999.0f32, 0.25]).unwrap();
        }
        let band = read_band_from_buffer(&buf).unwrap();
        assert_eq!(band.nodata(), Some(-9999.0));
        assert!(band.is_nodata(band.get(0, 0).unwrap()));
        assert!(!band.is_nodata(band.get(0, 1).unwrap()));
    }

    #[test]
    fn test_write_creates_directory_and_skips_oversized() {
        let dir = std::env::temp_dir().join(format!("geofuse-export-{}", std::process::id()));
        let path = dir.join("nested").join("classified.tif");
        let _ = std::fs::remove_dir_all(&dir);

        let err = write_classified(&classified(), &path, &ExportOptions { max_pixels: 1 });
        assert!(err.is_err());
        assert!(!path.exists());

        write_classified(&classified(), &path, &ExportOptions::default()).unwrap();
        let back = read_band(&path).unwrap();
        assert_eq!(back.transform(), classified().transform());
    }

    #[test]
    fn test_geokeys() {
        let keys = geokeys_for(Some(&CRS::wgs84()));
        assert_eq!(keys[3], 3);
        assert_eq!(&keys[12..], &[GEOGRAPHIC_TYPE, 0, 1, 4326]);
        assert_eq!(crs_from_geokeys(&keys), Some(CRS::wgs84()));
        assert_eq!(crs_from_geokeys(&geokeys_for(None)), None);
    }

    #[test]
    fn test_pixel_cap() {
        let options = ExportOptions { max_pixels: 11 };
        let err = write_classified_to_buffer(&classified(), &options).unwrap_err();
        assert!(matches!(err, Error::ExportLimit { pixels: 12, max_pixels: 11 }));
    }
}

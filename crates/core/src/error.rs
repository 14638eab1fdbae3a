//! Error types for GeoFuse

use thiserror::Error;

/// Main error type for GeoFuse operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    /// A band name is already taken, or the new grid does not match the stack.
    #[error("Cannot add band '{name}': {reason}")]
    DuplicateBand { name: String, reason: String },

    #[error("Band '{name}' not found (available: {available})")]
    MissingBand { name: String, available: String },

    /// Sources that must share extent, resolution and CRS do not.
    #[error("Alignment error in source '{source_name}': {reason}")]
    Alignment { source_name: String, reason: String },

    #[error("Empty {partition} partition: {training} training / {validation} validation out of {total} samples")]
    EmptyPartition {
        partition: &'static str,
        training: usize,
        validation: usize,
        total: usize,
    },

    #[error("Class {code} ({name}) has no training samples")]
    InsufficientSamples { code: u32, name: String },

    #[error("Confusion matrix error: {0}")]
    Matrix(String),

    #[error("Point {index} has no usable '{field}' attribute")]
    MissingAttribute { index: usize, field: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Export of {pixels} pixels exceeds the limit of {max_pixels}")]
    ExportLimit { pixels: u64, max_pixels: u64 },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn missing_band(name: &str, available: &[String]) -> Self {
        Error::MissingBand {
            name: name.to_string(),
            available: available.join(", "),
        }
    }
}

/// Result type alias for GeoFuse operations
pub type Result<T> = std::result::Result<T, Error>;

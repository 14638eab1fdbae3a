//! # GeoFuse Core
//!
//! Data model for the GeoFuse multi-sensor classification pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid
//! - `RasterStack`: Ordered set of named, co-registered bands
//! - `RasterCollection`: Dated stacks sharing one band schema
//! - `GroundPoint` / `LabeledPointSet`: Labeled reference observations
//! - `ClassSet`: The fixed enumeration of class codes
//! - GeoTIFF band reading and classified-raster export

pub mod classes;
pub mod collection;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use classes::{ClassDef, ClassSet};
pub use collection::{Acquisition, RasterCollection};
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{Extent, GeoTransform, GridSpec, Raster, RasterElement, RasterStack};
pub use vector::{AttributeValue, GroundPoint, LabeledPointSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classes::ClassSet;
    pub use crate::collection::{Acquisition, RasterCollection};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Extent, GeoTransform, GridSpec, Raster, RasterElement, RasterStack};
    pub use crate::vector::{AttributeValue, GroundPoint, LabeledPointSet};
    pub use crate::Algorithm;
}

/// Core trait for pipeline stages in GeoFuse.
///
/// Stages are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the stage
    type Input;
    /// Output type for the stage
    type Output;
    /// Parameters controlling stage behavior
    type Params: Default;
    /// Error type for stage execution
    type Error: std::error::Error;

    /// Returns the stage name
    fn name(&self) -> &'static str;

    /// Returns a description of what the stage does
    fn description(&self) -> &'static str;

    /// Execute the stage
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

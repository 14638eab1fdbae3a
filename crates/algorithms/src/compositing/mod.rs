//! Temporal compositing
//!
//! Reduces a dated raster collection to one stack per time window and
//! concatenates the windows band-wise, tagging each band with its window id.

mod temporal;
mod window;

pub use temporal::{
    composite, composite_windows, reduce_bands, stack_images, CompositeParams, TemporalCompositor,
};
pub use window::TimeWindow;

//! Feature stack assembly
//!
//! Concatenates co-registered sources (composites, index stacks, static
//! layers) into the single stack that samples are drawn from and that the
//! classifier is applied to.

mod builder;

pub use builder::{build_feature_stack, BandNaming, FeatureSource, FeatureStackBuilder};

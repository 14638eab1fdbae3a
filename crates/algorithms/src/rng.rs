//! Seed derivation
//!
//! Every stochastic step takes its own `StdRng`, seeded from the run seed
//! and a stream index (tree number, sample id, pipeline stage). Nothing in
//! the crate draws from an entropy-seeded generator, so a whole run can be
//! replayed from one top-level seed.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Well-known stream indices for the pipeline stages
pub mod stream {
    pub const SPLIT: u64 = 1;
    pub const FOREST: u64 = 2;
}

/// Mix a seed with a stream index into an independent seed.
///
/// SplitMix64 finaliser over `seed + golden * (stream + 1)`.
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(stream.wrapping_add(1)));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generator for `stream` under `seed`
pub fn stream_rng(seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(seed, stream))
}

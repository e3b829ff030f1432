//! xxHash-based shape keys for compiled plans.
//!
//! A shape key is a deterministic 64-bit digest of the canonical shape
//! encoding produced by [`crate::query::shape`]. Keys only pick the cache
//! bucket; hits are confirmed against the stored encoding.

use xxhash_rust::xxh3;

/// Fixed seed so shape keys are stable across processes.
pub const SHAPE_SEED: u64 = 0x517cc1b727220a95;

/// Compute the shape key of a canonical shape encoding.
pub fn shape_key(encoding: &[u8]) -> u64 {
    xxh3::xxh3_64_with_seed(encoding, SHAPE_SEED)
}

/// Render a shape key the way it is logged.
pub fn format_shape_key(key: u64) -> String {
    format!("{key:016x}")
}

//! Pass implementations.

mod bloom;

pub use bloom::{BLOOM_SHADER, BloomPass, BloomPassConfig};

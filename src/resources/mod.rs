//! Effect settings
//!
//! Plain data describing how the effect should look, independent of the GPU.

pub mod bloom;

pub use bloom::BloomSettings;

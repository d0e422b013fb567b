//! Bloom recording
//!
//! Provides:
//! - `BloomPass`: host entry point
//! - `WgpuCommandRecorder`: dispatch and copy recording on a command encoder
//! - `TransientTexturePool`: recycled scratch textures

pub mod passes;
pub mod recorder;
pub mod transient_pool;

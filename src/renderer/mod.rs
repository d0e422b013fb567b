//! wgpu backend
//!
//! - `graph`: the bloom pass, its command recorder and transient texture pool
//! - `pipeline`: compute pipelines and the bundled WGSL kernels

pub mod graph;
pub mod pipeline;

pub use graph::passes::{BLOOM_SHADER, BloomPass, BloomPassConfig};
pub use graph::recorder::{BloomUniforms, WgpuCommandRecorder};
pub use graph::transient_pool::{TransientTextureId, TransientTexturePool};
pub use pipeline::bloom::BloomPipelines;

/// Format of the HDR scene color target the bloom pass composites into.
pub const HDR_TEXTURE_FORMAT: wgpu::TextureFormat = crate::bloom::SCRATCH_TEXTURE_FORMAT;

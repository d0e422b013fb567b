//! Bloom core
//!
//! Everything needed to plan and sequence a bloom execution without touching
//! a GPU API:
//! - `resource_ids`: stable names for pyramid levels, textures and scalars
//! - `pyramid`: mip size planning and per-execution level state
//! - `allocator`: scratch texture acquisition with scoped release
//! - `program`: compute program reflection
//! - `kernel`: kernel signatures, bindings and dispatch
//! - `orchestrator`: the full downsample / upsample / composite chain

pub mod allocator;
pub mod kernel;
pub mod orchestrator;
pub mod program;
pub mod pyramid;
pub mod resource_ids;

pub use allocator::{ResourceAllocator, SCRATCH_TEXTURE_FORMAT, ScratchScope, ScratchTextureDesc};
pub use kernel::{
    BloomKernel, BloomKernels, CommandRecorder, DispatchCommand, KernelBindings, KernelDispatcher,
    KernelSignature, ScalarValue, TargetAccess, TextureRef, workgroup_count,
};
pub use orchestrator::{BloomPassOrchestrator, BloomStats, DEFAULT_BLOOM_LABEL};
pub use program::{ComputeProgram, KernelId, KernelInfo, ShaderProgram, ShaderProgramBuilder};
pub use pyramid::{MipLevel, PyramidState, TextureSize, plan};
pub use resource_ids::{MAX_MIP_SLOT, MipSlot, ScalarSlot, TextureSlot};

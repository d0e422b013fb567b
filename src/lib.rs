#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Screen-space bloom as a chain of compute dispatches.
//!
//! - [`bloom`]: backend-independent planning and orchestration
//! - [`renderer`]: the wgpu backend ([`BloomPass`])
//! - [`resources`]: user-facing effect settings

pub mod bloom;
pub mod errors;
pub mod renderer;
pub mod resources;

pub use bloom::{
    BloomKernel, BloomPassOrchestrator, BloomStats, CommandRecorder, ComputeProgram,
    ResourceAllocator, ShaderProgram, TextureSize,
};
pub use errors::{BloomError, Result};
pub use renderer::{BloomPass, BloomPassConfig, TransientTexturePool};
pub use resources::BloomSettings;

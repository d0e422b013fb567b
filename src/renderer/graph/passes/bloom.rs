//! Bloom Pass
//!
//! Host-facing entry point of the bloom effect. Owns the compiled compute
//! pipelines, the scratch texture pool and the kernel orchestration, and
//! records one bloom execution per call to [`BloomPass::run`].
//!
//! # Scene color requirements
//!
//! The scene color texture is read by the first downsample and the final
//! blend and is overwritten by a texture copy at the end. It must therefore:
//! - use [`HDR_TEXTURE_FORMAT`] (copies cannot convert formats),
//! - have `TEXTURE_BINDING | COPY_DST` usage.
//!
//! # Device requirements
//!
//! The additive upsample accumulates into its target in place, which needs
//! read-write storage access to `Rgba16Float`. Request
//! [`BloomPass::required_features`] when creating the device.

use std::borrow::Cow;

use crate::bloom::orchestrator::{BloomPassOrchestrator, BloomStats, DEFAULT_BLOOM_LABEL};
use crate::bloom::program::ShaderProgram;
use crate::bloom::pyramid::TextureSize;
use crate::errors::{BloomError, Result};
use crate::renderer::HDR_TEXTURE_FORMAT;
use crate::renderer::graph::recorder::WgpuCommandRecorder;
use crate::renderer::graph::transient_pool::TransientTexturePool;
use crate::renderer::pipeline::bloom::BloomPipelines;
use crate::resources::bloom::BloomSettings;

/// WGSL source of the bundled bloom kernels.
pub const BLOOM_SHADER: &str = include_str!("../../pipeline/shaders/bloom.wgsl");

/// Free scratch textures unused for this many executions are destroyed.
const POOL_MAX_IDLE_FRAMES: u32 = 3;

/// Construction options for [`BloomPass`].
#[derive(Debug, Clone)]
pub struct BloomPassConfig {
    /// Debug-group and pipeline label.
    pub label: String,
    /// WGSL compute program providing the four bloom kernels.
    ///
    /// `None` leaves the pass without a program and construction fails.
    pub program_source: Option<Cow<'static, str>>,
}

impl Default for BloomPassConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_BLOOM_LABEL.to_string(),
            program_source: Some(Cow::Borrowed(BLOOM_SHADER)),
        }
    }
}

/// Screen-space bloom over an HDR scene color target.
pub struct BloomPass {
    orchestrator: BloomPassOrchestrator<ShaderProgram>,
    pipelines: BloomPipelines,
    pool: TransientTexturePool,
}

impl BloomPass {
    /// Device features the bloom kernels rely on.
    #[must_use]
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
    }

    /// Reflects and compiles the compute program and builds the pipelines.
    ///
    /// Configuration problems (no program, missing kernels, unreadable
    /// workgroup sizes) are reported here, before any frame is recorded.
    pub fn new(device: &wgpu::Device, config: &BloomPassConfig) -> Result<Self> {
        let Some(source) = config.program_source.as_deref() else {
            log::error!("{}: compute shader is missing", config.label);
            return Err(BloomError::MissingProgram);
        };

        let program = ShaderProgram::from_wgsl(config.label.as_str(), source)?;
        let orchestrator = BloomPassOrchestrator::new(program)?.with_label(config.label.as_str());

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&config.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });
        let pipelines = BloomPipelines::new(device, &module, &config.label);

        log::info!("{}: pipelines ready", config.label);

        Ok(Self {
            orchestrator,
            pipelines,
            pool: TransientTexturePool::new(device.clone()),
        })
    }

    /// Records bloom over `scene_color` into `encoder`.
    ///
    /// Returns `Ok(None)` without recording anything when `settings` leave
    /// the effect inactive.
    pub fn run(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        scene_color: &wgpu::Texture,
        settings: &BloomSettings,
    ) -> Result<Option<BloomStats>> {
        if !settings.is_active() {
            return Ok(None);
        }

        check_scene_color(scene_color)?;
        let scene_size = TextureSize::new(scene_color.width(), scene_color.height());

        let mut recorder = WgpuCommandRecorder::new(device, encoder, &self.pipelines, scene_color);
        let stats = self
            .orchestrator
            .execute(scene_size, settings, &mut self.pool, &mut recorder)?;

        self.pool.trim(POOL_MAX_IDLE_FRAMES);
        Ok(Some(stats))
    }

    #[must_use]
    pub fn orchestrator(&self) -> &BloomPassOrchestrator<ShaderProgram> {
        &self.orchestrator
    }

    #[must_use]
    pub fn pool(&self) -> &TransientTexturePool {
        &self.pool
    }
}

fn check_scene_color(texture: &wgpu::Texture) -> Result<()> {
    if texture.format() != HDR_TEXTURE_FORMAT {
        return Err(BloomError::InvalidParameter(format!(
            "scene color must be {HDR_TEXTURE_FORMAT:?}, got {:?}",
            texture.format()
        )));
    }
    let required = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    if !texture.usage().contains(required) {
        return Err(BloomError::InvalidParameter(format!(
            "scene color usage {:?} lacks {required:?}",
            texture.usage()
        )));
    }
    Ok(())
}

//! wgpu command recording
//!
//! [`WgpuCommandRecorder`] turns bloom dispatch commands into compute passes
//! on a caller-owned `wgpu::CommandEncoder`. Every dispatch gets its own
//! small uniform buffer and bind group; all of them live only as long as the
//! command buffer that references them.

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;
use wgpu::util::DeviceExt;

use crate::bloom::kernel::{CommandRecorder, DispatchCommand, KernelBindings, TextureRef};
use crate::bloom::pyramid::TextureSize;
use crate::bloom::resource_ids::ScalarSlot;
use crate::errors::{BloomError, Result};
use crate::renderer::graph::transient_pool::{TransientTextureId, TransientTexturePool};
use crate::renderer::pipeline::bloom::{
    BloomPipelines, SAMPLER_BINDING, UNIFORMS_BINDING, texture_binding,
};

/// Per-dispatch uniforms, laid out to match `BloomUniforms` in `bloom.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BloomUniforms {
    pub source_size: [f32; 4],
    pub target_size: [f32; 4],
    pub luminance_threshold: f32,
    pub inv_downsample_count: f32,
    pub bloom_intensity: f32,
    pub _pad: f32,
}

impl BloomUniforms {
    /// Packs the scalar bindings of one dispatch. Slots a kernel does not
    /// take are left at zero.
    #[must_use]
    pub fn from_bindings<H: Copy>(bindings: &KernelBindings<H>) -> Self {
        let vec4 = |slot| bindings.get_vec4(slot).unwrap_or_default().to_array();
        let float = |slot| bindings.get_float(slot).unwrap_or_default();
        Self {
            source_size: vec4(ScalarSlot::SourceSize),
            target_size: vec4(ScalarSlot::TargetSize),
            luminance_threshold: float(ScalarSlot::LuminanceThreshold),
            inv_downsample_count: float(ScalarSlot::InverseDownsampleCount),
            bloom_intensity: float(ScalarSlot::BloomIntensity),
            _pad: 0.0,
        }
    }
}

/// Records bloom work into a `wgpu::CommandEncoder`.
pub struct WgpuCommandRecorder<'a> {
    device: &'a wgpu::Device,
    encoder: &'a mut wgpu::CommandEncoder,
    pipelines: &'a BloomPipelines,
    scene_color: &'a wgpu::Texture,
    scene_color_view: wgpu::TextureView,
}

impl<'a> WgpuCommandRecorder<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        encoder: &'a mut wgpu::CommandEncoder,
        pipelines: &'a BloomPipelines,
        scene_color: &'a wgpu::Texture,
    ) -> Self {
        let scene_color_view = scene_color.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Bloom Scene Color View"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });

        Self {
            device,
            encoder,
            pipelines,
            scene_color,
            scene_color_view,
        }
    }

    fn resolve_view<'r>(
        &'r self,
        pool: &'r TransientTexturePool,
        texture: TextureRef<TransientTextureId>,
    ) -> Result<&'r wgpu::TextureView> {
        match texture {
            TextureRef::SceneColor => Ok(&self.scene_color_view),
            TextureRef::Scratch(id) => pool.get_view(id).ok_or_else(|| stale_handle(id)),
        }
    }
}

fn stale_handle(id: TransientTextureId) -> BloomError {
    BloomError::InvalidParameter(format!("scratch texture {id:?} is not checked out"))
}

impl CommandRecorder<TransientTexturePool> for WgpuCommandRecorder<'_> {
    fn record_dispatch(
        &mut self,
        pool: &TransientTexturePool,
        command: &DispatchCommand<TransientTextureId>,
    ) -> Result<()> {
        let signature = command.kernel.signature();
        let uniforms = BloomUniforms::from_bindings(&command.bindings);

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(signature.entry_point),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = {
            let mut entries: SmallVec<[wgpu::BindGroupEntry; 6]> = SmallVec::new();
            for &(slot, texture) in &command.bindings.textures {
                entries.push(wgpu::BindGroupEntry {
                    binding: texture_binding(slot, signature.target_access),
                    resource: wgpu::BindingResource::TextureView(
                        self.resolve_view(pool, texture)?,
                    ),
                });
            }
            entries.push(wgpu::BindGroupEntry {
                binding: UNIFORMS_BINDING,
                resource: buffer.as_entire_binding(),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(self.pipelines.sampler()),
            });

            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(signature.entry_point),
                layout: self.pipelines.layout(command.kernel),
                entries: &entries,
            })
        };

        let [x, y, z] = command.workgroups;
        let mut pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(signature.entry_point),
            timestamp_writes: None,
        });
        pass.set_pipeline(self.pipelines.pipeline(command.kernel));
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(x, y, z);

        Ok(())
    }

    fn record_copy_to_scene_color(
        &mut self,
        pool: &TransientTexturePool,
        source: TransientTextureId,
        size: TextureSize,
    ) -> Result<()> {
        let texture = pool.get_texture(source).ok_or_else(|| stale_handle(source))?;

        self.encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: self.scene_color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn push_debug_group(&mut self, label: &str) {
        self.encoder.push_debug_group(label);
    }

    fn pop_debug_group(&mut self) {
        self.encoder.pop_debug_group();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::bloom::resource_ids::TextureSlot;

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<BloomUniforms>(), 48);
    }

    #[test]
    fn uniforms_pack_bound_scalars() {
        let bindings = KernelBindings::<u32>::new()
            .texture(TextureSlot::Source, TextureRef::SceneColor)
            .vec4(ScalarSlot::SourceSize, Vec4::new(4.0, 2.0, 0.25, 0.5))
            .vec4(ScalarSlot::TargetSize, Vec4::new(2.0, 1.0, 0.5, 1.0))
            .float(ScalarSlot::LuminanceThreshold, 0.9);
        let u = BloomUniforms::from_bindings(&bindings);
        assert_eq!(u.source_size, [4.0, 2.0, 0.25, 0.5]);
        assert_eq!(u.target_size, [2.0, 1.0, 0.5, 1.0]);
        assert_eq!(u.luminance_threshold, 0.9);
        assert_eq!(u.inv_downsample_count, 0.0);
        assert_eq!(u.bloom_intensity, 0.0);
    }
}

//! Bloom compute pipelines
//!
//! One bind group layout and one compute pipeline per [`BloomKernel`], all
//! built from the same shader module. Layouts are derived from each kernel's
//! [`KernelSignature`] so a kernel only declares the bindings it reads.

use smallvec::SmallVec;

use crate::bloom::allocator::SCRATCH_TEXTURE_FORMAT;
use crate::bloom::kernel::{BloomKernel, KernelSignature, TargetAccess};
use crate::bloom::resource_ids::TextureSlot;

/// Binding of the `BloomUniforms` buffer.
pub const UNIFORMS_BINDING: u32 = 3;
/// Binding of the bilinear clamp sampler.
pub const SAMPLER_BINDING: u32 = 4;

/// Bind group index of a texture slot for a kernel with `access` to its target.
#[must_use]
pub fn texture_binding(slot: TextureSlot, access: TargetAccess) -> u32 {
    match (slot, access) {
        (TextureSlot::Source, _) => 0,
        (TextureSlot::Target, TargetAccess::WriteOnly) => 1,
        (TextureSlot::Target, TargetAccess::ReadWrite) => 5,
        (TextureSlot::SceneColor, _) => 2,
    }
}

fn layout_entries(signature: &KernelSignature) -> SmallVec<[wgpu::BindGroupLayoutEntry; 6]> {
    let mut entries = SmallVec::new();

    for &slot in signature.textures {
        let ty = match slot {
            TextureSlot::Source | TextureSlot::SceneColor => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            TextureSlot::Target => wgpu::BindingType::StorageTexture {
                access: match signature.target_access {
                    TargetAccess::WriteOnly => wgpu::StorageTextureAccess::WriteOnly,
                    TargetAccess::ReadWrite => wgpu::StorageTextureAccess::ReadWrite,
                },
                format: SCRATCH_TEXTURE_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
        };
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture_binding(slot, signature.target_access),
            visibility: wgpu::ShaderStages::COMPUTE,
            ty,
            count: None,
        });
    }

    entries.push(wgpu::BindGroupLayoutEntry {
        binding: UNIFORMS_BINDING,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: SAMPLER_BINDING,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });

    entries
}

/// GPU objects shared by every bloom execution.
pub struct BloomPipelines {
    layouts: [wgpu::BindGroupLayout; 4],
    pipelines: [wgpu::ComputePipeline; 4],
    sampler: wgpu::Sampler,
}

impl BloomPipelines {
    /// Creates layouts and pipelines for all four kernels of `module`.
    #[must_use]
    pub fn new(device: &wgpu::Device, module: &wgpu::ShaderModule, label: &str) -> Self {
        let layouts = BloomKernel::ALL.map(|kernel| {
            let signature = kernel.signature();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(signature.entry_point),
                entries: &layout_entries(signature),
            })
        });

        let pipelines = BloomKernel::ALL.map(|kernel| {
            let entry_point = kernel.entry_point();
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(entry_point),
                bind_group_layouts: &[Some(&layouts[kernel as usize])],
                immediate_size: 0,
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&layout),
                module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            layouts,
            pipelines,
            sampler,
        }
    }

    #[inline]
    #[must_use]
    pub fn layout(&self, kernel: BloomKernel) -> &wgpu::BindGroupLayout {
        &self.layouts[kernel as usize]
    }

    #[inline]
    #[must_use]
    pub fn pipeline(&self, kernel: BloomKernel) -> &wgpu::ComputePipeline {
        &self.pipelines[kernel as usize]
    }

    #[inline]
    #[must_use]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

//! Bloom kernels and their dispatch
//!
//! Every bloom step is one compute dispatch of one of four kernels. Each
//! kernel has a fixed [`KernelSignature`]: the texture and scalar slots it
//! must receive. [`KernelDispatcher`] checks bindings against that signature,
//! derives the thread-group count from the kernel's declared extents and
//! hands the finished [`DispatchCommand`] to a [`CommandRecorder`].
//!
//! # Kernel contract
//!
//! | Kernel | Textures | Scalars |
//! |--------|----------|---------|
//! | `BloomWeightedDownSample` | source, target | source size, target size, luminance threshold |
//! | `BloomDownSample` | source, target | source size, target size |
//! | `BloomAdditiveUpSample` | source, target (read-modify-write) | source size, target size |
//! | `BloomBlendCameraColor` | source, scene color, target | source size, target size, 1/count, intensity |

use glam::Vec4;
use smallvec::SmallVec;

use crate::bloom::allocator::ResourceAllocator;
use crate::bloom::program::{ComputeProgram, KernelId};
use crate::bloom::pyramid::TextureSize;
use crate::bloom::resource_ids::{ScalarSlot, TextureSlot};
use crate::errors::{BloomError, Result};

/// The four bloom kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloomKernel {
    /// First downsample: luminance threshold + downsample.
    WeightedDownsample,
    /// Plain box-filter downsample.
    Downsample,
    /// Upsample the coarser mip and add it into the finer one in place.
    AdditiveUpsample,
    /// Blend the accumulated bloom with the scene color.
    BlendSceneColor,
}

impl BloomKernel {
    pub const ALL: [Self; 4] = [
        Self::WeightedDownsample,
        Self::Downsample,
        Self::AdditiveUpsample,
        Self::BlendSceneColor,
    ];

    /// Entry point name in the compute program.
    #[must_use]
    pub fn entry_point(self) -> &'static str {
        self.signature().entry_point
    }

    #[must_use]
    pub fn signature(self) -> &'static KernelSignature {
        match self {
            Self::WeightedDownsample => &WEIGHTED_DOWNSAMPLE,
            Self::Downsample => &DOWNSAMPLE,
            Self::AdditiveUpsample => &ADDITIVE_UPSAMPLE,
            Self::BlendSceneColor => &BLEND_SCENE_COLOR,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

/// How a kernel accesses its `Target` texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAccess {
    WriteOnly,
    ReadWrite,
}

/// Bindings a kernel requires.
#[derive(Debug, PartialEq, Eq)]
pub struct KernelSignature {
    pub entry_point: &'static str,
    pub textures: &'static [TextureSlot],
    pub scalars: &'static [ScalarSlot],
    pub target_access: TargetAccess,
}

static WEIGHTED_DOWNSAMPLE: KernelSignature = KernelSignature {
    entry_point: "BloomWeightedDownSample",
    textures: &[TextureSlot::Source, TextureSlot::Target],
    scalars: &[
        ScalarSlot::SourceSize,
        ScalarSlot::TargetSize,
        ScalarSlot::LuminanceThreshold,
    ],
    target_access: TargetAccess::WriteOnly,
};

static DOWNSAMPLE: KernelSignature = KernelSignature {
    entry_point: "BloomDownSample",
    textures: &[TextureSlot::Source, TextureSlot::Target],
    scalars: &[ScalarSlot::SourceSize, ScalarSlot::TargetSize],
    target_access: TargetAccess::WriteOnly,
};

static ADDITIVE_UPSAMPLE: KernelSignature = KernelSignature {
    entry_point: "BloomAdditiveUpSample",
    textures: &[TextureSlot::Source, TextureSlot::Target],
    scalars: &[ScalarSlot::SourceSize, ScalarSlot::TargetSize],
    target_access: TargetAccess::ReadWrite,
};

static BLEND_SCENE_COLOR: KernelSignature = KernelSignature {
    entry_point: "BloomBlendCameraColor",
    textures: &[
        TextureSlot::Source,
        TextureSlot::SceneColor,
        TextureSlot::Target,
    ],
    scalars: &[
        ScalarSlot::SourceSize,
        ScalarSlot::TargetSize,
        ScalarSlot::InverseDownsampleCount,
        ScalarSlot::BloomIntensity,
    ],
    target_access: TargetAccess::WriteOnly,
};

/// All four kernels resolved against one compute program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomKernels {
    ids: [KernelId; 4],
}

impl BloomKernels {
    /// Looks up every bloom kernel. Fails on the first missing entry point.
    pub fn resolve<P: ComputeProgram + ?Sized>(program: &P) -> Result<Self> {
        let mut ids = [KernelId(0); 4];
        for kernel in BloomKernel::ALL {
            ids[kernel.index()] = program.find_kernel(kernel.entry_point()).ok_or_else(|| {
                BloomError::KernelNotFound {
                    program: program.label().to_string(),
                    kernel: kernel.entry_point(),
                }
            })?;
        }
        Ok(Self { ids })
    }

    #[inline]
    #[must_use]
    pub fn id(&self, kernel: BloomKernel) -> KernelId {
        self.ids[kernel.index()]
    }
}

// ============================================================================
// Dispatch commands
// ============================================================================

/// Texture bound to a kernel slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRef<H> {
    /// The host's scene color target (borrowed, never allocated or released here).
    SceneColor,
    /// A pyramid scratch texture.
    Scratch(H),
}

/// Value bound to a scalar slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Float(f32),
    Vec4(Vec4),
}

/// Texture and scalar bindings for one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelBindings<H> {
    pub textures: SmallVec<[(TextureSlot, TextureRef<H>); 3]>,
    pub scalars: SmallVec<[(ScalarSlot, ScalarValue); 4]>,
}

impl<H> Default for KernelBindings<H> {
    fn default() -> Self {
        Self {
            textures: SmallVec::new(),
            scalars: SmallVec::new(),
        }
    }
}

impl<H: Copy> KernelBindings<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn texture(mut self, slot: TextureSlot, texture: TextureRef<H>) -> Self {
        self.textures.push((slot, texture));
        self
    }

    #[must_use]
    pub fn float(mut self, slot: ScalarSlot, value: f32) -> Self {
        self.scalars.push((slot, ScalarValue::Float(value)));
        self
    }

    #[must_use]
    pub fn vec4(mut self, slot: ScalarSlot, value: Vec4) -> Self {
        self.scalars.push((slot, ScalarValue::Vec4(value)));
        self
    }

    #[must_use]
    pub fn get_texture(&self, slot: TextureSlot) -> Option<TextureRef<H>> {
        self.textures
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|&(_, t)| t)
    }

    #[must_use]
    pub fn get_scalar(&self, slot: ScalarSlot) -> Option<ScalarValue> {
        self.scalars
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|&(_, v)| v)
    }

    #[must_use]
    pub fn get_float(&self, slot: ScalarSlot) -> Option<f32> {
        match self.get_scalar(slot) {
            Some(ScalarValue::Float(v)) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_vec4(&self, slot: ScalarSlot) -> Option<Vec4> {
        match self.get_scalar(slot) {
            Some(ScalarValue::Vec4(v)) => Some(v),
            _ => None,
        }
    }

    /// Checks that the bindings cover `signature` exactly, once each.
    fn check(&self, signature: &KernelSignature) -> Result<()> {
        let mismatch = |detail: String| BloomError::BindingMismatch {
            kernel: signature.entry_point,
            detail,
        };

        for &slot in signature.textures {
            let n = self.textures.iter().filter(|(s, _)| *s == slot).count();
            if n != 1 {
                return Err(mismatch(format!(
                    "texture `{}` bound {n} times",
                    slot.shader_name()
                )));
            }
        }
        if let Some((slot, _)) = self
            .textures
            .iter()
            .find(|(s, _)| !signature.textures.contains(s))
        {
            return Err(mismatch(format!(
                "unexpected texture `{}`",
                slot.shader_name()
            )));
        }

        for &slot in signature.scalars {
            let n = self.scalars.iter().filter(|(s, _)| *s == slot).count();
            if n != 1 {
                return Err(mismatch(format!(
                    "scalar `{}` bound {n} times",
                    slot.shader_name()
                )));
            }
        }
        if let Some((slot, _)) = self
            .scalars
            .iter()
            .find(|(s, _)| !signature.scalars.contains(s))
        {
            return Err(mismatch(format!(
                "unexpected scalar `{}`",
                slot.shader_name()
            )));
        }

        Ok(())
    }
}

/// A fully resolved dispatch, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchCommand<H> {
    pub kernel: BloomKernel,
    pub kernel_id: KernelId,
    pub bindings: KernelBindings<H>,
    pub target_size: TextureSize,
    /// Thread-group counts `(x, y, z)`.
    pub workgroups: [u32; 3],
}

/// Destination of recorded GPU work.
///
/// Commands are appended to a single stream in call order and the GPU
/// executes them in that order. The bloom chain relies on this: a dispatch
/// that reads a mip written by an earlier dispatch carries no barrier of its
/// own. An implementation that splits work across queues must add them.
pub trait CommandRecorder<A: ResourceAllocator> {
    /// Records one compute dispatch.
    fn record_dispatch(
        &mut self,
        resources: &A,
        command: &DispatchCommand<A::Handle>,
    ) -> Result<()>;

    /// Records a full copy of `source` over the scene color target.
    fn record_copy_to_scene_color(
        &mut self,
        resources: &A,
        source: A::Handle,
        size: TextureSize,
    ) -> Result<()>;

    /// Opens a named debug/profiling region.
    fn push_debug_group(&mut self, _label: &str) {}

    /// Closes the innermost debug/profiling region.
    fn pop_debug_group(&mut self) {}
}

/// Thread-group counts covering `target` with groups of `group_size`.
#[inline]
#[must_use]
pub fn workgroup_count(target: TextureSize, group_size: [u32; 3]) -> [u32; 3] {
    [
        target.width.div_ceil(group_size[0].max(1)),
        target.height.div_ceil(group_size[1].max(1)),
        1,
    ]
}

/// Issues kernel dispatches against one compute program.
pub struct KernelDispatcher<'a, P: ComputeProgram + ?Sized> {
    program: &'a P,
    kernels: &'a BloomKernels,
}

impl<'a, P: ComputeProgram + ?Sized> KernelDispatcher<'a, P> {
    pub fn new(program: &'a P, kernels: &'a BloomKernels) -> Self {
        Self { program, kernels }
    }

    /// Validates `bindings` and records one dispatch covering `target_size`.
    ///
    /// The group size is queried from the program on every call since each
    /// kernel may declare its own.
    pub fn dispatch<A, R>(
        &self,
        recorder: &mut R,
        resources: &A,
        kernel: BloomKernel,
        bindings: KernelBindings<A::Handle>,
        target_size: TextureSize,
    ) -> Result<()>
    where
        A: ResourceAllocator,
        R: CommandRecorder<A> + ?Sized,
    {
        bindings.check(kernel.signature())?;

        let kernel_id = self.kernels.id(kernel);
        let group_size = self.program.thread_group_size(kernel_id);
        let workgroups = workgroup_count(target_size, group_size);

        log::trace!(
            "Dispatch {} -> {}x{} ({}x{}x{} groups of {:?})",
            kernel.entry_point(),
            target_size.width,
            target_size.height,
            workgroups[0],
            workgroups[1],
            workgroups[2],
            group_size,
        );

        recorder.record_dispatch(
            resources,
            &DispatchCommand {
                kernel,
                kernel_id,
                bindings,
                target_size,
                workgroups,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::program::ShaderProgram;

    fn full_program() -> ShaderProgram {
        BloomKernel::ALL
            .iter()
            .fold(ShaderProgram::builder("bloom"), |b, k| {
                b.kernel(k.entry_point(), [8, 8, 1])
            })
            .build()
            .unwrap()
    }

    #[test]
    fn entry_points_are_stable() {
        assert_eq!(
            BloomKernel::WeightedDownsample.entry_point(),
            "BloomWeightedDownSample"
        );
        assert_eq!(BloomKernel::Downsample.entry_point(), "BloomDownSample");
        assert_eq!(
            BloomKernel::AdditiveUpsample.entry_point(),
            "BloomAdditiveUpSample"
        );
        assert_eq!(
            BloomKernel::BlendSceneColor.entry_point(),
            "BloomBlendCameraColor"
        );
    }

    #[test]
    fn only_the_first_downsample_takes_a_threshold() {
        for kernel in BloomKernel::ALL {
            let takes_threshold = kernel
                .signature()
                .scalars
                .contains(&ScalarSlot::LuminanceThreshold);
            assert_eq!(takes_threshold, kernel == BloomKernel::WeightedDownsample);
        }
    }

    #[test]
    fn resolve_reports_missing_kernel() {
        let program = ShaderProgram::builder("partial")
            .kernel("BloomWeightedDownSample", [8, 8, 1])
            .kernel("BloomDownSample", [8, 8, 1])
            .kernel("BloomBlendCameraColor", [8, 8, 1])
            .build()
            .unwrap();
        let err = BloomKernels::resolve(&program).unwrap_err();
        assert_eq!(
            err,
            BloomError::KernelNotFound {
                program: "partial".into(),
                kernel: "BloomAdditiveUpSample",
            }
        );
    }

    #[test]
    fn resolve_maps_every_kernel() {
        let program = full_program();
        let kernels = BloomKernels::resolve(&program).unwrap();
        for kernel in BloomKernel::ALL {
            assert_eq!(
                program.find_kernel(kernel.entry_point()),
                Some(kernels.id(kernel))
            );
        }
    }

    #[test]
    fn workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(TextureSize::new(1920, 1080), [8, 8, 1]), [240, 135, 1]);
        assert_eq!(workgroup_count(TextureSize::new(60, 34), [8, 8, 1]), [8, 5, 1]);
        assert_eq!(workgroup_count(TextureSize::new(1, 1), [16, 16, 1]), [1, 1, 1]);
        assert_eq!(workgroup_count(TextureSize::new(100, 3), [64, 1, 1]), [2, 3, 1]);
    }

    #[test]
    fn bindings_must_match_signature() {
        let sig = BloomKernel::Downsample.signature();
        let ok = KernelBindings::<u32>::new()
            .texture(TextureSlot::Source, TextureRef::SceneColor)
            .texture(TextureSlot::Target, TextureRef::Scratch(1))
            .vec4(ScalarSlot::SourceSize, Vec4::ONE)
            .vec4(ScalarSlot::TargetSize, Vec4::ONE);
        assert!(ok.check(sig).is_ok());

        let extra = ok.clone().float(ScalarSlot::LuminanceThreshold, 0.9);
        assert!(matches!(
            extra.check(sig),
            Err(BloomError::BindingMismatch { .. })
        ));

        let missing = KernelBindings::<u32>::new()
            .texture(TextureSlot::Source, TextureRef::SceneColor)
            .vec4(ScalarSlot::SourceSize, Vec4::ONE)
            .vec4(ScalarSlot::TargetSize, Vec4::ONE);
        assert!(missing.check(sig).is_err());
    }
}

//! Bloom pass orchestration
//!
//! Sequences one bloom execution on a single command stream:
//!
//! ```text
//! scene color ──WeightedDownSample──▶ mip 1 ──DownSample──▶ mip 2 ─ … ─▶ mip N
//!                                                                         │
//! scene color ◀──copy── blend target ◀──BlendCameraColor── mip 1 ◀─ … ◀──┘
//!                                                  (AdditiveUpSample, in place)
//! ```
//!
//! # Resource lifetime
//!
//! All scratch textures (the full-resolution blend target and mips `1..=N`)
//! are acquired before the first dispatch, so an allocation failure never
//! leaves a half-recorded chain behind. During the upsample walk each mip is
//! released as soon as it has been consumed as a source; the blend target is
//! released right after it has been copied back. A [`ScratchScope`] releases
//! anything still held if the execution bails out early.
//!
//! # Ordering
//!
//! No barriers are recorded. Each dispatch reads textures written by earlier
//! dispatches in the same stream, which the GPU executes in submission order.

use crate::bloom::allocator::{ResourceAllocator, ScratchScope, ScratchTextureDesc};
use crate::bloom::kernel::{
    BloomKernel, BloomKernels, CommandRecorder, KernelBindings, KernelDispatcher, TextureRef,
};
use crate::bloom::program::ComputeProgram;
use crate::bloom::pyramid::{PyramidState, TextureSize};
use crate::bloom::resource_ids::{ScalarSlot, TextureSlot};
use crate::errors::Result;
use crate::resources::bloom::BloomSettings;

/// Default debug-group label wrapped around every execution.
pub const DEFAULT_BLOOM_LABEL: &str = "Myth Bloom Pass";

/// Counters describing one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BloomStats {
    /// Pyramid levels, including the full-resolution blend target.
    pub levels: usize,
    pub dispatches: usize,
    pub copies: usize,
    pub textures_acquired: usize,
    pub textures_released: usize,
}

/// Drives downsample, upsample and composite for one compute program.
///
/// Constructed once; [`execute`](Self::execute) is called once per frame
/// and keeps no state between calls.
pub struct BloomPassOrchestrator<P: ComputeProgram> {
    program: P,
    kernels: BloomKernels,
    label: String,
}

impl<P: ComputeProgram> BloomPassOrchestrator<P> {
    /// Resolves all bloom kernels in `program`.
    ///
    /// Fails with `KernelNotFound` if any is missing; such an orchestrator
    /// would never be able to produce a complete chain.
    pub fn new(program: P) -> Result<Self> {
        let kernels = BloomKernels::resolve(&program).inspect_err(|e| {
            log::error!("Bloom pass disabled: {e}");
        })?;
        Ok(Self {
            program,
            kernels,
            label: DEFAULT_BLOOM_LABEL.to_string(),
        })
    }

    /// Overrides the debug-group label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> &P {
        &self.program
    }

    #[inline]
    #[must_use]
    pub fn kernels(&self) -> &BloomKernels {
        &self.kernels
    }

    /// Records one full bloom execution over a scene color of `scene_size`.
    ///
    /// The caller decides whether bloom runs at all (`settings.is_active()`);
    /// this only re-validates the parameter bounds. On return, successful or
    /// not, every texture taken from `allocator` has been released.
    pub fn execute<A, R>(
        &self,
        scene_size: TextureSize,
        settings: &BloomSettings,
        allocator: &mut A,
        recorder: &mut R,
    ) -> Result<BloomStats>
    where
        A: ResourceAllocator,
        R: CommandRecorder<A> + ?Sized,
    {
        settings.validate()?;

        let mut scope = ScratchScope::new(allocator);
        let pyramid = PyramidState::build(
            scene_size,
            settings.downsample_count() as usize,
            |slot, size| scope.acquire(slot, &ScratchTextureDesc::bloom_mip(size)),
        )?;

        log::debug!(
            "Bloom: {}x{} scene, {} levels, threshold {}, intensity {}",
            scene_size.width,
            scene_size.height,
            pyramid.len(),
            settings.luminance_threshold(),
            settings.bloom_intensity(),
        );

        recorder.push_debug_group(&self.label);
        let recorded = self.record(&pyramid, settings, &mut scope, recorder);
        recorder.pop_debug_group();
        let (dispatches, copies) = recorded?;

        debug_assert_eq!(scope.live_count(), 0, "bloom chain leaked a scratch texture");

        Ok(BloomStats {
            levels: pyramid.len(),
            dispatches,
            copies,
            textures_acquired: scope.acquired_count(),
            textures_released: scope.released_count(),
        })
    }

    fn record<A, R>(
        &self,
        pyramid: &PyramidState<A::Handle>,
        settings: &BloomSettings,
        scope: &mut ScratchScope<'_, A>,
        recorder: &mut R,
    ) -> Result<(usize, usize)>
    where
        A: ResourceAllocator,
        R: CommandRecorder<A> + ?Sized,
    {
        let dispatcher = KernelDispatcher::new(&self.program, &self.kernels);
        let count = pyramid.downsample_count();
        let mut dispatches = 0;
        let mut copies = 0;

        // Downsample: level i-1 → level i. Level 0's source is the scene color
        // itself; the blend target at level 0 is not written until the end.
        for i in 1..=count {
            let src = pyramid.level(i - 1);
            let dst = pyramid.level(i);

            let bindings = KernelBindings::new()
                .texture(TextureSlot::Target, TextureRef::Scratch(dst.handle))
                .vec4(ScalarSlot::SourceSize, src.size.size_params())
                .vec4(ScalarSlot::TargetSize, dst.size.size_params());

            let (kernel, bindings) = if i == 1 {
                (
                    BloomKernel::WeightedDownsample,
                    bindings
                        .texture(TextureSlot::Source, TextureRef::SceneColor)
                        .float(
                            ScalarSlot::LuminanceThreshold,
                            settings.luminance_threshold(),
                        ),
                )
            } else {
                (
                    BloomKernel::Downsample,
                    bindings.texture(TextureSlot::Source, TextureRef::Scratch(src.handle)),
                )
            };

            dispatcher.dispatch(recorder, scope.allocator(), kernel, bindings, dst.size)?;
            dispatches += 1;
        }

        // Upsample: coarsest first, accumulating into each finer level. The
        // last step blends into the full-resolution target instead.
        let inverse_count = 1.0 / count as f32;
        for i in (1..=count).rev() {
            let src = pyramid.level(i);
            let dst = pyramid.level(i - 1);

            if i == 1 {
                let bindings = KernelBindings::new()
                    .texture(TextureSlot::Source, TextureRef::Scratch(src.handle))
                    .texture(TextureSlot::SceneColor, TextureRef::SceneColor)
                    .texture(TextureSlot::Target, TextureRef::Scratch(dst.handle))
                    .vec4(ScalarSlot::SourceSize, src.size.size_params())
                    .vec4(ScalarSlot::TargetSize, dst.size.size_params())
                    .float(ScalarSlot::InverseDownsampleCount, inverse_count)
                    .float(ScalarSlot::BloomIntensity, settings.bloom_intensity());

                dispatcher.dispatch(
                    recorder,
                    scope.allocator(),
                    BloomKernel::BlendSceneColor,
                    bindings,
                    dst.size,
                )?;
                dispatches += 1;

                recorder.record_copy_to_scene_color(scope.allocator(), dst.handle, dst.size)?;
                copies += 1;
                scope.release(dst.slot);
            } else {
                let bindings = KernelBindings::new()
                    .texture(TextureSlot::Source, TextureRef::Scratch(src.handle))
                    .texture(TextureSlot::Target, TextureRef::Scratch(dst.handle))
                    .vec4(ScalarSlot::SourceSize, src.size.size_params())
                    .vec4(ScalarSlot::TargetSize, dst.size.size_params());

                dispatcher.dispatch(
                    recorder,
                    scope.allocator(),
                    BloomKernel::AdditiveUpsample,
                    bindings,
                    dst.size,
                )?;
                dispatches += 1;
            }

            scope.release(src.slot);
        }

        Ok((dispatches, copies))
    }
}

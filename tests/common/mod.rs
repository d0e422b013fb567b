//! Shared test harness
//!
//! - `CountingAllocator`: hands out integer handles, records every acquire and
//!   release, panics on double release and can be told to fail.
//! - `ReferenceRecorder`: executes each recorded command immediately on CPU
//!   images (a deterministic stand-in for the GPU kernels) and keeps a log of
//!   what was recorded.

#![allow(dead_code)]

use glam::Vec4;
use rustc_hash::FxHashMap;

use myth_bloom::bloom::{
    BloomKernel, CommandRecorder, DispatchCommand, MipSlot, ResourceAllocator, ScalarSlot,
    ScratchTextureDesc, TextureRef, TextureSize, TextureSlot,
};
use myth_bloom::errors::{BloomError, Result};

// ============================================================================
// Allocator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u32);

#[derive(Default)]
pub struct CountingAllocator {
    next: u32,
    live: FxHashMap<Handle, (MipSlot, TextureSize)>,
    /// Every successful acquisition, in order.
    pub acquired: Vec<(Handle, MipSlot, TextureSize)>,
    /// Every release, in order.
    pub released: Vec<Handle>,
    /// Number of successful acquisitions before the next one fails.
    pub fail_after: Option<usize>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::default()
        }
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn size_of(&self, handle: Handle) -> Option<TextureSize> {
        self.live.get(&handle).map(|&(_, size)| size)
    }
}

impl ResourceAllocator for CountingAllocator {
    type Handle = Handle;

    fn acquire(&mut self, slot: MipSlot, desc: &ScratchTextureDesc) -> Result<Handle> {
        if self.fail_after == Some(self.acquired.len()) {
            return Err(BloomError::ResourceExhaustion {
                slot,
                width: desc.size.width,
                height: desc.size.height,
                detail: "test allocator exhausted".into(),
            });
        }
        self.next += 1;
        let handle = Handle(self.next);
        self.live.insert(handle, (slot, desc.size));
        self.acquired.push((handle, slot, desc.size));
        Ok(handle)
    }

    fn release(&mut self, handle: Handle) {
        assert!(
            self.live.remove(&handle).is_some(),
            "{handle:?} released twice or never acquired"
        );
        self.released.push(handle);
    }
}

// ============================================================================
// CPU images
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub size: TextureSize,
    pub texels: Vec<Vec4>,
}

impl Image {
    pub fn filled(size: TextureSize, value: Vec4) -> Self {
        Self {
            size,
            texels: vec![value; (size.width * size.height) as usize],
        }
    }

    /// Deterministic test pattern with a few bright spots.
    pub fn pattern(size: TextureSize) -> Self {
        let mut image = Self::filled(size, Vec4::new(0.1, 0.1, 0.1, 1.0));
        for y in 0..size.height {
            for x in 0..size.width {
                if (x * 7 + y * 13) % 31 == 0 {
                    image.set(x, y, Vec4::new(8.0, 6.0, 4.0, 1.0));
                }
            }
        }
        image
    }

    /// Texel at `(x, y)`, clamped to the edge.
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        let x = x.min(self.size.width - 1);
        let y = y.min(self.size.height - 1);
        self.texels[(y * self.size.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: Vec4) {
        let i = (y * self.size.width + x) as usize;
        self.texels[i] = value;
    }
}

fn luminance(c: Vec4) -> f32 {
    c.x * 0.2126 + c.y * 0.7152 + c.z * 0.0722
}

// ============================================================================
// Recorder
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Dispatch(DispatchCommand<Handle>),
    Copy { source: Handle, size: TextureSize },
    PushGroup(String),
    PopGroup,
}

pub struct ReferenceRecorder {
    pub scene: Image,
    pub log: Vec<Recorded>,
    scratch: FxHashMap<Handle, Image>,
    simulate: bool,
}

impl ReferenceRecorder {
    pub fn new(scene: Image) -> Self {
        Self {
            scene,
            log: Vec::new(),
            scratch: FxHashMap::default(),
            simulate: true,
        }
    }

    /// Records and checks commands without executing the kernels.
    pub fn log_only(scene_size: TextureSize) -> Self {
        let scene = Image {
            size: scene_size,
            texels: Vec::new(),
        };
        Self {
            simulate: false,
            ..Self::new(scene)
        }
    }

    pub fn dispatches(&self) -> impl Iterator<Item = &DispatchCommand<Handle>> {
        self.log.iter().filter_map(|r| match r {
            Recorded::Dispatch(d) => Some(d),
            _ => None,
        })
    }

    pub fn kernel_sequence(&self) -> Vec<BloomKernel> {
        self.dispatches().map(|d| d.kernel).collect()
    }

    fn read(&self, texture: TextureRef<Handle>) -> &Image {
        match texture {
            TextureRef::SceneColor => &self.scene,
            TextureRef::Scratch(h) => self
                .scratch
                .get(&h)
                .unwrap_or_else(|| panic!("{h:?} read before it was written")),
        }
    }
}

fn scratch_of(texture: Option<TextureRef<Handle>>) -> Handle {
    match texture {
        Some(TextureRef::Scratch(h)) => h,
        other => panic!("expected a scratch texture, got {other:?}"),
    }
}

impl CommandRecorder<CountingAllocator> for ReferenceRecorder {
    fn record_dispatch(
        &mut self,
        resources: &CountingAllocator,
        command: &DispatchCommand<Handle>,
    ) -> Result<()> {
        let b = &command.bindings;
        for &(_, texture) in &b.textures {
            if let TextureRef::Scratch(h) = texture {
                assert!(resources.is_live(h), "{h:?} used after release");
            }
        }
        let target = scratch_of(b.get_texture(TextureSlot::Target));
        let size = command.target_size;
        assert_eq!(resources.size_of(target), Some(size), "target size mismatch");

        self.log.push(Recorded::Dispatch(command.clone()));
        if !self.simulate {
            return Ok(());
        }

        let source = self.read(b.get_texture(TextureSlot::Source).expect("source")).clone();

        let mut out = match command.kernel {
            BloomKernel::AdditiveUpsample => self.read(TextureRef::Scratch(target)).clone(),
            _ => Image::filled(size, Vec4::ZERO),
        };

        for y in 0..size.height {
            for x in 0..size.width {
                let value = match command.kernel {
                    BloomKernel::WeightedDownsample | BloomKernel::Downsample => {
                        let avg = (source.get(2 * x, 2 * y)
                            + source.get(2 * x + 1, 2 * y)
                            + source.get(2 * x, 2 * y + 1)
                            + source.get(2 * x + 1, 2 * y + 1))
                            * 0.25;
                        match b.get_float(ScalarSlot::LuminanceThreshold) {
                            Some(t) if luminance(avg) < t => Vec4::ZERO,
                            _ => avg,
                        }
                    }
                    BloomKernel::AdditiveUpsample => out.get(x, y) + source.get(x / 2, y / 2),
                    BloomKernel::BlendSceneColor => {
                        let scene = self.scene.get(x, y);
                        let weight = b.get_float(ScalarSlot::InverseDownsampleCount).expect("1/n")
                            * b.get_float(ScalarSlot::BloomIntensity).expect("intensity");
                        scene + source.get(x / 2, y / 2) * weight
                    }
                };
                out.set(x, y, value);
            }
        }

        self.scratch.insert(target, out);
        Ok(())
    }

    fn record_copy_to_scene_color(
        &mut self,
        resources: &CountingAllocator,
        source: Handle,
        size: TextureSize,
    ) -> Result<()> {
        assert!(resources.is_live(source), "{source:?} copied after release");
        assert_eq!(size, self.scene.size);
        if self.simulate {
            self.scene = self.read(TextureRef::Scratch(source)).clone();
        }
        self.log.push(Recorded::Copy { source, size });
        Ok(())
    }

    fn push_debug_group(&mut self, label: &str) {
        self.log.push(Recorded::PushGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.log.push(Recorded::PopGroup);
    }
}

//! Scratch texture allocation
//!
//! The bloom pass borrows its mip textures from a [`ResourceAllocator`] and
//! must give every one of them back before the execution ends, including on
//! error paths. [`ScratchScope`] enforces that: it remembers each live handle
//! by its [`MipSlot`] and releases whatever is still live when dropped.

use smallvec::SmallVec;

use crate::bloom::pyramid::TextureSize;
use crate::bloom::resource_ids::MipSlot;
use crate::errors::Result;

/// Texel format of every bloom scratch texture.
pub const SCRATCH_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Request for one scratch texture.
///
/// Scratch textures are single-sampled, single-mip, have no depth and are
/// writable from compute kernels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScratchTextureDesc {
    pub size: TextureSize,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl ScratchTextureDesc {
    /// Storage-writable HDR texture that can also be sampled and copied from.
    #[must_use]
    pub fn bloom_mip(size: TextureSize) -> Self {
        Self {
            size,
            format: SCRATCH_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        }
    }
}

/// Source of execution-scoped scratch textures.
pub trait ResourceAllocator {
    /// Opaque identifier of an acquired texture.
    type Handle: Copy + Eq + std::fmt::Debug;

    /// Allocates (or recycles) a texture matching `desc`, tagged with `slot`.
    fn acquire(&mut self, slot: MipSlot, desc: &ScratchTextureDesc) -> Result<Self::Handle>;

    /// Returns a texture to the allocator. Called at most once per handle
    /// per execution.
    fn release(&mut self, handle: Self::Handle);
}

/// Scoped acquire/release bookkeeping for one execution.
///
/// Every handle acquired through the scope is released exactly once: either
/// explicitly through [`ScratchScope::release`] or when the scope drops.
pub struct ScratchScope<'a, A: ResourceAllocator> {
    allocator: &'a mut A,
    live: SmallVec<[(MipSlot, A::Handle); 11]>,
    acquired: usize,
    released: usize,
}

impl<'a, A: ResourceAllocator> ScratchScope<'a, A> {
    pub fn new(allocator: &'a mut A) -> Self {
        Self {
            allocator,
            live: SmallVec::new(),
            acquired: 0,
            released: 0,
        }
    }

    /// Acquires a texture for `slot`.
    ///
    /// A slot can hold only one texture at a time; acquiring an occupied slot
    /// releases its previous texture first.
    pub fn acquire(&mut self, slot: MipSlot, desc: &ScratchTextureDesc) -> Result<A::Handle> {
        self.release(slot);
        let handle = self.allocator.acquire(slot, desc)?;
        self.live.push((slot, handle));
        self.acquired += 1;
        Ok(handle)
    }

    /// Releases the texture held by `slot`. Returns `false` (and does
    /// nothing) if the slot holds no texture.
    pub fn release(&mut self, slot: MipSlot) -> bool {
        let Some(pos) = self.live.iter().position(|(s, _)| *s == slot) else {
            return false;
        };
        let (_, handle) = self.live.swap_remove(pos);
        self.allocator.release(handle);
        self.released += 1;
        true
    }

    /// Read access to the allocator, e.g. to resolve handles while recording.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &A {
        &*self.allocator
    }

    /// Number of textures currently held.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[inline]
    #[must_use]
    pub fn acquired_count(&self) -> usize {
        self.acquired
    }

    #[inline]
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released
    }
}

impl<A: ResourceAllocator> Drop for ScratchScope<'_, A> {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            log::debug!(
                "Releasing {} bloom scratch texture(s) on scope exit",
                self.live.len()
            );
        }
        for (_, handle) in self.live.drain(..) {
            self.allocator.release(handle);
        }
    }
}

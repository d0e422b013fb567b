//! Transient Texture Pool
//!
//! Provides the GPU textures the bloom pyramid borrows for one execution.
//! Textures are checked out with [`ResourceAllocator::acquire`] and handed
//! back with [`ResourceAllocator::release`]; released textures go to a free
//! list and are recycled by later requests with the same description.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              TransientTexturePool                    │
//! │                                                     │
//! │  active: SlotMap<Id, PooledTexture>                 │
//! │  free:   FreeList<Key, PooledTexture>               │
//! │                                                     │
//! │  acquire(slot, desc) → Id                           │
//! │  get_view(Id) / get_texture(Id)                     │
//! │  release(Id)            (stale ids are ignored)     │
//! │  trim(max_idle_frames)  (once per frame)            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Textures are **never** destroyed while checked out or recently used.
//! - The pool grows on-demand: if no compatible free texture exists, a new
//!   one is created.
//! - [`TransientTexturePool::trim`] drops free textures that have not been
//!   reused for a number of frames (e.g. after a resolution change).
//!
//! A released texture may be handed out again before the commands that used
//! it have executed. That is safe only because all users record into the
//! same command stream, which the GPU executes in order. One pool must not be
//! shared between executions recorded on different streams.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::bloom::allocator::{ResourceAllocator, ScratchTextureDesc};
use crate::bloom::resource_ids::MipSlot;
use crate::errors::{BloomError, Result};

// ─── Public Types ─────────────────────────────────────────────────────────────

slotmap::new_key_type! {
    /// Handle to a texture checked out of a [`TransientTexturePool`].
    ///
    /// Becomes stale once released; stale handles resolve to nothing.
    pub struct TransientTextureId;
}

// ─── Internal Types ───────────────────────────────────────────────────────────

/// Key for texture recycling (usage-agnostic matching is intentionally avoided
/// because mis-matched usages would cause GPU validation errors).
#[derive(Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
}

impl PoolKey {
    fn from_desc(desc: &ScratchTextureDesc) -> Self {
        Self {
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
            usage: desc.usage,
        }
    }

    fn from_texture(texture: &wgpu::Texture) -> Self {
        Self {
            width: texture.width(),
            height: texture.height(),
            format: texture.format(),
            usage: texture.usage(),
        }
    }
}

/// A pooled texture with its pre-built view.
struct PooledTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    /// Slot that most recently checked this texture out.
    slot: MipSlot,
}

impl PooledTexture {
    fn new(device: &wgpu::Device, slot: MipSlot, desc: &ScratchTextureDesc) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(slot.label()),
            size: wgpu::Extent3d {
                width: desc.size.width,
                height: desc.size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(slot.label()),
            ..Default::default()
        });

        Self {
            texture,
            view,
            slot,
        }
    }
}

/// Released items grouped by key, each aged by [`FreeList::trim`].
struct FreeList<K, T> {
    buckets: FxHashMap<K, Vec<(T, u32)>>,
}

impl<K: Hash + Eq, T> FreeList<K, T> {
    fn new() -> Self {
        Self {
            buckets: FxHashMap::default(),
        }
    }

    fn push(&mut self, key: K, item: T) {
        self.buckets.entry(key).or_default().push((item, 0));
    }

    /// Most recently released item under `key`.
    fn take(&mut self, key: &K) -> Option<T> {
        self.buckets.get_mut(key)?.pop().map(|(item, _)| item)
    }

    /// Ages every item by one frame and drops those idle for more than
    /// `max_idle_frames`. Returns the number dropped.
    fn trim(&mut self, max_idle_frames: u32) -> usize {
        let before = self.len();
        for bucket in self.buckets.values_mut() {
            for (_, idle) in bucket.iter_mut() {
                *idle += 1;
            }
            bucket.retain(|&(_, idle)| idle <= max_idle_frames);
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        before - self.len()
    }

    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

// ─── Pool Implementation ──────────────────────────────────────────────────────

/// GPU texture pool for execution-scoped scratch textures.
///
/// # Thread Safety
///
/// The pool is not `Sync`; acquisition and release require `&mut self`
/// while handle resolution during recording only needs `&self`.
pub struct TransientTexturePool {
    device: wgpu::Device,
    /// Textures currently checked out.
    active: SlotMap<TransientTextureId, PooledTexture>,
    /// Free textures available for reuse, grouped by pool key.
    free: FreeList<PoolKey, PooledTexture>,
}

impl TransientTexturePool {
    /// Creates an empty pool allocating from `device`.
    #[must_use]
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            active: SlotMap::with_key(),
            free: FreeList::new(),
        }
    }

    /// View of a checked-out texture.
    #[must_use]
    #[inline]
    pub fn get_view(&self, id: TransientTextureId) -> Option<&wgpu::TextureView> {
        self.active.get(id).map(|t| &t.view)
    }

    /// Raw `wgpu::Texture` of a checked-out texture.
    ///
    /// Useful for operations like `copy_texture_to_texture`.
    #[must_use]
    #[inline]
    pub fn get_texture(&self, id: TransientTextureId) -> Option<&wgpu::Texture> {
        self.active.get(id).map(|t| &t.texture)
    }

    /// Slot a checked-out texture was acquired for.
    #[must_use]
    #[inline]
    pub fn slot_of(&self, id: TransientTextureId) -> Option<MipSlot> {
        self.active.get(id).map(|t| t.slot)
    }

    /// Age free textures by one frame and drop those idle for more than
    /// `max_idle_frames`.
    pub fn trim(&mut self, max_idle_frames: u32) {
        let dropped = self.free.trim(max_idle_frames);
        if dropped > 0 {
            log::debug!("Transient pool: dropped {dropped} idle texture(s)");
        }
    }

    /// Number of textures currently checked out.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of textures waiting in the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the total number of textures managed by the pool
    /// (both active and free).
    #[must_use]
    pub fn total_texture_count(&self) -> usize {
        self.active_count() + self.free_count()
    }
}

impl ResourceAllocator for TransientTexturePool {
    type Handle = TransientTextureId;

    fn acquire(&mut self, slot: MipSlot, desc: &ScratchTextureDesc) -> Result<TransientTextureId> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.size.is_empty() || desc.size.width > max || desc.size.height > max {
            return Err(BloomError::ResourceExhaustion {
                slot,
                width: desc.size.width,
                height: desc.size.height,
                detail: format!("texture dimensions must be within 1..={max}"),
            });
        }

        let key = PoolKey::from_desc(desc);
        let pooled = match self.free.take(&key) {
            Some(mut t) => {
                t.slot = slot;
                t
            }
            None => {
                log::trace!(
                    "Transient pool: new {}x{} texture for {slot}",
                    desc.size.width,
                    desc.size.height
                );
                PooledTexture::new(&self.device, slot, desc)
            }
        };

        Ok(self.active.insert(pooled))
    }

    fn release(&mut self, id: TransientTextureId) {
        let Some(t) = self.active.remove(id) else {
            log::warn!("Transient pool: release of unknown texture {id:?}");
            return;
        };
        self.free.push(PoolKey::from_texture(&t.texture), t);
    }
}

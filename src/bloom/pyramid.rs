//! Mip pyramid planning
//!
//! Computes the resolution of every bloom level from the scene color size.
//! Each level halves the previous one with ceiling division, so no dimension
//! ever collapses to zero:
//!
//! ```text
//! 1920x1080 → 960x540 → 480x270 → 240x135 → 120x68 → 60x34
//! ```

use glam::Vec4;
use smallvec::SmallVec;

use crate::bloom::resource_ids::MipSlot;
use crate::errors::{BloomError, Result};

/// Width and height of one texture, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of the next coarser mip: `ceil(w / 2) x ceil(h / 2)`.
    #[inline]
    #[must_use]
    pub const fn half(self) -> Self {
        Self {
            width: self.width.div_ceil(2),
            height: self.height.div_ceil(2),
        }
    }

    /// Packed `(w, h, 1/w, 1/h)` as consumed by the bloom kernels.
    #[inline]
    #[must_use]
    pub fn size_params(self) -> Vec4 {
        let w = self.width as f32;
        let h = self.height as f32;
        Vec4::new(w, h, 1.0 / w, 1.0 / h)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Returns the sizes of a `level_count + 1` long pyramid starting at `base`.
///
/// Entry 0 is `base` itself; entry `i` is entry `i - 1` halved (rounding up).
pub fn plan(base: TextureSize, level_count: usize) -> Result<Vec<TextureSize>> {
    if base.is_empty() {
        return Err(BloomError::InvalidParameter(format!(
            "base size {}x{} must be non-zero",
            base.width, base.height
        )));
    }
    if level_count == 0 {
        return Err(BloomError::InvalidParameter(
            "mip pyramid needs at least one downsample level".into(),
        ));
    }

    let mut sizes = Vec::with_capacity(level_count + 1);
    let mut current = base;
    sizes.push(current);
    for _ in 0..level_count {
        current = current.half();
        sizes.push(current);
    }
    Ok(sizes)
}

/// One level of an execution's pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel<H> {
    pub slot: MipSlot,
    pub size: TextureSize,
    /// Scratch texture backing this level.
    pub handle: H,
}

/// Every level of one bloom execution, finest first.
///
/// Lives for exactly one execution; nothing here is cached across frames.
#[derive(Debug, Clone)]
pub struct PyramidState<H> {
    levels: SmallVec<[MipLevel<H>; 11]>,
}

impl<H: Copy> PyramidState<H> {
    /// Plans `downsample_count + 1` levels for a scene color of size `base`
    /// and backs each one with a texture from `acquire`.
    ///
    /// Stops at the first failed acquisition; textures already handed out
    /// stay with whoever owns `acquire`'s bookkeeping.
    pub fn build(
        base: TextureSize,
        downsample_count: usize,
        mut acquire: impl FnMut(MipSlot, TextureSize) -> Result<H>,
    ) -> Result<Self> {
        let sizes = plan(base, downsample_count)?;
        let levels = sizes
            .into_iter()
            .enumerate()
            .map(|(i, size)| {
                let slot = MipSlot::level(i).ok_or_else(|| {
                    BloomError::InvalidParameter(format!("no slot for pyramid level {i}"))
                })?;
                Ok(MipLevel {
                    slot,
                    size,
                    handle: acquire(slot, size)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { levels })
    }

    /// Number of levels, including the full-resolution level 0.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of downsample steps (`len() - 1`).
    #[inline]
    #[must_use]
    pub fn downsample_count(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    #[inline]
    #[must_use]
    pub fn level(&self, index: usize) -> &MipLevel<H> {
        &self.levels[index]
    }

    #[inline]
    pub fn levels(&self) -> impl Iterator<Item = &MipLevel<H>> {
        self.levels.iter()
    }
}

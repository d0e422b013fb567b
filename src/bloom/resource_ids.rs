//! Stable resource keys
//!
//! Integer/enum identifiers for every texture slot and shader binding the
//! bloom pass touches. Keys are assigned once when the pyramid is planned, so
//! the per-dispatch path never hashes or compares strings.
//!
//! # Design
//!
//! 1. **`MipSlot`**: one key per pyramid level. Level 0 is the full-resolution
//!    blend target, levels `1..=N` are the downsampled mips.
//! 2. **`TextureSlot`**: logical texture bindings of a kernel.
//! 3. **`ScalarSlot`**: logical scalar/vector bindings of a kernel.
//!
//! The `shader_name()` accessors exist for debug labels and log output only.

use std::fmt;

/// Highest pyramid level a slot can address (`downsample_count` upper bound).
pub const MAX_MIP_SLOT: u8 = 10;

/// Stable key of one pyramid level's scratch texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MipSlot(u8);

impl MipSlot {
    /// The full-resolution blend target.
    pub const BLEND_TARGET: Self = Self(0);

    /// Key for pyramid level `level`, or `None` past [`MAX_MIP_SLOT`].
    #[inline]
    #[must_use]
    pub fn level(level: usize) -> Option<Self> {
        u8::try_from(level)
            .ok()
            .filter(|&l| l <= MAX_MIP_SLOT)
            .map(Self)
    }

    /// Pyramid level this slot refers to.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Debug label of the scratch texture bound to this slot.
    #[must_use]
    pub fn label(self) -> &'static str {
        const LABELS: [&str; MAX_MIP_SLOT as usize + 1] = [
            "Bloom Blend Target",
            "Bloom Mip 1",
            "Bloom Mip 2",
            "Bloom Mip 3",
            "Bloom Mip 4",
            "Bloom Mip 5",
            "Bloom Mip 6",
            "Bloom Mip 7",
            "Bloom Mip 8",
            "Bloom Mip 9",
            "Bloom Mip 10",
        ];
        LABELS[self.index()]
    }
}

impl fmt::Display for MipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logical texture binding of a bloom kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Texture being read (previous mip, coarser mip, or bloom result).
    Source,
    /// Storage texture being written.
    Target,
    /// The scene color target, read by the final blend.
    SceneColor,
}

impl TextureSlot {
    #[must_use]
    pub fn shader_name(self) -> &'static str {
        match self {
            Self::Source => "source_tex",
            Self::Target => "target_tex",
            Self::SceneColor => "color_tex",
        }
    }
}

/// Logical scalar (or packed vector) binding of a bloom kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarSlot {
    /// `(w, h, 1/w, 1/h)` of the source texture.
    SourceSize,
    /// `(w, h, 1/w, 1/h)` of the target texture.
    TargetSize,
    /// Luminance cut-off applied by the first downsample.
    LuminanceThreshold,
    /// `1 / downsample_count`, normalizing the summed octaves.
    InverseDownsampleCount,
    /// Final bloom contribution.
    BloomIntensity,
}

impl ScalarSlot {
    #[must_use]
    pub fn shader_name(self) -> &'static str {
        match self {
            Self::SourceSize => "source_size",
            Self::TargetSize => "target_size",
            Self::LuminanceThreshold => "luminance_threshold",
            Self::InverseDownsampleCount => "inv_downsample_count",
            Self::BloomIntensity => "bloom_intensity",
        }
    }
}

//! Bloom Post-Processing Configuration
//!
//! This module defines the per-frame bloom parameters as pure data. The host
//! owns a [`BloomSettings`] value, tweaks it through the clamping setters and
//! hands an immutable snapshot to the bloom pass every frame.
//!
//! Values are clamped where they are authored, so the pass can treat them as
//! pre-validated. [`BloomSettings::validate`] still re-checks the bounds for
//! callers that build the struct by other means (e.g. deserialization).
//!
//! # Parameters
//!
//! | Field | Range | Default |
//! |-------|-------|---------|
//! | `enabled` | | `true` |
//! | `luminance_threshold` | `[0, 5]` | `0.9` |
//! | `bloom_intensity` | `[0, 1]` | `1.0` |
//! | `downsample_count` | `[3, 10]` | `5` |

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::errors::{BloomError, Result};

/// Valid range of [`BloomSettings::luminance_threshold`].
pub const LUMINANCE_THRESHOLD_RANGE: RangeInclusive<f32> = 0.0..=5.0;
/// Valid range of [`BloomSettings::bloom_intensity`].
pub const BLOOM_INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Valid range of [`BloomSettings::downsample_count`].
pub const DOWNSAMPLE_COUNT_RANGE: RangeInclusive<u32> = 3..=10;

/// Bloom post-processing parameters.
///
/// # Usage
///
/// ```rust,ignore
/// let mut bloom = BloomSettings::default();
/// bloom.set_luminance_threshold(1.2);
/// bloom.set_bloom_intensity(0.6);
/// bloom.set_downsample_count(6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Whether bloom is enabled.
    pub enabled: bool,

    /// Pixels whose luminance falls below this value do not contribute to
    /// bloom. Applied once, by the first downsample.
    luminance_threshold: f32,

    /// How much of the accumulated bloom is added back onto the scene.
    bloom_intensity: f32,

    /// Number of downsample steps; the pyramid holds one more level than this.
    ///
    /// More levels produce a wider glow at the cost of additional dispatches.
    downsample_count: u32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            luminance_threshold: 0.9,
            bloom_intensity: 1.0,
            downsample_count: 5,
        }
    }
}

impl BloomSettings {
    /// Creates new bloom settings with default values (enabled).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the pass should run this frame.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn luminance_threshold(&self) -> f32 {
        self.luminance_threshold
    }

    #[inline]
    #[must_use]
    pub fn bloom_intensity(&self) -> f32 {
        self.bloom_intensity
    }

    #[inline]
    #[must_use]
    pub fn downsample_count(&self) -> u32 {
        self.downsample_count
    }

    /// Sets whether bloom is enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Sets the luminance threshold, clamped to `[0, 5]`. NaN maps to 0.
    pub fn set_luminance_threshold(&mut self, threshold: f32) {
        self.luminance_threshold = clamp_finite(threshold, &LUMINANCE_THRESHOLD_RANGE);
    }

    /// Sets the bloom intensity, clamped to `[0, 1]`. NaN maps to 0.
    pub fn set_bloom_intensity(&mut self, intensity: f32) {
        self.bloom_intensity = clamp_finite(intensity, &BLOOM_INTENSITY_RANGE);
    }

    /// Sets the number of downsample steps, clamped to `[3, 10]`.
    pub fn set_downsample_count(&mut self, count: u32) {
        self.downsample_count =
            count.clamp(*DOWNSAMPLE_COUNT_RANGE.start(), *DOWNSAMPLE_COUNT_RANGE.end());
    }

    /// Re-checks every bound.
    ///
    /// Settings produced through the setters always pass; this guards
    /// snapshots that were deserialized or otherwise constructed directly.
    pub fn validate(&self) -> Result<()> {
        if !LUMINANCE_THRESHOLD_RANGE.contains(&self.luminance_threshold) {
            return Err(BloomError::InvalidParameter(format!(
                "luminance threshold {} outside {LUMINANCE_THRESHOLD_RANGE:?}",
                self.luminance_threshold
            )));
        }
        if !BLOOM_INTENSITY_RANGE.contains(&self.bloom_intensity) {
            return Err(BloomError::InvalidParameter(format!(
                "bloom intensity {} outside {BLOOM_INTENSITY_RANGE:?}",
                self.bloom_intensity
            )));
        }
        if !DOWNSAMPLE_COUNT_RANGE.contains(&self.downsample_count) {
            return Err(BloomError::InvalidParameter(format!(
                "downsample count {} outside {DOWNSAMPLE_COUNT_RANGE:?}",
                self.downsample_count
            )));
        }
        Ok(())
    }
}

fn clamp_finite(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

//! Linear colors and fog channel masks.
//!
//! Fog buffers store two signals per pixel:
//! - **R**: permanent accumulation ("was ever revealed")
//! - **G**: current visibility ("is being revealed right now")

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// RGBA color in linear space.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct LinearColor {
    /// Red component (0-1).
    pub r: f32,
    /// Green component (0-1).
    pub g: f32,
    /// Blue component (0-1).
    pub b: f32,
    /// Alpha component (0-1).
    pub a: f32,
}

impl LinearColor {
    /// Transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    /// Solid black. Fog buffers are cleared to this.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Solid white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Creates a color from RGBA values (0-1).
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from RGB values (0-1) with full alpha.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Returns a new color with different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::rgba(
            self.r.max(other.r),
            self.g.max(other.g),
            self.b.max(other.b),
            self.a.max(other.a),
        )
    }

    /// Every channel multiplied by `factor`.
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self::rgba(self.r * factor, self.g * factor, self.b * factor, self.a * factor)
    }

    /// Reveal factor of a fog pixel: either signal counts.
    #[inline]
    #[must_use]
    pub fn reveal_factor(self) -> f32 {
        self.r.max(self.g).clamp(0.0, 1.0)
    }

    /// Converts to array format.
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Per-channel write mask used when painting revealers into fog staging.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ChannelMask(pub LinearColor);

impl ChannelMask {
    /// Writes every channel: counts as visible now and accumulates.
    pub const PERMANENT: Self = Self(LinearColor::rgba(1.0, 1.0, 1.0, 1.0));
    /// Skips the accumulation channel: visible now, forgotten later.
    pub const TEMPORARY: Self = Self(LinearColor::rgba(0.0, 1.0, 1.0, 1.0));

    /// Applies the mask to a uniform paint intensity.
    #[inline]
    #[must_use]
    pub fn apply(self, intensity: f32) -> LinearColor {
        self.0.scale(intensity)
    }

    /// Returns true if this mask writes the permanent channel.
    #[must_use]
    pub fn writes_permanent(self) -> bool {
        self.0.r > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_factor_uses_either_channel() {
        assert_eq!(LinearColor::rgba(0.3, 0.0, 0.0, 1.0).reveal_factor(), 0.3);
        assert_eq!(LinearColor::rgba(0.0, 0.7, 0.0, 1.0).reveal_factor(), 0.7);
        assert_eq!(LinearColor::rgba(2.0, 0.0, 0.0, 1.0).reveal_factor(), 1.0);
    }

    #[test]
    fn test_temporary_mask_skips_permanent_channel() {
        let painted = ChannelMask::TEMPORARY.apply(1.0);
        assert_eq!(painted.r, 0.0);
        assert_eq!(painted.g, 1.0);
        assert!(!ChannelMask::TEMPORARY.writes_permanent());
        assert!(ChannelMask::PERMANENT.writes_permanent());
    }
}

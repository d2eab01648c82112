//! Revealers and the stamps they paint into fog staging.

use serde::{Deserialize, Serialize};

use minimap_shared::constants::{DEFAULT_REVEAL_DROP_OFF, DEFAULT_REVEAL_EXTENT};
use minimap_shared::{ChannelMask, Vec2, Vec3};

use crate::view::ViewFrame;

use super::gpu::{FogMaterial, PaintQuad};

/// What a revealer writes into the fog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealMode {
    /// Paints nothing.
    Off,
    /// Visible while the revealer is there, forgotten afterwards.
    #[default]
    Temporary,
    /// Visible now and remembered forever.
    Permanent,
}

impl RevealMode {
    /// Channel mask for this mode, or None when off.
    #[must_use]
    pub const fn mask(self) -> Option<ChannelMask> {
        match self {
            Self::Off => None,
            Self::Temporary => Some(ChannelMask::TEMPORARY),
            Self::Permanent => Some(ChannelMask::PERMANENT),
        }
    }
}

/// An entity that clears fog around itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Revealer {
    /// World position.
    pub location: Vec3,
    /// World yaw in degrees.
    pub yaw: f32,
    /// Reveal mode.
    pub mode: RevealMode,
    extent: Vec2,
    drop_off: f32,
}

impl Revealer {
    /// Creates a temporary revealer with the default footprint.
    #[must_use]
    pub fn new(location: Vec3) -> Self {
        Self {
            location,
            yaw: 0.0,
            mode: RevealMode::default(),
            extent: Vec2::splat(DEFAULT_REVEAL_EXTENT),
            drop_off: DEFAULT_REVEAL_DROP_OFF,
        }
    }

    /// Returns the revealer with another mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: RevealMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the fully revealed half-extent, clamped to be non-negative.
    pub fn set_extent(&mut self, extent: Vec2) {
        self.extent = extent.max(Vec2::ZERO);
    }

    /// Sets the soft border width, clamped to be non-negative.
    pub fn set_drop_off(&mut self, drop_off: f32) {
        self.drop_off = drop_off.max(0.0);
    }

    /// Fully revealed half-extent.
    #[inline]
    #[must_use]
    pub const fn extent(&self) -> Vec2 {
        self.extent
    }

    /// Soft border width.
    #[inline]
    #[must_use]
    pub const fn drop_off(&self) -> f32 {
        self.drop_off
    }
}

/// A revealer footprint in fog pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealShape {
    /// Center in pixels.
    pub center: Vec2,
    /// Corners matching UVs (0,0), (1,0), (1,1), (0,1).
    pub corners: [Vec2; 4],
    /// Channels to write.
    pub mask: ChannelMask,
    /// Hard extent over total extent, per axis.
    pub drop_off: Vec2,
}

impl RevealShape {
    /// Quad to draw.
    #[must_use]
    pub fn quad(&self) -> PaintQuad {
        PaintQuad::from_corners(self.corners)
    }

    /// Material to draw the quad with.
    #[must_use]
    pub const fn material(&self) -> FogMaterial {
        FogMaterial::Reveal {
            mask: self.mask,
            drop_off: self.drop_off,
        }
    }
}

/// Computes the stamp a revealer paints into a fog buffer.
///
/// # Arguments
///
/// * `revealer` - The revealer
/// * `fog_frame` - Frame of the fog area
/// * `canvas_size` - Fog buffer size in pixels
/// * `world_to_pixel` - Fog pixels per world unit
///
/// # Returns
///
/// None for revealers that are off or have an empty extent.
#[must_use]
pub fn compute_shape(
    revealer: &Revealer,
    fog_frame: &ViewFrame,
    canvas_size: f32,
    world_to_pixel: f32,
) -> Option<RevealShape> {
    let mask = revealer.mode.mask()?;
    let extent = revealer.extent;
    if extent.x <= 0.0 || extent.y <= 0.0 {
        return None;
    }

    let center = fog_frame.world_to_view(revealer.location, true).uv * canvas_size;
    let half = (extent + Vec2::splat(revealer.drop_off)) * world_to_pixel;
    let yaw = fog_frame.world_yaw_to_view(revealer.yaw);

    let corners = [
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, 1.0),
    ]
    .map(|corner| center + corner.mul_elements(half).rotate(yaw));

    let total = extent + Vec2::splat(revealer.drop_off);
    Some(RevealShape {
        center,
        corners,
        mask,
        drop_off: Vec2::new(extent.x / total.x, extent.y / total.y),
    })
}

//! # Engine Configuration
//!
//! Plain config structs with defaults. All of them deserialize from TOML
//! tables (see `MinimapSettings` in the `minimap` crate); missing fields
//! fall back to [`Default`].

use serde::{Deserialize, Serialize};

use minimap_shared::constants::{
    DEFAULT_AREA_EXTENT, DEFAULT_BACKGROUND_CACHE_LIFETIME, DEFAULT_FOG_CACHE_LIFETIME,
    DEFAULT_FOG_RESOLUTION, DEFAULT_SNAPSHOT_RESOLUTION, DEFAULT_VIEW_EXTENT, DEFAULT_YAW_OFFSET,
};
use minimap_shared::{Vec2, Vec3};

use crate::error::{MinimapError, MinimapResult};
use crate::fog::CombinePolicy;
use crate::view::RotationPolicy;

/// Configuration for a player-facing map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Unscaled half-extent of the view footprint, in world units.
    pub extent: Vec2,
    /// Zoom scale. Larger values show more of the world.
    pub zoom: f32,
    /// How the view is oriented.
    pub rotation: RotationPolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            extent: Vec2::splat(DEFAULT_VIEW_EXTENT),
            zoom: 1.0,
            rotation: RotationPolicy::InheritYaw { offset: DEFAULT_YAW_OFFSET },
        }
    }
}

impl ViewConfig {
    /// Rejects values the view would otherwise have to clamp.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::InvalidConfig`] for non-positive extents or zoom.
    pub fn validate(&self) -> MinimapResult<()> {
        if self.extent.x.is_nan() || self.extent.y.is_nan() || self.extent.x <= 0.0 || self.extent.y <= 0.0 {
            return Err(MinimapError::InvalidConfig(format!(
                "view extent must be positive, got ({}, {})",
                self.extent.x, self.extent.y
            )));
        }
        if self.zoom.is_nan() || self.zoom <= 0.0 {
            return Err(MinimapError::InvalidConfig(format!(
                "view zoom must be positive, got {}",
                self.zoom
            )));
        }
        Ok(())
    }
}

/// Lifetimes of the time-based caches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds between background priority/level refreshes.
    pub background_lifetime: f64,
    /// Seconds a CPU copy of a fog buffer stays valid.
    pub fog_read_lifetime: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            background_lifetime: DEFAULT_BACKGROUND_CACHE_LIFETIME,
            fog_read_lifetime: DEFAULT_FOG_CACHE_LIFETIME,
        }
    }
}

impl CacheConfig {
    /// Rejects negative or non-finite lifetimes.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::InvalidConfig`] if a lifetime is negative.
    pub fn validate(&self) -> MinimapResult<()> {
        for (name, value) in [
            ("background_lifetime", self.background_lifetime),
            ("fog_read_lifetime", self.fog_read_lifetime),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MinimapError::InvalidConfig(format!(
                    "cache {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Opacity of the fog layer on the minimap, per reveal state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogOpacity {
    /// Never revealed.
    pub hidden: f32,
    /// Revealed before, not currently.
    pub explored: f32,
    /// Currently being revealed.
    pub revealing: f32,
}

impl Default for FogOpacity {
    fn default() -> Self {
        Self {
            hidden: 0.5,
            explored: 0.8,
            revealing: 1.0,
        }
    }
}

/// Configuration for a fog-of-war area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Square buffer resolution in pixels.
    pub resolution: u32,
    /// How staging paint is folded into the permanent buffer.
    pub combine: CombinePolicy,
    /// Minimap layer opacities.
    pub opacity: FogOpacity,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_FOG_RESOLUTION,
            combine: CombinePolicy::Accumulate,
            opacity: FogOpacity::default(),
        }
    }
}

impl FogConfig {
    /// Rejects a zero resolution.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::InvalidConfig`] if the resolution is zero.
    pub fn validate(&self) -> MinimapResult<()> {
        if self.resolution == 0 {
            return Err(MinimapError::InvalidConfig(
                "fog resolution must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for background areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Default half-extent of a new background area.
    pub extent: Vec3,
    /// Resolution of auto-generated snapshots.
    pub snapshot_resolution: u32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            extent: Vec3::new(
                DEFAULT_AREA_EXTENT[0],
                DEFAULT_AREA_EXTENT[1],
                DEFAULT_AREA_EXTENT[2],
            ),
            snapshot_resolution: DEFAULT_SNAPSHOT_RESOLUTION,
        }
    }
}

/// Registry capacities. All slots are pre-allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum live icons.
    pub max_icons: usize,
    /// Maximum live background areas.
    pub max_backgrounds: usize,
    /// Maximum live fog areas.
    pub max_fogs: usize,
    /// Maximum live revealers.
    pub max_revealers: usize,
    /// Maximum live views.
    pub max_views: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_icons: 4096,
            max_backgrounds: 64,
            max_fogs: 8,
            max_revealers: 512,
            max_views: 8,
        }
    }
}

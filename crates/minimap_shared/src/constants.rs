//! # Engine Constants
//!
//! Default tuning values. Runtime overrides come from the config structs
//! in `minimap_core::config`.

// =============================================================================
// VIEW
// =============================================================================

/// Smallest allowed zoom scale.
pub const MIN_ZOOM: f32 = 1.0e-4;

/// Smallest allowed view half-extent on either axis.
pub const MIN_VIEW_EXTENT: f32 = 0.01;

/// Default yaw offset for views that inherit their owner's yaw.
pub const DEFAULT_YAW_OFFSET: f32 = 90.0;

/// Default half-extent of a player view, in world units.
pub const DEFAULT_VIEW_EXTENT: f32 = 1024.0;

// =============================================================================
// CACHES
// =============================================================================

/// Seconds a background priority/level cache stays valid.
pub const DEFAULT_BACKGROUND_CACHE_LIFETIME: f64 = 0.05;

/// Seconds a CPU copy of a fog buffer stays valid.
pub const DEFAULT_FOG_CACHE_LIFETIME: f64 = 0.05;

// =============================================================================
// BACKGROUNDS
// =============================================================================

/// Default background area half-extent (X, Y, Z).
pub const DEFAULT_AREA_EXTENT: [f32; 3] = [2048.0, 2048.0, 1024.0];

/// Default resolution of auto-generated background snapshots.
pub const DEFAULT_SNAPSHOT_RESOLUTION: u32 = 1024;

/// Smallest snapshot resolution accepted.
pub const MIN_SNAPSHOT_RESOLUTION: u32 = 128;

// =============================================================================
// FOG
// =============================================================================

/// Default fog buffer resolution (square).
pub const DEFAULT_FOG_RESOLUTION: u32 = 256;

/// Smallest fog buffer resolution accepted.
pub const MIN_FOG_RESOLUTION: u32 = 2;

/// Default revealer half-extent, in world units.
pub const DEFAULT_REVEAL_EXTENT: f32 = 128.0;

/// Default revealer drop-off distance, in world units.
pub const DEFAULT_REVEAL_DROP_OFF: f32 = 100.0;

// =============================================================================
// ICONS
// =============================================================================

/// Default icon size (pixels or world units depending on the size unit).
pub const DEFAULT_ICON_SIZE: f32 = 32.0;

/// Default edge-arrow size, in pixels.
pub const DEFAULT_ARROW_SIZE: f32 = 50.0;

/// Default fog reveal threshold for fog-gated icons.
pub const DEFAULT_FOG_REVEAL_THRESHOLD: f32 = 0.5;

// =============================================================================
// COMPOSITOR
// =============================================================================

/// Segments used to draw a circular boundary.
pub const BOUNDARY_CIRCLE_SEGMENTS: usize = 64;

/// Default minimap widget size, in pixels.
pub const DEFAULT_MINIMAP_SIZE: f32 = 200.0;

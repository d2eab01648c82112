//! # Level Resolution
//!
//! Maps a world height onto one of a background's stacked height bands.
//!
//! ```text
//!   relative height (from the volume bottom)
//!        ▲
//!        │  ┌──────────────┐  level 2: open-ended, absorbs overflow
//!   300 ─┼──┤              │
//!        │  │   level 1    │  ceiling = 100 + 200
//!   100 ─┼──┤              │
//!        │  │   level 0    │  ceiling = 100, also absorbs negatives
//!     0 ─┴──┴──────────────┘
//! ```

/// Height of `world_z` above the bottom of a volume.
///
/// # Arguments
///
/// * `world_z` - Query height in world space
/// * `center_z` - Volume center height
/// * `extent_z` - Volume half-height
#[inline]
#[must_use]
pub fn relative_height(world_z: f32, center_z: f32, extent_z: f32) -> f32 {
    world_z - (center_z - extent_z)
}

/// Resolves which level a relative height falls in.
///
/// Levels are consumed in order and each adds its height to a running
/// ceiling. The first level whose ceiling is above `relative_height` wins;
/// heights above every ceiling resolve to the last level.
///
/// # Returns
///
/// The level index, or None if there are no levels at all.
#[must_use]
pub fn resolve(relative_height: f32, level_heights: impl IntoIterator<Item = f32>) -> Option<usize> {
    let mut ceiling = 0.0;
    let mut last = None;
    for (index, height) in level_heights.into_iter().enumerate() {
        ceiling += height;
        if ceiling > relative_height {
            return Some(index);
        }
        last = Some(index);
    }
    last
}

//! # Background Volume
//!
//! A world region bound to one background image per height level.
//!
//! Each level either carries a static texture (stretched over the whole
//! volume) or a render target filled from a top-down scene snapshot.
//! Snapshots are square, so only the part matching the volume's aspect
//! ratio is sampled.

use minimap_shared::constants::MIN_SNAPSHOT_RESOLUTION;
use minimap_shared::{TextureHandle, Transform, Vec2, Vec3};

use crate::config::BackgroundConfig;
use crate::error::{MinimapError, MinimapResult};
use crate::level;
use crate::view::{RotationPolicy, ViewFrame};

use super::snapshot::{CaptureRequest, SceneSnapshot};

/// One height band of a background.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BackgroundLevel {
    /// Static texture. Takes precedence over the render target.
    pub texture: Option<TextureHandle>,
    /// Snapshot target, filled by [`BackgroundVolume::render_snapshots`].
    pub render_target: Option<TextureHandle>,
    /// Optional overlay drawn over the level.
    pub overlay: Option<TextureHandle>,
    /// Configured height of the band. Ignored for the last level.
    pub level_height: f32,
    /// Pixel size of the sampled part of the active texture.
    sampling_resolution: Vec2,
}

impl BackgroundLevel {
    /// Creates an empty level of the given height.
    #[must_use]
    pub fn new(level_height: f32) -> Self {
        Self {
            level_height,
            ..Self::default()
        }
    }

    /// Creates a level showing a static texture.
    #[must_use]
    pub fn with_texture(level_height: f32, texture: TextureHandle) -> Self {
        Self {
            texture: Some(texture),
            ..Self::new(level_height)
        }
    }

    /// Texture to draw: the static texture if set, else the snapshot.
    #[inline]
    #[must_use]
    pub fn active_texture(&self) -> Option<TextureHandle> {
        self.texture.or(self.render_target)
    }

    /// Pixel size of the sampled part of the active texture.
    #[inline]
    #[must_use]
    pub const fn sampling_resolution(&self) -> Vec2 {
        self.sampling_resolution
    }
}

/// Change notifications pushed by a background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundEvent {
    /// Visibility, priority, z-order or a texture changed.
    AppearanceChanged,
    /// A level was re-rendered from a scene snapshot.
    Rendered {
        /// Level index.
        level: usize,
    },
    /// A level's overlay was replaced.
    OverlayChanged {
        /// Level index.
        level: usize,
    },
}

/// A background area.
///
/// # Example
///
/// ```rust,ignore
/// let mut bg = BackgroundVolume::new(Transform::from_location(center), Vec3::new(2048.0, 2048.0, 1024.0));
/// bg.set_levels(vec![
///     BackgroundLevel::with_texture(400.0, basement),
///     BackgroundLevel::with_texture(0.0, ground_floor),
/// ]);
/// let level = bg.level_at_height(player_z);
/// ```
#[derive(Debug, Clone)]
pub struct BackgroundVolume {
    /// Level transform of the volume. Scale is always one.
    transform: Transform,
    /// Half-extent before scaling.
    unscaled_extent: Vec3,
    /// Scale taken from the last owner transform.
    scale: Vec3,
    /// Scaled half-extent.
    extent: Vec3,
    /// Frame mapping the volume onto the unit square.
    frame: ViewFrame,
    levels: Vec<BackgroundLevel>,
    visible: bool,
    priority: i32,
    z_order: i32,
    snapshot_resolution: u32,
    /// Entity ids excluded from snapshots.
    hidden_entities: Vec<u64>,
    snapshot_dirty: bool,
    events: Vec<BackgroundEvent>,
}

impl BackgroundVolume {
    /// Creates a volume with a single empty level.
    ///
    /// # Arguments
    ///
    /// * `transform` - Owner transform; scale is folded into `extent`
    /// * `extent` - Unscaled half-extent
    #[must_use]
    pub fn new(transform: Transform, extent: Vec3) -> Self {
        let mut volume = Self {
            transform: Transform::IDENTITY,
            unscaled_extent: extent,
            scale: Vec3::ONE,
            extent,
            frame: ViewFrame::new(extent.xy(), RotationPolicy::Fixed { yaw: 0.0 }),
            levels: Vec::new(),
            visible: true,
            priority: 0,
            z_order: 0,
            snapshot_resolution: BackgroundConfig::default().snapshot_resolution,
            hidden_entities: Vec::new(),
            snapshot_dirty: true,
            events: Vec::new(),
        };
        volume.ensure_level();
        volume.apply_transform(transform);
        volume
    }

    /// Creates a volume using the configured extent and snapshot size.
    #[must_use]
    pub fn from_config(transform: Transform, config: &BackgroundConfig) -> Self {
        let mut volume = Self::new(transform, config.extent);
        volume.set_snapshot_resolution(config.snapshot_resolution);
        volume
    }

    // =========================================================================
    // Transform
    // =========================================================================

    /// Moves, rotates or rescales the volume.
    ///
    /// Scale is folded into the extent so the stored transform stays at unit
    /// scale. Any change marks snapshots for re-rendering.
    pub fn set_transform(&mut self, transform: Transform) {
        let previous = (self.transform, self.extent);
        self.apply_transform(transform);
        if previous != (self.transform, self.extent) {
            self.snapshot_dirty = true;
        }
    }

    /// Replaces the unscaled half-extent.
    pub fn set_extent(&mut self, extent: Vec3) {
        if extent != self.unscaled_extent {
            self.unscaled_extent = extent;
            self.extent = extent.mul_elements(self.scale);
            self.rebuild_frame();
            self.snapshot_dirty = true;
        }
    }

    fn apply_transform(&mut self, transform: Transform) {
        self.scale = transform.scale;
        self.extent = self.unscaled_extent.mul_elements(transform.scale);
        self.transform = Transform::new(transform.location, transform.rotation, Vec3::ONE);
        self.rebuild_frame();
    }

    fn rebuild_frame(&mut self) {
        self.frame.set_extent(self.extent.xy());
        self.frame.set_rotation_policy(RotationPolicy::Fixed {
            yaw: self.transform.rotation.yaw,
        });
        self.frame.set_owner_transform(self.transform);
        // Size notifications are for player views; nothing listens here
        self.frame.drain_events().for_each(drop);
        self.update_sampling_resolutions();
    }

    // =========================================================================
    // Levels
    // =========================================================================

    fn ensure_level(&mut self) {
        if self.levels.is_empty() {
            self.levels.push(BackgroundLevel::default());
        }
    }

    /// Replaces every level. An empty list leaves one empty level.
    pub fn set_levels(&mut self, levels: Vec<BackgroundLevel>) {
        self.levels = levels;
        self.ensure_level();
        self.snapshot_dirty = true;
        self.update_sampling_resolutions();
        self.events.push(BackgroundEvent::AppearanceChanged);
    }

    /// All levels, bottom first. Never empty.
    #[inline]
    #[must_use]
    pub fn levels(&self) -> &[BackgroundLevel] {
        &self.levels
    }

    /// True if the volume has more than one level.
    #[inline]
    #[must_use]
    pub fn is_multi_level(&self) -> bool {
        self.levels.len() > 1
    }

    /// Sets or clears the static texture of a level.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::LevelOutOfRange`] for an unknown level.
    pub fn set_level_texture(&mut self, level: usize, texture: Option<TextureHandle>) -> MinimapResult<()> {
        let entry = self.level_mut(level)?;
        if entry.texture != texture {
            entry.texture = texture;
            self.update_sampling_resolutions();
            self.events.push(BackgroundEvent::AppearanceChanged);
        }
        Ok(())
    }

    /// Sets or clears the overlay of a level.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::LevelOutOfRange`] for an unknown level.
    pub fn set_level_overlay(&mut self, level: usize, overlay: Option<TextureHandle>) -> MinimapResult<()> {
        let entry = self.level_mut(level)?;
        if entry.overlay != overlay {
            entry.overlay = overlay;
            self.events.push(BackgroundEvent::OverlayChanged { level });
        }
        Ok(())
    }

    fn level_mut(&mut self, level: usize) -> MinimapResult<&mut BackgroundLevel> {
        let count = self.levels.len();
        self.levels
            .get_mut(level)
            .ok_or(MinimapError::LevelOutOfRange { index: level, count })
    }

    /// Level index at a world height.
    #[must_use]
    pub fn level_at_height(&self, world_z: f32) -> Option<usize> {
        let relative = level::relative_height(world_z, self.transform.location.z, self.extent.z);
        level::resolve(relative, self.levels.iter().map(|l| l.level_height))
    }

    /// Texture of the level at a world height.
    #[must_use]
    pub fn texture_at_height(&self, world_z: f32) -> Option<TextureHandle> {
        self.level_at_height(world_z)
            .and_then(|index| self.levels.get(index))
            .and_then(BackgroundLevel::active_texture)
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// Recomputes which part of each level's texture is sampled.
    pub fn update_sampling_resolutions(&mut self) {
        let aspect = self.frame.aspect_ratio();
        for entry in &mut self.levels {
            entry.sampling_resolution = match (entry.texture, entry.render_target) {
                (Some(texture), _) => texture.size(),
                (None, Some(target)) => {
                    let size = target.size();
                    Vec2::new(
                        if aspect >= 1.0 { size.x } else { size.y * aspect },
                        if aspect > 1.0 { size.x / aspect } else { size.y },
                    )
                }
                (None, None) => Vec2::ZERO,
            };
        }
    }

    /// Maps a unit UV into the sampled part of a level's texture.
    ///
    /// Static textures are stretched over the volume and pass through
    /// unchanged; snapshots are cropped around their center.
    #[must_use]
    pub fn correct_uv(&self, level: usize, uv: Vec2) -> Vec2 {
        let Some(entry) = self.levels.get(level) else {
            return uv;
        };
        match (entry.texture, entry.render_target) {
            (None, Some(target)) if target.width > 0 && target.height > 0 => {
                let ratio = Vec2::new(
                    entry.sampling_resolution.x / target.size().x,
                    entry.sampling_resolution.y / target.size().y,
                );
                Vec2::HALF + (uv - Vec2::HALF).mul_elements(ratio)
            }
            _ => uv,
        }
    }

    /// Texture UVs of the part of this volume covered by `view`.
    ///
    /// Corners follow the view's corner order. `own_view` marks the view
    /// that shows exactly this volume, which always gets the full texture.
    ///
    /// # Returns
    ///
    /// None if the view does not overlap the volume at all.
    #[must_use]
    pub fn corner_uvs(&self, level: usize, view: &ViewFrame, own_view: bool) -> Option<[Vec2; 4]> {
        if own_view {
            return Some(
                [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::ONE, Vec2::new(0.0, 1.0)]
                    .map(|uv| self.correct_uv(level, uv)),
            );
        }

        let raw = view
            .world_corners()
            .map(|corner| self.frame.world_to_view(corner, false).uv);

        let (min, max) = raw
            .iter()
            .fold((raw[0], raw[0]), |(lo, hi), uv| (lo.min(*uv), hi.max(*uv)));
        if max.x < 0.0 || max.y < 0.0 || min.x > 1.0 || min.y > 1.0 {
            return None;
        }

        Some(raw.map(|uv| self.correct_uv(level, uv)))
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Sets the snapshot resolution, at least 128 pixels.
    pub fn set_snapshot_resolution(&mut self, resolution: u32) {
        let clamped = resolution.max(MIN_SNAPSHOT_RESOLUTION);
        if clamped != resolution {
            tracing::warn!("Snapshot resolution {} clamped to {}", resolution, clamped);
        }
        if clamped != self.snapshot_resolution {
            self.snapshot_resolution = clamped;
            self.snapshot_dirty = true;
        }
    }

    /// Excludes an entity from future snapshots.
    pub fn hide_entity(&mut self, entity: u64) {
        if !self.hidden_entities.contains(&entity) {
            self.hidden_entities.push(entity);
            self.snapshot_dirty = true;
        }
    }

    /// Entities excluded from snapshots.
    #[must_use]
    pub fn hidden_entities(&self) -> &[u64] {
        &self.hidden_entities
    }

    /// True if a level without static texture needs a new snapshot.
    #[must_use]
    pub fn needs_snapshot(&self) -> bool {
        self.snapshot_dirty && self.levels.iter().any(|l| l.texture.is_none())
    }

    /// Marks snapshots for re-rendering.
    pub fn request_rerender(&mut self) {
        self.snapshot_dirty = true;
    }

    /// Capture height of each level relative to the volume center.
    ///
    /// Heights accumulate from the volume bottom; the last level captures
    /// from twice the half-height so all geometry above it is included.
    #[must_use]
    pub fn capture_heights(&self) -> Vec<f32> {
        let last = self.levels.len() - 1;
        let mut height = -self.extent.z;
        self.levels
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                if index == last {
                    height = 2.0 * self.extent.z;
                } else {
                    height += entry.level_height;
                }
                height
            })
            .collect()
    }

    /// Renders every level that has no static texture.
    ///
    /// # Returns
    ///
    /// The number of levels that were captured.
    pub fn render_snapshots(&mut self, snapshot: &mut dyn SceneSnapshot) -> usize {
        let heights = self.capture_heights();
        let radius = self.extent.x.max(self.extent.y);
        let mut rendered = 0;

        for (index, height) in heights.into_iter().enumerate() {
            if self.levels[index].texture.is_some() {
                continue;
            }
            let request = CaptureRequest {
                center: self.transform.location + Vec3::new(0.0, 0.0, height),
                yaw: self.transform.rotation.yaw,
                radius,
                resolution: self.snapshot_resolution,
                target: self.levels[index].render_target,
                hidden: &self.hidden_entities,
            };
            if let Some(target) = snapshot.capture(&request) {
                self.levels[index].render_target = Some(target);
                self.events.push(BackgroundEvent::Rendered { level: index });
                rendered += 1;
            }
        }

        self.snapshot_dirty = false;
        self.update_sampling_resolutions();
        if rendered > 0 {
            tracing::info!("Background snapshot rendered: {} levels", rendered);
            self.events.push(BackgroundEvent::AppearanceChanged);
        }
        rendered
    }

    // =========================================================================
    // Appearance
    // =========================================================================

    /// Shows or hides the volume.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.events.push(BackgroundEvent::AppearanceChanged);
        }
    }

    /// Sets the priority used when volumes overlap.
    pub fn set_priority(&mut self, priority: i32) {
        if self.priority != priority {
            self.priority = priority;
            self.events.push(BackgroundEvent::AppearanceChanged);
        }
    }

    /// Sets the draw order among simultaneously visible volumes.
    pub fn set_z_order(&mut self, z_order: i32) {
        if self.z_order != z_order {
            self.z_order = z_order;
            self.events.push(BackgroundEvent::AppearanceChanged);
        }
    }

    /// Drains pending change notifications.
    pub fn drain_events(&mut self) -> impl Iterator<Item = BackgroundEvent> + '_ {
        self.events.drain(..)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True if the point is inside the volume's forced-rectangular footprint.
    #[inline]
    #[must_use]
    pub fn contains(&self, world: Vec3) -> bool {
        self.frame.world_to_view(world, true).in_view
    }

    /// Frame mapping the volume onto the unit square.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    /// Unit-scale transform of the volume.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> Transform {
        self.transform
    }

    /// Scaled half-extent.
    #[inline]
    #[must_use]
    pub const fn extent(&self) -> Vec3 {
        self.extent
    }

    /// Whether the volume is drawn and considered for priority.
    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Overlap priority.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Draw order.
    #[inline]
    #[must_use]
    pub const fn z_order(&self) -> i32 {
        self.z_order
    }

    /// Snapshot resolution in pixels.
    #[inline]
    #[must_use]
    pub const fn snapshot_resolution(&self) -> u32 {
        self.snapshot_resolution
    }
}

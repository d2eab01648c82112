//! # View Frame
//!
//! Per-view world <-> map transform cache.
//!
//! ```text
//!   owner transform ──┐
//!   zoom ─────────────┼──► effective transform ──(changed?)──► FrameCache
//!   rotation policy ──┘                                        │
//!                                                              ▼
//!   world pos ──► inverse (unrotate, unscale) ──► × inverse half-size ──► (u, v)
//! ```
//!
//! The cache is revalidated lazily on every query by comparing the live
//! effective transform with the one observed last time (value equality).
//! Repeated queries in the same frame cost one comparison each.

use std::cell::Cell;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use minimap_shared::constants::{MIN_VIEW_EXTENT, MIN_ZOOM};
use minimap_shared::{Transform, Vec2, Vec3};

use crate::config::ViewConfig;

/// How a view derives its orientation from its owner.
///
/// Both policies keep the frame level: pitch and roll never reach the
/// cached transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Ignore the owner's rotation and use a fixed yaw.
    Fixed {
        /// Yaw in degrees.
        yaw: f32,
    },
    /// Follow the owner's yaw plus a constant offset.
    InheritYaw {
        /// Offset added to the owner's yaw, in degrees.
        offset: f32,
    },
}

/// Result of projecting a world point into a view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    /// Normalized map coordinates. The view center is (0.5, 0.5).
    pub uv: Vec2,
    /// True if `uv` lies inside the unit square.
    ///
    /// Always a rectangular test, even for circular minimaps; callers that
    /// need circular containment test it separately.
    pub in_view: bool,
}

/// Change notifications pushed by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// The unscaled extent changed.
    SizeChanged,
    /// An icon category was shown or hidden.
    CategoriesChanged,
}

#[derive(Debug, Clone, Copy)]
struct FrameCache {
    observed: Option<Transform>,
    location: Vec3,
    yaw: f32,
    scale: Vec3,
}

impl FrameCache {
    const EMPTY: Self = Self {
        observed: None,
        location: Vec3::ZERO,
        yaw: 0.0,
        scale: Vec3::ONE,
    };
}

/// A camera onto the map: which world region maps to the unit UV square.
///
/// # Example
///
/// ```rust,ignore
/// let mut view = ViewFrame::new(Vec2::new(1000.0, 1000.0), RotationPolicy::Fixed { yaw: 0.0 });
/// view.set_owner_transform(Transform::from_location(player_pos));
///
/// let p = view.world_to_view(enemy_pos, false);
/// if p.in_view {
///     draw_icon_at(p.uv);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ViewFrame {
    /// Live transform of whatever owns the view.
    owner: Transform,
    /// Uniform zoom, folded into the effective scale.
    zoom: f32,
    /// Half-extent before zoom.
    unscaled_extent: Vec2,
    /// Orientation policy.
    policy: RotationPolicy,
    /// `1 / (2 * unscaled_extent)` per axis.
    inverse_view_size: Vec2,
    /// Max of the two inverse sizes, used for uniform projection.
    inverse_view_radius: f32,
    /// World Z used for level resolution instead of the view's own.
    height_source: Option<f32>,
    /// Icon categories this view does not draw.
    hidden_categories: HashSet<String>,
    cache: Cell<FrameCache>,
    rebuilds: Cell<u64>,
    events: Vec<ViewEvent>,
}

impl ViewFrame {
    /// Creates a view with unit zoom at the origin.
    ///
    /// # Arguments
    ///
    /// * `extent` - Unscaled half-extent, clamped to at least 0.01 per axis
    /// * `policy` - Rotation policy
    #[must_use]
    pub fn new(extent: Vec2, policy: RotationPolicy) -> Self {
        let mut frame = Self {
            owner: Transform::IDENTITY,
            zoom: 1.0,
            unscaled_extent: Vec2::ONE,
            policy,
            inverse_view_size: Vec2::HALF,
            inverse_view_radius: 0.5,
            height_source: None,
            hidden_categories: HashSet::new(),
            cache: Cell::new(FrameCache::EMPTY),
            rebuilds: Cell::new(0),
            events: Vec::new(),
        };
        frame.apply_extent(extent);
        frame
    }

    /// Creates a view from configuration.
    #[must_use]
    pub fn from_config(config: &ViewConfig) -> Self {
        let mut frame = Self::new(config.extent, config.rotation);
        frame.set_zoom(config.zoom);
        frame
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Updates the owner transform. The cache notices on the next query.
    #[inline]
    pub fn set_owner_transform(&mut self, transform: Transform) {
        self.owner = transform;
    }

    /// Sets the zoom scale, clamped to a small positive epsilon.
    pub fn set_zoom(&mut self, zoom: f32) {
        let clamped = if zoom.is_nan() { MIN_ZOOM } else { zoom.max(MIN_ZOOM) };
        if clamped != zoom {
            tracing::warn!("View zoom {} clamped to {}", zoom, clamped);
        }
        self.zoom = clamped;
    }

    /// Sets the unscaled half-extent and pushes [`ViewEvent::SizeChanged`].
    pub fn set_extent(&mut self, extent: Vec2) {
        if self.apply_extent(extent) {
            self.events.push(ViewEvent::SizeChanged);
        }
    }

    /// Replaces the rotation policy and drops the cached transform.
    pub fn set_rotation_policy(&mut self, policy: RotationPolicy) {
        self.policy = policy;
        self.cache.set(FrameCache::EMPTY);
    }

    /// Overrides the world Z used for level resolution.
    ///
    /// `None` resolves levels at the view's own height.
    #[inline]
    pub fn set_height_source(&mut self, height: Option<f32>) {
        self.height_source = height;
    }

    /// Shows or hides an icon category. Pushes an event only on change.
    pub fn set_category_visible(&mut self, category: &str, visible: bool) {
        let changed = if visible {
            self.hidden_categories.remove(category)
        } else {
            self.hidden_categories.insert(category.to_string())
        };
        if changed {
            self.events.push(ViewEvent::CategoriesChanged);
        }
    }

    /// Drains pending change notifications.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ViewEvent> + '_ {
        self.events.drain(..)
    }

    fn apply_extent(&mut self, extent: Vec2) -> bool {
        let clamped = Vec2::new(
            extent.x.max(MIN_VIEW_EXTENT),
            extent.y.max(MIN_VIEW_EXTENT),
        );
        if clamped != extent {
            tracing::warn!(
                "View extent ({}, {}) clamped to ({}, {})",
                extent.x, extent.y, clamped.x, clamped.y
            );
        }
        if clamped == self.unscaled_extent {
            return false;
        }

        self.unscaled_extent = clamped;
        self.inverse_view_size = Vec2::new(1.0 / (2.0 * clamped.x), 1.0 / (2.0 * clamped.y));
        self.inverse_view_radius = self.inverse_view_size.max_element();
        true
    }

    // =========================================================================
    // Cache
    // =========================================================================

    fn effective_transform(&self) -> Transform {
        Transform::new(
            self.owner.location,
            self.owner.rotation,
            self.owner.scale * self.zoom,
        )
    }

    fn frame(&self) -> FrameCache {
        let live = self.effective_transform();
        let cached = self.cache.get();
        if cached.observed == Some(live) {
            return cached;
        }

        let yaw = match self.policy {
            RotationPolicy::Fixed { yaw } => yaw,
            RotationPolicy::InheritYaw { offset } => live.rotation.yaw + offset,
        };
        let rebuilt = FrameCache {
            observed: Some(live),
            location: live.location,
            yaw,
            scale: live.scale,
        };
        self.cache.set(rebuilt);
        self.rebuilds.set(self.rebuilds.get() + 1);
        rebuilt
    }

    /// Number of times the transform cache was rebuilt.
    #[must_use]
    pub fn cache_rebuilds(&self) -> u64 {
        self.rebuilds.get()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Projects a world point into map UV space.
    ///
    /// # Arguments
    ///
    /// * `world` - World position
    /// * `force_rectangular` - Use the uniform inverse radius on both axes
    ///   (circular minimaps and volume containment) instead of per-axis sizes
    #[must_use]
    pub fn world_to_view(&self, world: Vec3, force_rectangular: bool) -> ViewProjection {
        let frame = self.frame();
        let local = (world - frame.location)
            .xy()
            .rotate(-frame.yaw)
            .mul_elements(Vec2::new(safe_reciprocal(frame.scale.x), safe_reciprocal(frame.scale.y)));

        let factor = if force_rectangular {
            Vec2::splat(self.inverse_view_radius)
        } else {
            self.inverse_view_size
        };
        let uv = Vec2::HALF + local.mul_elements(factor);
        let in_view = !(uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0);

        ViewProjection { uv, in_view }
    }

    /// Converts a world yaw into a yaw relative to the view.
    #[inline]
    #[must_use]
    pub fn world_yaw_to_view(&self, yaw: f32) -> f32 {
        yaw - self.frame().yaw
    }

    /// Converts map UV back to a world position on the view's plane.
    ///
    /// Deprojects against the unscaled footprint: zoom is not applied.
    #[must_use]
    pub fn view_to_world(&self, uv: Vec2) -> Vec3 {
        let frame = self.frame();
        let local = Vec2::new(
            (uv.x - 0.5) * 2.0 * self.unscaled_extent.x,
            (uv.y - 0.5) * 2.0 * self.unscaled_extent.y,
        )
        .rotate(frame.yaw);
        Vec3::new(
            frame.location.x + local.x,
            frame.location.y + local.y,
            frame.location.z,
        )
    }

    /// Cheap circular overlap test against the scaled footprint.
    ///
    /// May report overlap for points just outside the rectangle; never
    /// misses a point that is inside it.
    #[must_use]
    pub fn broad_contains(&self, world: Vec3, radius: f32) -> bool {
        let frame = self.frame();
        let extent = self.extent();
        let reach_x = extent.x + radius;
        let reach_y = extent.y + radius;
        world.distance_squared_2d(frame.location) < reach_x * reach_x + reach_y * reach_y
    }

    /// World positions of the footprint corners.
    ///
    /// Ordered to match UV corners (0,0), (1,0), (1,1), (0,1).
    #[must_use]
    pub fn world_corners(&self) -> [Vec3; 4] {
        let frame = self.frame();
        let extent = self.extent();
        [
            Vec2::new(-extent.x, -extent.y),
            Vec2::new(extent.x, -extent.y),
            Vec2::new(extent.x, extent.y),
            Vec2::new(-extent.x, extent.y),
        ]
        .map(|corner| {
            let offset = corner.rotate(frame.yaw);
            Vec3::new(
                frame.location.x + offset.x,
                frame.location.y + offset.y,
                frame.location.z,
            )
        })
    }

    /// Width over height of the footprint, or 1 for a degenerate height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        if extent.y == 0.0 {
            1.0
        } else {
            extent.x / extent.y
        }
    }

    /// UV units per world unit along the view's X axis.
    #[must_use]
    pub fn uv_per_world(&self, force_rectangular: bool) -> f32 {
        let factor = if force_rectangular {
            self.inverse_view_radius
        } else {
            self.inverse_view_size.x
        };
        factor * safe_reciprocal(self.frame().scale.x)
    }

    /// Half-extent after zoom and owner scale.
    #[must_use]
    pub fn extent(&self) -> Vec2 {
        self.unscaled_extent.mul_elements(self.frame().scale.xy())
    }

    /// Half-extent before zoom.
    #[inline]
    #[must_use]
    pub const fn unscaled_extent(&self) -> Vec2 {
        self.unscaled_extent
    }

    /// Current zoom scale.
    #[inline]
    #[must_use]
    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Rotation policy.
    #[inline]
    #[must_use]
    pub const fn rotation_policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Per-axis inverse view size.
    #[inline]
    #[must_use]
    pub const fn inverse_view_size(&self) -> Vec2 {
        self.inverse_view_size
    }

    /// Uniform inverse view radius.
    #[inline]
    #[must_use]
    pub const fn inverse_view_radius(&self) -> f32 {
        self.inverse_view_radius
    }

    /// World location of the view center.
    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.frame().location
    }

    /// Yaw of the cached, level frame.
    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.frame().yaw
    }

    /// World Z used for level resolution.
    #[must_use]
    pub fn level_height(&self) -> f32 {
        self.height_source.unwrap_or_else(|| self.frame().location.z)
    }

    /// Returns false if the category was hidden on this view.
    #[must_use]
    pub fn is_category_visible(&self, category: &str) -> bool {
        !self.hidden_categories.contains(category)
    }
}

#[inline]
fn safe_reciprocal(value: f32) -> f32 {
    if value.abs() <= f32::EPSILON {
        0.0
    } else {
        1.0 / value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimap_shared::Rotator;

    fn fixed_view(extent: Vec2) -> ViewFrame {
        ViewFrame::new(extent, RotationPolicy::Fixed { yaw: 0.0 })
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn test_inside_points_are_in_view() {
        let mut view = fixed_view(Vec2::new(100.0, 50.0));
        view.set_owner_transform(Transform::from_location(Vec3::new(500.0, 500.0, 0.0)));

        for (x, y) in [(500.0, 500.0), (599.0, 549.0), (401.0, 451.0), (550.0, 460.0)] {
            let p = view.world_to_view(Vec3::new(x, y, 0.0), false);
            assert!(p.in_view, "({x}, {y}) should be in view");
            assert!((0.0..=1.0).contains(&p.uv.x));
            assert!((0.0..=1.0).contains(&p.uv.y));
        }

        for (x, y) in [(601.0, 500.0), (500.0, 551.0), (399.0, 449.0)] {
            assert!(!view.world_to_view(Vec3::new(x, y, 0.0), false).in_view);
        }
    }

    #[test]
    fn test_forced_rectangular_uses_smaller_extent() {
        let view = fixed_view(Vec2::new(100.0, 50.0));

        let normal = view.world_to_view(Vec3::new(100.0, 0.0, 0.0), false);
        let forced = view.world_to_view(Vec3::new(100.0, 0.0, 0.0), true);

        assert_close(normal.uv.x, 1.0);
        assert_close(forced.uv.x, 1.5);
        assert!(!forced.in_view);
    }

    #[test]
    fn test_round_trip_with_rotation() {
        let mut view = ViewFrame::new(
            Vec2::new(300.0, 200.0),
            RotationPolicy::InheritYaw { offset: 90.0 },
        );
        view.set_owner_transform(Transform::new(
            Vec3::new(-40.0, 75.0, 12.0),
            Rotator::from_yaw(33.0),
            Vec3::ONE,
        ));

        for (x, y) in [(-40.0, 75.0), (100.0, 20.0), (-200.0, 180.0), (10.0, -60.0)] {
            let world = Vec3::new(x, y, 12.0);
            let p = view.world_to_view(world, false);
            let back = view.view_to_world(p.uv);
            assert_close(back.x, world.x);
            assert_close(back.y, world.y);
            assert_close(back.z, world.z);
        }
    }

    #[test]
    fn test_zoom_scales_projection_but_not_deprojection() {
        let mut view = fixed_view(Vec2::new(100.0, 100.0));
        let p = Vec3::new(50.0, 0.0, 0.0);

        assert_close(view.world_to_view(p, false).uv.x, 0.75);

        view.set_zoom(2.0);
        assert_close(view.world_to_view(p, false).uv.x, 0.625);
        assert_close(view.extent().x, 200.0);

        // Deprojection ignores zoom
        assert_close(view.view_to_world(Vec2::new(1.0, 0.5)).x, 100.0);
    }

    #[test]
    fn test_zoom_clamped_to_epsilon() {
        let mut view = fixed_view(Vec2::ONE);
        view.set_zoom(0.0);
        assert_eq!(view.zoom(), MIN_ZOOM);
        view.set_zoom(-3.0);
        assert_eq!(view.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_cache_rebuilds_only_on_change() {
        let mut view = fixed_view(Vec2::ONE);
        let t = Transform::from_location(Vec3::new(1.0, 2.0, 3.0));
        view.set_owner_transform(t);

        for _ in 0..10 {
            let _ = view.world_to_view(Vec3::ZERO, false);
        }
        assert_eq!(view.cache_rebuilds(), 1);

        view.set_owner_transform(t);
        let _ = view.world_to_view(Vec3::ZERO, false);
        assert_eq!(view.cache_rebuilds(), 1);

        view.set_owner_transform(Transform::from_location(Vec3::new(1.0, 2.0, 4.0)));
        let _ = view.world_to_view(Vec3::ZERO, false);
        assert_eq!(view.cache_rebuilds(), 2);

        view.set_zoom(3.0);
        let _ = view.location();
        assert_eq!(view.cache_rebuilds(), 3);
    }

    #[test]
    fn test_inherit_yaw_discards_pitch_and_roll() {
        let mut view = ViewFrame::new(Vec2::ONE, RotationPolicy::InheritYaw { offset: 90.0 });
        view.set_owner_transform(Transform::new(
            Vec3::ZERO,
            Rotator::new(45.0, 10.0, 30.0),
            Vec3::ONE,
        ));

        assert_close(view.yaw(), 100.0);
        assert_close(view.world_yaw_to_view(130.0), 30.0);
    }

    #[test]
    fn test_fixed_rotation_ignores_owner() {
        let mut view = ViewFrame::new(Vec2::ONE, RotationPolicy::Fixed { yaw: 45.0 });
        view.set_owner_transform(Transform::new(Vec3::ZERO, Rotator::from_yaw(170.0), Vec3::ONE));
        assert_close(view.yaw(), 45.0);

        view.set_rotation_policy(RotationPolicy::Fixed { yaw: -10.0 });
        assert_close(view.yaw(), -10.0);
    }

    #[test]
    fn test_broad_contains_has_no_false_negatives() {
        let mut view = ViewFrame::new(Vec2::new(100.0, 40.0), RotationPolicy::Fixed { yaw: 37.0 });
        view.set_owner_transform(Transform::from_location(Vec3::new(10.0, 10.0, 0.0)));

        let center = view.location();
        for corner in view.world_corners() {
            let inside = center + (corner - center) * 0.99;
            assert!(view.broad_contains(inside, 0.0));
        }
        assert!(view.broad_contains(Vec3::new(10.0, 10.0, 0.0), 0.0));
        assert!(!view.broad_contains(Vec3::new(1000.0, 10.0, 0.0), 5.0));
        assert!(view.broad_contains(Vec3::new(150.0, 10.0, 0.0), 50.0));
    }

    #[test]
    fn test_world_corners_project_to_unit_square() {
        let mut view = ViewFrame::new(Vec2::new(60.0, 30.0), RotationPolicy::Fixed { yaw: 25.0 });
        view.set_owner_transform(Transform::from_location(Vec3::new(5.0, -5.0, 0.0)));

        let expected = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for (corner, (u, v)) in view.world_corners().into_iter().zip(expected) {
            let p = view.world_to_view(corner, false);
            assert_close(p.uv.x, u);
            assert_close(p.uv.y, v);
        }
    }

    #[test]
    fn test_extent_clamped_and_event_pushed() {
        let mut view = fixed_view(Vec2::new(10.0, 10.0));
        view.set_extent(Vec2::new(0.0, 20.0));

        assert_eq!(view.unscaled_extent(), Vec2::new(MIN_VIEW_EXTENT, 20.0));
        assert_eq!(view.inverse_view_radius(), 1.0 / (2.0 * MIN_VIEW_EXTENT));

        let events: Vec<ViewEvent> = view.drain_events().collect();
        assert_eq!(events, vec![ViewEvent::SizeChanged]);

        view.set_extent(Vec2::new(0.0, 20.0));
        assert_eq!(view.drain_events().count(), 0);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_close(fixed_view(Vec2::new(200.0, 100.0)).aspect_ratio(), 2.0);
        assert_close(fixed_view(Vec2::new(50.0, 100.0)).aspect_ratio(), 0.5);
    }

    #[test]
    fn test_category_visibility_events_only_on_change() {
        let mut view = fixed_view(Vec2::ONE);

        view.set_category_visible("enemy", true);
        assert_eq!(view.drain_events().count(), 0);

        view.set_category_visible("enemy", false);
        view.set_category_visible("enemy", false);
        assert_eq!(view.drain_events().count(), 1);
        assert!(!view.is_category_visible("enemy"));

        view.set_category_visible("enemy", true);
        assert_eq!(view.drain_events().count(), 1);
        assert!(view.is_category_visible("enemy"));
    }

    #[test]
    fn test_height_source_override() {
        let mut view = fixed_view(Vec2::ONE);
        view.set_owner_transform(Transform::from_location(Vec3::new(0.0, 0.0, 250.0)));
        assert_close(view.level_height(), 250.0);

        view.set_height_source(Some(-20.0));
        assert_close(view.level_height(), -20.0);
    }
}

//! # Map Views
//!
//! - **frame**: cached world <-> UV transform of one view
//! - **projection**: circular/rectangular shape tests and edge clamping
//! - **frustum**: player camera footprint on the map
//!
//! A [`MapView`] pairs a frame with the per-view background cache and
//! remembers what owns it.

mod frame;
mod frustum;
mod projection;

pub use frame::{RotationPolicy, ViewEvent, ViewFrame, ViewProjection};
pub use frustum::{CameraPose, ViewFrustum};
pub use projection::{clamp_into_view, detect_is_in_view, edge_angle};

use minimap_shared::{Transform, Vec3};

use crate::background::{BackgroundId, BackgroundIndex, BackgroundInteraction, BackgroundVolume};
use crate::fog::FogId;
use crate::memory::{Arena, Handle};

/// Handle to a registered view.
pub type ViewId = Handle<MapView>;

/// What a view is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Follows an entity, usually the player.
    Entity,
    /// Shows exactly one background area.
    Background(BackgroundId),
    /// Shows exactly one fog area.
    Fog(FogId),
}

/// A registered view: frame, background cache and owner.
#[derive(Debug)]
pub struct MapView {
    /// World <-> UV transform.
    pub frame: ViewFrame,
    /// Active priority and level cache.
    pub backgrounds: BackgroundIndex,
    kind: ViewKind,
}

impl MapView {
    /// Creates a view following an entity.
    #[must_use]
    pub fn new(frame: ViewFrame, background_lifetime: f64) -> Self {
        Self {
            frame,
            backgrounds: BackgroundIndex::new(background_lifetime),
            kind: ViewKind::Entity,
        }
    }

    /// Creates a view covering one background area.
    #[must_use]
    pub fn for_background(id: BackgroundId, background: &BackgroundVolume, background_lifetime: f64) -> Self {
        Self {
            frame: background.frame().clone(),
            backgrounds: BackgroundIndex::new(background_lifetime),
            kind: ViewKind::Background(id),
        }
    }

    /// Creates a view covering one fog area.
    #[must_use]
    pub fn for_fog(id: FogId, fog_frame: &ViewFrame, background_lifetime: f64) -> Self {
        Self {
            frame: fog_frame.clone(),
            backgrounds: BackgroundIndex::new(background_lifetime),
            kind: ViewKind::Fog(id),
        }
    }

    /// What the view is attached to.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ViewKind {
        self.kind
    }

    /// True if this view shows exactly `id`.
    #[inline]
    #[must_use]
    pub fn shows_background(&self, id: BackgroundId) -> bool {
        self.kind == ViewKind::Background(id)
    }

    /// Moves the view with its owner.
    pub fn set_owner_transform(&mut self, transform: Transform) {
        self.frame.set_owner_transform(transform);
    }

    /// Follows the owning background area, if any.
    pub fn sync_with_background(&mut self, backgrounds: &Arena<BackgroundVolume>) {
        if let ViewKind::Background(id) = self.kind {
            if let Some(bg) = backgrounds.get(id) {
                self.frame.set_extent(bg.extent().xy());
                self.frame.set_owner_transform(bg.transform());
            }
        }
    }

    /// Refreshes the background cache if its lifetime expired.
    pub fn refresh(&mut self, now: f64, backgrounds: &Arena<BackgroundVolume>) -> bool {
        self.backgrounds.refresh(now, &self.frame, backgrounds)
    }

    /// Active background priority at `now`, refreshing an expired cache.
    pub fn active_priority_at(&mut self, now: f64, backgrounds: &Arena<BackgroundVolume>) -> i32 {
        self.backgrounds.active_priority_at(now, &self.frame, backgrounds)
    }

    /// Background level test for an icon at `now`, refreshing an expired
    /// cache first.
    pub fn is_same_level_at(
        &mut self,
        now: f64,
        icon_location: Vec3,
        policy: BackgroundInteraction,
        backgrounds: &Arena<BackgroundVolume>,
    ) -> bool {
        self.backgrounds
            .is_same_level_at(now, icon_location, policy, &self.frame, backgrounds)
    }

    /// Background level test for an icon. See [`BackgroundIndex::is_same_level`].
    #[must_use]
    pub fn is_same_level(
        &self,
        icon_location: Vec3,
        policy: BackgroundInteraction,
        backgrounds: &Arena<BackgroundVolume>,
    ) -> bool {
        self.backgrounds.is_same_level(icon_location, policy, backgrounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimap_shared::Vec2;

    #[test]
    fn test_background_view_follows_area() {
        let mut arena = Arena::new(2);
        let id = arena
            .allocate(BackgroundVolume::new(
                Transform::from_location(Vec3::new(100.0, 0.0, 0.0)),
                Vec3::new(50.0, 25.0, 10.0),
            ))
            .expect("slot");
        let mut view = MapView::for_background(id, arena.get(id).expect("live"), 0.05);
        assert!(view.shows_background(id));
        assert_eq!(view.frame.extent(), Vec2::new(50.0, 25.0));

        arena
            .get_mut(id)
            .expect("live")
            .set_transform(Transform::from_location(Vec3::new(300.0, 0.0, 0.0)));
        view.sync_with_background(&arena);
        assert_eq!(view.frame.location(), Vec3::new(300.0, 0.0, 0.0));
        assert!(view.refresh(0.0, &arena));
        assert!(view.backgrounds.inside_any());
    }

    #[test]
    fn test_timed_query_follows_moved_owner() {
        let mut arena = Arena::new(2);
        let mut high = BackgroundVolume::new(Transform::from_location(Vec3::new(1000.0, 0.0, 0.0)), Vec3::splat(100.0));
        high.set_priority(4);
        arena.allocate(high).expect("slot");

        let mut view = MapView::new(ViewFrame::new(Vec2::ONE, RotationPolicy::Fixed { yaw: 0.0 }), 0.05);
        assert_eq!(view.active_priority_at(0.0, &arena), 0);

        view.set_owner_transform(Transform::from_location(Vec3::new(1000.0, 0.0, 0.0)));
        assert_eq!(view.active_priority_at(0.01, &arena), 0);
        assert_eq!(view.active_priority_at(0.2, &arena), 4);

        let volume = BackgroundInteraction::OnlyRenderInSameVolume;
        assert!(view.is_same_level_at(0.2, Vec3::new(1000.0, 0.0, 0.0), volume, &arena));
    }

    #[test]
    fn test_entity_view_kind() {
        let view = MapView::new(ViewFrame::new(Vec2::ONE, RotationPolicy::Fixed { yaw: 0.0 }), 0.05);
        assert_eq!(view.kind(), ViewKind::Entity);
    }
}

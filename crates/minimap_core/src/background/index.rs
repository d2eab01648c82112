//! # Background Index
//!
//! Per-view cache of which background areas are active around the view.
//!
//! ```text
//!   every `lifetime` seconds:
//!     view location ──► visible volumes containing it ──► max priority
//!                                     │
//!                                     ▼
//!               multi-level volumes at max priority ──► level at view height
//! ```
//!
//! Reads between refreshes see the previous result. Icon level tests
//! (`is_same_level`) compare against this cached state, never against a
//! fresh evaluation. The `*_at` queries take the current time and refresh
//! first when the cache expired, so callers need no separate tick.

use std::collections::HashMap;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use minimap_shared::Vec3;

use crate::memory::Arena;
use crate::tracker::{EntryId, RegistryEvent};
use crate::view::ViewFrame;

use super::{BackgroundId, BackgroundVolume};

/// When an icon is drawn relative to the background areas around it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundInteraction {
    /// Always drawn.
    #[default]
    AlwaysRender,
    /// Drawn if it is in a volume at the view's active priority.
    OnlyRenderInSameVolume,
    /// Like `OnlyRenderInSameVolume`, and on the view's level of that volume.
    OnlyRenderOnSameFloor,
    /// Only the icon's highest-priority volumes are candidates.
    OnlyRenderInSamePriorityVolume,
    /// Highest-priority candidates, same level.
    OnlyRenderOnSamePriorityFloor,
}

impl BackgroundInteraction {
    /// True for policies that restrict candidates to the icon's top priority.
    #[inline]
    #[must_use]
    pub const fn restricts_priority(self) -> bool {
        matches!(
            self,
            Self::OnlyRenderInSamePriorityVolume | Self::OnlyRenderOnSamePriorityFloor
        )
    }

    /// True for policies that compare levels in multi-level volumes.
    #[inline]
    #[must_use]
    pub const fn compares_level(self) -> bool {
        matches!(self, Self::OnlyRenderOnSameFloor | Self::OnlyRenderOnSamePriorityFloor)
    }
}

/// Time-cached priority and level state of one view.
#[derive(Debug)]
pub struct BackgroundIndex {
    lifetime: f64,
    last_refresh: Option<f64>,
    active_priority: i32,
    inside_any: bool,
    /// Active level per multi-level volume containing the view.
    levels: HashMap<BackgroundId, usize>,
    registry: Option<Receiver<RegistryEvent>>,
    refreshes: u64,
}

impl BackgroundIndex {
    /// Creates an empty index that refreshes at most every `lifetime` seconds.
    #[must_use]
    pub fn new(lifetime: f64) -> Self {
        Self {
            lifetime,
            last_refresh: None,
            active_priority: 0,
            inside_any: false,
            levels: HashMap::new(),
            registry: None,
            refreshes: 0,
        }
    }

    /// Listens for registry changes. Any background change forces the next
    /// refresh.
    pub fn subscribe(&mut self, events: Receiver<RegistryEvent>) {
        self.registry = Some(events);
        self.last_refresh = None;
    }

    fn sync_registry(&mut self) {
        let Some(events) = &self.registry else {
            return;
        };
        for event in events.try_iter() {
            match event {
                RegistryEvent::Unregistered(EntryId::Background(id)) => {
                    self.levels.remove(&id);
                    self.last_refresh = None;
                }
                RegistryEvent::Registered(EntryId::Background(_)) => {
                    self.last_refresh = None;
                }
                _ => {}
            }
        }
    }

    /// Drops the cached state so the next refresh recomputes it.
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
    }

    /// True if the next refresh at `now` would recompute the state.
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        match self.last_refresh {
            Some(last) => now - last > self.lifetime,
            None => true,
        }
    }

    /// Recomputes the active priority and levels if the cache expired.
    ///
    /// # Returns
    ///
    /// True if the state was recomputed.
    pub fn refresh(&mut self, now: f64, view: &ViewFrame, backgrounds: &Arena<BackgroundVolume>) -> bool {
        self.sync_registry();
        if !self.is_expired(now) {
            return false;
        }

        let point = view.location();
        let max_priority = backgrounds
            .iter()
            .filter(|(_, bg)| bg.is_visible() && bg.contains(point))
            .map(|(_, bg)| bg.priority())
            .max();

        self.inside_any = max_priority.is_some();
        self.active_priority = max_priority.unwrap_or(0);

        let height = view.level_height();
        self.levels.clear();
        for (id, bg) in backgrounds.iter() {
            if !bg.is_multi_level() || !bg.is_visible() || bg.priority() != self.active_priority {
                continue;
            }
            if !bg.contains(point) {
                continue;
            }
            if let Some(level) = bg.level_at_height(height) {
                self.levels.insert(id, level);
            }
        }

        self.last_refresh = Some(now);
        self.refreshes += 1;
        tracing::debug!(
            "Background cache refreshed: priority {} inside {}",
            self.active_priority,
            self.inside_any
        );
        true
    }

    /// Highest priority among visible volumes containing the view.
    #[inline]
    #[must_use]
    pub const fn active_priority(&self) -> i32 {
        self.active_priority
    }

    /// Whether any visible volume contained the view at the last refresh.
    #[inline]
    #[must_use]
    pub const fn inside_any(&self) -> bool {
        self.inside_any
    }

    /// Cached level of a multi-level volume, if it is active for the view.
    #[must_use]
    pub fn active_level(&self, id: BackgroundId) -> Option<usize> {
        self.levels.get(&id).copied()
    }

    /// Active priority at `now`, refreshing first if the cache expired.
    pub fn active_priority_at(&mut self, now: f64, view: &ViewFrame, backgrounds: &Arena<BackgroundVolume>) -> i32 {
        self.refresh(now, view, backgrounds);
        self.active_priority
    }

    /// Active level of a volume at `now`, refreshing first if the cache
    /// expired.
    pub fn active_level_at(
        &mut self,
        now: f64,
        id: BackgroundId,
        view: &ViewFrame,
        backgrounds: &Arena<BackgroundVolume>,
    ) -> Option<usize> {
        self.refresh(now, view, backgrounds);
        self.active_level(id)
    }

    /// [`Self::is_same_level`] at `now`, refreshing first if the cache
    /// expired.
    pub fn is_same_level_at(
        &mut self,
        now: f64,
        icon_location: Vec3,
        policy: BackgroundInteraction,
        view: &ViewFrame,
        backgrounds: &Arena<BackgroundVolume>,
    ) -> bool {
        self.refresh(now, view, backgrounds);
        self.is_same_level(icon_location, policy, backgrounds)
    }

    /// Number of recomputations so far.
    #[inline]
    #[must_use]
    pub const fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    /// True if a volume is drawn on the view.
    ///
    /// Outside every volume all visible volumes are drawn; inside, only
    /// those at the active priority.
    #[must_use]
    pub fn is_drawn(&self, bg: &BackgroundVolume) -> bool {
        bg.is_visible() && (!self.inside_any || bg.priority() == self.active_priority)
    }

    /// Level of a volume to draw on the view.
    ///
    /// Uses the cached level when the volume is active; otherwise resolves
    /// the view's height directly.
    #[must_use]
    pub fn display_level(&self, id: BackgroundId, bg: &BackgroundVolume, view: &ViewFrame) -> Option<usize> {
        if !bg.is_multi_level() {
            return Some(0);
        }
        self.active_level(id)
            .or_else(|| bg.level_at_height(view.level_height()))
    }

    /// Decides whether an icon at `icon_location` is drawn on the view.
    #[must_use]
    pub fn is_same_level(
        &self,
        icon_location: Vec3,
        policy: BackgroundInteraction,
        backgrounds: &Arena<BackgroundVolume>,
    ) -> bool {
        if policy == BackgroundInteraction::AlwaysRender || !self.inside_any {
            return true;
        }

        let candidates: Vec<(BackgroundId, &BackgroundVolume)> = backgrounds
            .iter()
            .filter(|(_, bg)| bg.is_visible() && bg.contains(icon_location))
            .collect();
        if candidates.is_empty() {
            return true;
        }

        let icon_max = candidates
            .iter()
            .map(|(_, bg)| bg.priority())
            .max()
            .unwrap_or(i32::MIN);

        for (id, bg) in candidates {
            if policy.restricts_priority() && bg.priority() != icon_max {
                continue;
            }
            if bg.priority() != self.active_priority {
                continue;
            }
            if !bg.is_multi_level() || !policy.compares_level() {
                return true;
            }
            let icon_level = bg.level_at_height(icon_location.z);
            if icon_level.is_some() && icon_level == self.active_level(id) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimap_shared::{Transform, Vec2};

    use crate::background::BackgroundLevel;
    use crate::view::RotationPolicy;

    fn area(x: f32, priority: i32, levels: usize) -> BackgroundVolume {
        let mut bg = BackgroundVolume::new(
            Transform::from_location(Vec3::new(x, 0.0, 0.0)),
            Vec3::new(100.0, 100.0, 100.0),
        );
        bg.set_priority(priority);
        bg.set_levels((0..levels).map(|_| BackgroundLevel::new(100.0)).collect());
        bg
    }

    fn view_at(location: Vec3) -> ViewFrame {
        let mut view = ViewFrame::new(Vec2::new(50.0, 50.0), RotationPolicy::Fixed { yaw: 0.0 });
        view.set_owner_transform(Transform::from_location(location));
        view
    }

    #[test]
    fn test_refresh_respects_lifetime() {
        let mut arena = Arena::new(4);
        arena.allocate(area(0.0, 2, 1)).expect("slot");
        let mut index = BackgroundIndex::new(0.05);
        let view = view_at(Vec3::ZERO);

        assert!(index.refresh(0.0, &view, &arena));
        assert!(!index.refresh(0.03, &view, &arena));
        assert!(!index.refresh(0.05, &view, &arena));
        assert!(index.refresh(0.051, &view, &arena));
        assert_eq!(index.refresh_count(), 2);
        assert_eq!(index.active_priority(), 2);
        assert!(index.inside_any());
    }

    #[test]
    fn test_stale_reads_inside_lifetime() {
        let mut arena = Arena::new(4);
        let id = arena.allocate(area(0.0, 2, 1)).expect("slot");
        let mut index = BackgroundIndex::new(1.0);
        let view = view_at(Vec3::ZERO);
        index.refresh(0.0, &view, &arena);

        arena.get_mut(id).expect("live").set_priority(9);
        index.refresh(0.5, &view, &arena);
        assert_eq!(index.active_priority(), 2);

        index.refresh(1.5, &view, &arena);
        assert_eq!(index.active_priority(), 9);
    }

    #[test]
    fn test_outside_everything() {
        let mut arena = Arena::new(4);
        arena.allocate(area(0.0, 2, 1)).expect("slot");
        let mut index = BackgroundIndex::new(0.05);
        index.refresh(0.0, &view_at(Vec3::new(5000.0, 0.0, 0.0)), &arena);

        assert!(!index.inside_any());
        assert_eq!(index.active_priority(), 0);
        assert!(index.is_same_level(
            Vec3::ZERO,
            BackgroundInteraction::OnlyRenderOnSameFloor,
            &arena
        ));
    }

    #[test]
    fn test_hidden_volumes_ignored() {
        let mut arena = Arena::new(4);
        let mut bg = area(0.0, 7, 1);
        bg.set_visible(false);
        arena.allocate(bg).expect("slot");
        let mut index = BackgroundIndex::new(0.05);
        index.refresh(0.0, &view_at(Vec3::ZERO), &arena);
        assert!(!index.inside_any());
    }

    #[test]
    fn test_active_level_only_for_top_priority() {
        let mut arena = Arena::new(4);
        let high = arena.allocate(area(0.0, 5, 2)).expect("slot");
        let low = arena.allocate(area(50.0, 3, 2)).expect("slot");

        let mut index = BackgroundIndex::new(0.05);
        index.refresh(0.0, &view_at(Vec3::new(20.0, 0.0, 50.0)), &arena);

        // Bottom at -100, so z = 50 is 150 above it: level 1
        assert_eq!(index.active_level(high), Some(1));
        assert_eq!(index.active_level(low), None);
    }

    #[test]
    fn test_same_floor_compares_levels() {
        let mut arena = Arena::new(4);
        arena.allocate(area(0.0, 1, 2)).expect("slot");
        let mut index = BackgroundIndex::new(0.05);
        index.refresh(0.0, &view_at(Vec3::new(0.0, 0.0, -50.0)), &arena);

        let floor = BackgroundInteraction::OnlyRenderOnSameFloor;
        let volume = BackgroundInteraction::OnlyRenderInSameVolume;
        assert!(index.is_same_level(Vec3::new(10.0, 10.0, -90.0), floor, &arena));
        assert!(!index.is_same_level(Vec3::new(10.0, 10.0, 60.0), floor, &arena));
        assert!(index.is_same_level(Vec3::new(10.0, 10.0, 60.0), volume, &arena));

        // Icons outside every volume are always drawn
        assert!(index.is_same_level(Vec3::new(900.0, 0.0, 60.0), floor, &arena));
    }

    #[test]
    fn test_icon_in_lower_priority_volume() {
        let mut arena = Arena::new(4);
        arena.allocate(area(0.0, 5, 1)).expect("slot");
        arena.allocate(area(300.0, 3, 1)).expect("slot");
        let mut index = BackgroundIndex::new(0.05);
        index.refresh(0.0, &view_at(Vec3::ZERO), &arena);

        let icon = Vec3::new(300.0, 0.0, 0.0);
        assert!(!index.is_same_level(icon, BackgroundInteraction::OnlyRenderInSameVolume, &arena));
        assert!(index.is_same_level(icon, BackgroundInteraction::AlwaysRender, &arena));
    }

    #[test]
    fn test_registry_events_force_refresh() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut arena = Arena::new(4);
        let id = arena.allocate(area(0.0, 5, 2)).expect("slot");

        let mut index = BackgroundIndex::new(10.0);
        index.subscribe(rx);
        let view = view_at(Vec3::ZERO);
        assert!(index.refresh(0.0, &view, &arena));
        assert!(index.active_level(id).is_some());

        arena.free(id).expect("freed");
        tx.send(RegistryEvent::Unregistered(EntryId::Background(id))).expect("send");
        assert!(index.refresh(0.1, &view, &arena));
        assert!(index.active_level(id).is_none());
        assert!(!index.inside_any());
    }

    #[test]
    fn test_timed_queries_refresh_when_expired() {
        let mut arena = Arena::new(4);
        let low = arena.allocate(area(-1000.0, 1, 2)).expect("slot");
        let high = arena.allocate(area(1000.0, 8, 2)).expect("slot");
        let mut index = BackgroundIndex::new(0.05);
        let mut view = view_at(Vec3::new(-1000.0, 0.0, 0.0));

        assert_eq!(index.active_priority_at(0.0, &view, &arena), 1);
        assert!(index.active_level(low).is_some());

        view.set_owner_transform(Transform::from_location(Vec3::new(1000.0, 0.0, 0.0)));
        assert!(!index.is_expired(0.02));
        assert_eq!(index.active_priority_at(0.02, &view, &arena), 1);

        assert!(index.is_expired(0.1));
        assert_eq!(index.active_priority_at(0.1, &view, &arena), 8);
        assert_eq!(index.active_level_at(0.1, high, &view, &arena), Some(1));
        assert_eq!(index.active_level(low), None);
        assert_eq!(index.refresh_count(), 2);

        let floor = BackgroundInteraction::OnlyRenderOnSameFloor;
        let icon_in_low = Vec3::new(-1000.0, 0.0, 0.0);
        assert!(!index.is_same_level_at(0.12, icon_in_low, floor, &view, &arena));

        view.set_owner_transform(Transform::from_location(Vec3::new(-1000.0, 0.0, 0.0)));
        assert!(index.is_same_level_at(0.2, icon_in_low, floor, &view, &arena));
        assert_eq!(index.refresh_count(), 3);
    }

    #[test]
    fn test_display_level() {
        let mut arena = Arena::new(4);
        let single = arena.allocate(area(0.0, 0, 1)).expect("slot");
        let multi = arena.allocate(area(5000.0, 0, 2)).expect("slot");
        let view = view_at(Vec3::new(0.0, 0.0, 50.0));
        let mut index = BackgroundIndex::new(0.05);
        index.refresh(0.0, &view, &arena);

        let single_bg = arena.get(single).expect("live");
        let multi_bg = arena.get(multi).expect("live");
        assert_eq!(index.display_level(single, single_bg, &view), Some(0));
        assert_eq!(index.display_level(multi, multi_bg, &view), Some(1));
        assert!(index.is_drawn(single_bg));
        assert!(index.is_drawn(multi_bg));
    }
}

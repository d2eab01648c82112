//! # Tracker
//!
//! Session-scoped registry of icons, backgrounds, fog areas, revealers and
//! views.
//!
//! ```text
//!   register_*() ──► Arena slot ──► RegistryEvent::Registered ──┬──► fog areas (revealer lists)
//!   unregister_*() ─► free slot ──► RegistryEvent::Unregistered ─┴──► views (background caches)
//! ```
//!
//! Objects live in fixed-capacity arenas, so handles stay valid while
//! other objects come and go, and a freed slot never resolves to its next
//! occupant. Listeners get events through `crossbeam-channel` receivers and
//! drain them before they next use derived state.

use crossbeam_channel::{Receiver, Sender};

use minimap_shared::{Vec2, Vec3};

use crate::background::{BackgroundId, BackgroundVolume};
use crate::config::TrackerConfig;
use crate::error::{MinimapError, MinimapResult};
use crate::fog::{FogArea, FogId, GpuPaint, Revealer, RevealerId};
use crate::icon::{IconId, MapIcon};
use crate::memory::{Arena, Handle};
use crate::view::{MapView, ViewId, ViewKind};

/// Identity of any registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// An icon.
    Icon(IconId),
    /// A background area.
    Background(BackgroundId),
    /// A fog area.
    Fog(FogId),
    /// A revealer.
    Revealer(RevealerId),
    /// A view.
    View(ViewId),
}

/// Registry change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    /// An object was added.
    Registered(EntryId),
    /// An object was removed.
    Unregistered(EntryId),
}

/// Which view [`Tracker::locate_view`] picks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSearch {
    /// First registered view of any kind.
    #[default]
    Any,
    /// First view showing a background area.
    OnMapBackground,
    /// First view showing a fog area.
    OnMapFog,
    /// Never locate a view.
    Disabled,
}

/// The registry.
#[derive(Debug)]
pub struct Tracker {
    icons: Arena<MapIcon>,
    backgrounds: Arena<BackgroundVolume>,
    fogs: Arena<FogArea>,
    revealers: Arena<Revealer>,
    views: Arena<MapView>,
    subscribers: Vec<Sender<RegistryEvent>>,
}

fn insert<T>(arena: &mut Arena<T>, value: T, kind: &'static str) -> MinimapResult<Handle<T>> {
    arena.allocate(value).ok_or(MinimapError::RegistryFull {
        kind,
        capacity: arena.capacity(),
    })
}

fn remove<T>(arena: &mut Arena<T>, handle: Handle<T>, kind: &'static str) -> MinimapResult<T> {
    arena.free(handle).ok_or(MinimapError::StaleHandle {
        kind,
        index: handle.index(),
    })
}

impl Tracker {
    /// Creates a tracker with pre-allocated arenas.
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            icons: Arena::new(config.max_icons),
            backgrounds: Arena::new(config.max_backgrounds),
            fogs: Arena::new(config.max_fogs),
            revealers: Arena::new(config.max_revealers),
            views: Arena::new(config.max_views),
            subscribers: Vec::new(),
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Returns a receiver for every future registry change.
    pub fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn publish(&mut self, event: RegistryEvent) {
        // Dropped receivers are pruned here
        self.subscribers.retain(|sender| sender.send(event).is_ok());
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers an icon.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the icon arena is full.
    pub fn register_icon(&mut self, icon: MapIcon) -> MinimapResult<IconId> {
        let id = insert(&mut self.icons, icon, "icon")?;
        tracing::info!("Icon registered: {:?}", id);
        self.publish(RegistryEvent::Registered(EntryId::Icon(id)));
        Ok(id)
    }

    /// Unregisters an icon. It leaves every view it was drawn on first.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the icon is gone.
    pub fn unregister_icon(&mut self, id: IconId) -> MinimapResult<MapIcon> {
        let mut icon = remove(&mut self.icons, id, "icon")?;
        icon.leave_all_views();
        tracing::info!("Icon unregistered: {:?}", id);
        self.publish(RegistryEvent::Unregistered(EntryId::Icon(id)));
        Ok(icon)
    }

    /// Registers a background area.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the background arena is full.
    pub fn register_background(&mut self, background: BackgroundVolume) -> MinimapResult<BackgroundId> {
        let id = insert(&mut self.backgrounds, background, "background")?;
        tracing::info!("Background registered: {:?}", id);
        self.publish(RegistryEvent::Registered(EntryId::Background(id)));
        Ok(id)
    }

    /// Unregisters a background area.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the background is gone.
    pub fn unregister_background(&mut self, id: BackgroundId) -> MinimapResult<BackgroundVolume> {
        let background = remove(&mut self.backgrounds, id, "background")?;
        tracing::info!("Background unregistered: {:?}", id);
        self.publish(RegistryEvent::Unregistered(EntryId::Background(id)));
        Ok(background)
    }

    /// Registers a fog area and binds it to the current revealers.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the fog arena is full.
    pub fn register_fog(&mut self, mut fog: FogArea) -> MinimapResult<FogId> {
        if self.fogs.len() >= self.fogs.capacity() {
            return Err(MinimapError::RegistryFull {
                kind: "fog",
                capacity: self.fogs.capacity(),
            });
        }
        fog.attach(self.revealers.handles(), self.subscribe());
        let id = insert(&mut self.fogs, fog, "fog")?;
        tracing::info!("Fog registered: {:?}", id);
        self.publish(RegistryEvent::Registered(EntryId::Fog(id)));
        Ok(id)
    }

    /// Unregisters a fog area. The caller releases its GPU buffers.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the fog is gone.
    pub fn unregister_fog(&mut self, id: FogId) -> MinimapResult<FogArea> {
        let fog = remove(&mut self.fogs, id, "fog")?;
        tracing::info!("Fog unregistered: {:?}", id);
        self.publish(RegistryEvent::Unregistered(EntryId::Fog(id)));
        Ok(fog)
    }

    /// Registers a revealer. Every fog area starts painting it next tick.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the revealer arena is full.
    pub fn register_revealer(&mut self, revealer: Revealer) -> MinimapResult<RevealerId> {
        let id = insert(&mut self.revealers, revealer, "revealer")?;
        tracing::info!("Revealer registered: {:?}", id);
        self.publish(RegistryEvent::Registered(EntryId::Revealer(id)));
        Ok(id)
    }

    /// Unregisters a revealer.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the revealer is gone.
    pub fn unregister_revealer(&mut self, id: RevealerId) -> MinimapResult<Revealer> {
        let revealer = remove(&mut self.revealers, id, "revealer")?;
        tracing::info!("Revealer unregistered: {:?}", id);
        self.publish(RegistryEvent::Unregistered(EntryId::Revealer(id)));
        Ok(revealer)
    }

    /// Registers a view and subscribes its background cache.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the view arena is full.
    pub fn register_view(&mut self, mut view: MapView) -> MinimapResult<ViewId> {
        if self.views.len() >= self.views.capacity() {
            return Err(MinimapError::RegistryFull {
                kind: "view",
                capacity: self.views.capacity(),
            });
        }
        view.backgrounds.subscribe(self.subscribe());
        let id = insert(&mut self.views, view, "view")?;
        tracing::info!("View registered: {:?}", id);
        self.publish(RegistryEvent::Registered(EntryId::View(id)));
        Ok(id)
    }

    /// Unregisters a view. Icons drawn on it leave it.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the view is gone.
    pub fn unregister_view(&mut self, id: ViewId) -> MinimapResult<MapView> {
        let view = remove(&mut self.views, id, "view")?;
        for (_, icon) in self.icons.iter_mut() {
            icon.forget_view(id);
        }
        tracing::info!("View unregistered: {:?}", id);
        self.publish(RegistryEvent::Unregistered(EntryId::View(id)));
        Ok(view)
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// All icons.
    #[inline]
    #[must_use]
    pub const fn icons(&self) -> &Arena<MapIcon> {
        &self.icons
    }

    /// All icons, mutable.
    #[inline]
    pub fn icons_mut(&mut self) -> &mut Arena<MapIcon> {
        &mut self.icons
    }

    /// All background areas.
    #[inline]
    #[must_use]
    pub const fn backgrounds(&self) -> &Arena<BackgroundVolume> {
        &self.backgrounds
    }

    /// All background areas, mutable.
    #[inline]
    pub fn backgrounds_mut(&mut self) -> &mut Arena<BackgroundVolume> {
        &mut self.backgrounds
    }

    /// All fog areas.
    #[inline]
    #[must_use]
    pub const fn fogs(&self) -> &Arena<FogArea> {
        &self.fogs
    }

    /// All revealers.
    #[inline]
    #[must_use]
    pub const fn revealers(&self) -> &Arena<Revealer> {
        &self.revealers
    }

    /// All revealers, mutable.
    #[inline]
    pub fn revealers_mut(&mut self) -> &mut Arena<Revealer> {
        &mut self.revealers
    }

    /// All views.
    #[inline]
    #[must_use]
    pub const fn views(&self) -> &Arena<MapView> {
        &self.views
    }

    /// All views, mutable.
    #[inline]
    pub fn views_mut(&mut self) -> &mut Arena<MapView> {
        &mut self.views
    }

    // =========================================================================
    // Per-frame work
    // =========================================================================

    /// Runs one fog frame on every fog area.
    ///
    /// # Returns
    ///
    /// Total number of revealer stamps painted.
    pub fn tick_fogs(&mut self, painter: &mut dyn GpuPaint, now: f64) -> usize {
        let revealers = &self.revealers;
        self.fogs
            .iter_mut()
            .map(|(_, fog)| fog.tick(painter, revealers, now))
            .sum()
    }

    /// Moves background views with their areas and refreshes every view's
    /// background cache whose lifetime expired.
    ///
    /// # Returns
    ///
    /// Number of caches recomputed.
    pub fn refresh_views(&mut self, now: f64) -> usize {
        let backgrounds = &self.backgrounds;
        let mut refreshed = 0;
        for (_, view) in self.views.iter_mut() {
            view.sync_with_background(backgrounds);
            if view.refresh(now, backgrounds) {
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Moves one view with its area and refreshes its background cache if
    /// the lifetime expired.
    ///
    /// # Returns
    ///
    /// True if the cache was recomputed; false if it was still fresh or the
    /// view is not registered.
    pub fn refresh_view(&mut self, id: ViewId, now: f64) -> bool {
        let backgrounds = &self.backgrounds;
        match self.views.get_mut(id) {
            Some(view) => {
                view.sync_with_background(backgrounds);
                view.refresh(now, backgrounds)
            }
            None => false,
        }
    }

    /// Updates the owner-hidden state of icons that opted in.
    pub fn update_owner_visibility(&mut self, painter: &mut dyn GpuPaint, now: f64) {
        let candidates: Vec<(IconId, Vec3, f32)> = self
            .icons
            .iter()
            .filter(|(_, icon)| icon.hide_owner_inside_fog)
            .map(|(id, icon)| (id, icon.location, icon.fog_threshold))
            .collect();

        for (id, location, threshold) in candidates {
            let (factor, inside) = self.fog_revealed_factor(painter, location, true, now);
            if let Some(icon) = self.icons.get_mut(id) {
                icon.set_owner_hidden(inside && factor < threshold);
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Reveal factor at a world position.
    ///
    /// The first fog area that answers wins.
    ///
    /// # Returns
    ///
    /// `(factor, inside_fog)`, or `(1.0, false)` when no fog covers the point.
    pub fn fog_revealed_factor(
        &self,
        painter: &mut dyn GpuPaint,
        location: Vec3,
        require_revealing: bool,
        now: f64,
    ) -> (f32, bool) {
        for (_, fog) in self.fogs.iter() {
            if let Some(factor) = fog.query_point(painter, location, require_revealing, now) {
                return (factor, true);
            }
        }
        (1.0, false)
    }

    /// True if any fog area is registered.
    #[inline]
    #[must_use]
    pub const fn has_fog(&self) -> bool {
        !self.fogs.is_empty()
    }

    /// Finds a view for widgets that were not given one explicitly.
    #[must_use]
    pub fn locate_view(&self, search: ViewSearch) -> Option<ViewId> {
        let wanted = |kind: ViewKind| match search {
            ViewSearch::Any => true,
            ViewSearch::OnMapBackground => matches!(kind, ViewKind::Background(_)),
            ViewSearch::OnMapFog => matches!(kind, ViewKind::Fog(_)),
            ViewSearch::Disabled => false,
        };
        self.views
            .iter()
            .find(|(_, view)| wanted(view.kind()))
            .map(|(id, _)| id)
    }

    /// Icons drawn on `view` whose UV lies inside the box spanned by two
    /// corners.
    #[must_use]
    pub fn box_select(&self, view: ViewId, start_uv: Vec2, end_uv: Vec2) -> Vec<IconId> {
        let Some(map_view) = self.views.get(view) else {
            return Vec::new();
        };
        let (min, max) = (start_uv.min(end_uv), start_uv.max(end_uv));

        self.icons
            .iter()
            .filter(|(_, icon)| icon.is_visible() && icon.is_rendered_in_view(view))
            .filter(|(_, icon)| {
                let uv = map_view.frame.world_to_view(icon.location, false).uv;
                uv.x >= min.x && uv.x <= max.x && uv.y >= min.y && uv.y <= max.y
            })
            .map(|(id, _)| id)
            .collect()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

//! # Minimap Session
//!
//! One session drives one minimap: it owns the registry, the injected
//! clock and GPU backend, and the compositor.
//!
//! ```text
//! tick():
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. SNAPSHOTS                                                        │
//! │    └─ Capture background levels that have no static texture         │
//! │                                                                     │
//! │ 2. BACKGROUND EVENTS                                                │
//! │    └─ Appearance changes drop every view's background cache         │
//! │                                                                     │
//! │ 3. FOG                                                              │
//! │    └─ Clear staging, paint revealers, combine, swap, invalidate     │
//! │                                                                     │
//! │ 4. VIEWS                                                            │
//! │    └─ Refresh expired background caches                             │
//! │                                                                     │
//! │ 5. OWNERS                                                           │
//! │    └─ Hide icons whose owner stands in unrevealed fog               │
//! └─────────────────────────────────────────────────────────────────────┘
//!
//! compose():  tracker ──► Compositor ──► DrawList
//! ```

use std::time::Instant;

use minimap_core::{
    BackgroundEvent, BackgroundId, BackgroundVolume, FogArea, FogId, GpuPaint, IconEvent, IconId,
    MapView, MinimapError, MinimapResult, SceneSnapshot, SimClock, Tracker, ViewFrame, ViewId,
};
use minimap_render::{Compositor, DrawList, MapEvent, Rect};
use minimap_shared::{Transform, Vec2, Vec3};

use crate::settings::MinimapSettings;

/// Counters of one session tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Background levels captured from the scene.
    pub snapshots_rendered: usize,
    /// Background appearance changes seen.
    pub background_changes: usize,
    /// Revealer stamps painted across all fog areas.
    pub fog_stamps: usize,
    /// View background caches recomputed.
    pub views_refreshed: usize,
    /// Wall time of the tick in microseconds.
    pub elapsed_us: u64,
}

/// The minimap frame driver.
pub struct MinimapSession {
    /// Settings the session was created with.
    settings: MinimapSettings,
    /// Registry of every map object.
    tracker: Tracker,
    /// Time source for every cache.
    clock: Box<dyn SimClock>,
    /// GPU backend for fog buffers.
    painter: Box<dyn GpuPaint>,
    /// Scene capture for background levels without a texture.
    snapshot: Option<Box<dyn SceneSnapshot>>,
    /// Frame composition.
    compositor: Compositor,
    /// Ticks run so far.
    frame_count: u64,
    /// Counters of the last tick.
    last_stats: FrameStats,
}

impl MinimapSession {
    /// Creates a session.
    ///
    /// # Arguments
    ///
    /// * `settings` - Validated settings
    /// * `clock` - Time source; tests pass a shared `ManualClock`
    /// * `painter` - GPU backend for fog buffers
    #[must_use]
    pub fn new(settings: MinimapSettings, clock: Box<dyn SimClock>, painter: Box<dyn GpuPaint>) -> Self {
        tracing::info!(
            "Minimap session started: {} icons, {} backgrounds, {} fogs max",
            settings.tracker.max_icons,
            settings.tracker.max_backgrounds,
            settings.tracker.max_fogs
        );

        Self {
            tracker: Tracker::new(&settings.tracker),
            compositor: Compositor::new(settings.compositor),
            settings,
            clock,
            painter,
            snapshot: None,
            frame_count: 0,
            last_stats: FrameStats::default(),
        }
    }

    /// Adds a scene capture service for background snapshots.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: Box<dyn SceneSnapshot>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Settings the session was created with.
    #[inline]
    #[must_use]
    pub const fn settings(&self) -> &MinimapSettings {
        &self.settings
    }

    /// The registry.
    #[inline]
    #[must_use]
    pub const fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// The registry, for registration and edits.
    #[inline]
    pub fn tracker_mut(&mut self) -> &mut Tracker {
        &mut self.tracker
    }

    /// The GPU backend.
    pub fn painter_mut(&mut self) -> &mut dyn GpuPaint {
        self.painter.as_mut()
    }

    /// The compositor.
    #[inline]
    #[must_use]
    pub const fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// The compositor, for mouse and camera input.
    #[inline]
    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Ticks run so far.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Counters of the last tick.
    #[inline]
    #[must_use]
    pub const fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    // =========================================================================
    // Construction helpers
    // =========================================================================

    /// Registers a player view using the configured view and cache settings.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the view arena is full.
    pub fn create_player_view(&mut self) -> MinimapResult<ViewId> {
        let frame = ViewFrame::from_config(&self.settings.view);
        self.tracker
            .register_view(MapView::new(frame, self.settings.cache.background_lifetime))
    }

    /// Registers a background area with the configured extent.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the background arena is full.
    pub fn create_background(&mut self, transform: Transform) -> MinimapResult<BackgroundId> {
        self.tracker
            .register_background(BackgroundVolume::from_config(transform, &self.settings.background))
    }

    /// Registers a view that covers one background area.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the background is gone, or
    /// [`MinimapError::RegistryFull`] if the view arena is full.
    pub fn create_background_view(&mut self, id: BackgroundId) -> MinimapResult<ViewId> {
        let lifetime = self.settings.cache.background_lifetime;
        let view = match self.tracker.backgrounds().get(id) {
            Some(background) => MapView::for_background(id, background, lifetime),
            None => {
                return Err(MinimapError::StaleHandle {
                    kind: "background",
                    index: id.index(),
                })
            }
        };
        self.tracker.register_view(view)
    }

    /// Allocates and registers a fog area with the configured resolution.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::RegistryFull`] if the fog arena is full. No
    /// GPU buffer is allocated in that case.
    pub fn create_fog(&mut self, transform: Transform, extent: Vec2) -> MinimapResult<FogId> {
        let fogs = self.tracker.fogs();
        if fogs.free_count() == 0 {
            return Err(MinimapError::RegistryFull {
                kind: "fog",
                capacity: fogs.capacity(),
            });
        }

        let fog = FogArea::new(
            transform,
            extent,
            &self.settings.fog,
            self.settings.cache.fog_read_lifetime,
            self.painter.as_mut(),
        );
        self.tracker.register_fog(fog)
    }

    /// Registers a view that covers one fog area.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the fog is gone, or
    /// [`MinimapError::RegistryFull`] if the view arena is full.
    pub fn create_fog_view(&mut self, id: FogId) -> MinimapResult<ViewId> {
        let lifetime = self.settings.cache.background_lifetime;
        let view = match self.tracker.fogs().get(id) {
            Some(fog) => MapView::for_fog(id, fog.frame(), lifetime),
            None => {
                return Err(MinimapError::StaleHandle {
                    kind: "fog",
                    index: id.index(),
                })
            }
        };
        self.tracker.register_view(view)
    }

    /// Unregisters a fog area and frees its GPU buffers.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::StaleHandle`] if the fog is gone.
    pub fn destroy_fog(&mut self, id: FogId) -> MinimapResult<()> {
        let fog = self.tracker.unregister_fog(id)?;
        fog.release(self.painter.as_mut());
        Ok(())
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Runs one frame of the engine.
    ///
    /// Logs a warning when the tick exceeds the configured budget.
    pub fn tick(&mut self) -> FrameStats {
        let start = Instant::now();
        let now = self.clock.now();

        let mut snapshots_rendered = 0;
        if let Some(snapshot) = self.snapshot.as_deref_mut() {
            for (_, background) in self.tracker.backgrounds_mut().iter_mut() {
                if background.needs_snapshot() {
                    snapshots_rendered += background.render_snapshots(snapshot);
                }
            }
        }

        let background_changes = self.drain_background_events();
        let fog_stamps = self.tracker.tick_fogs(self.painter.as_mut(), now);
        let views_refreshed = self.tracker.refresh_views(now);
        self.tracker.update_owner_visibility(self.painter.as_mut(), now);

        let stats = FrameStats {
            frame: self.frame_count,
            snapshots_rendered,
            background_changes,
            fog_stamps,
            views_refreshed,
            elapsed_us: u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
        };
        self.frame_count += 1;
        self.last_stats = stats;

        let budget_ms = self.settings.session.frame_budget_ms;
        let elapsed_ms = stats.elapsed_us as f64 / 1000.0;
        if budget_ms > 0.0 && elapsed_ms > budget_ms {
            tracing::warn!(
                "Minimap frame {} exceeded budget: {:.2}ms (budget: {:.2}ms)",
                stats.frame,
                elapsed_ms,
                budget_ms
            );
        }
        stats
    }

    fn drain_background_events(&mut self) -> usize {
        let mut changes = 0;
        for (_, background) in self.tracker.backgrounds_mut().iter_mut() {
            changes += background
                .drain_events()
                .filter(|event| matches!(event, BackgroundEvent::AppearanceChanged))
                .count();
        }
        for (_, view) in self.tracker.views_mut().iter_mut() {
            view.frame.drain_events().for_each(drop);
            if changes > 0 {
                view.backgrounds.invalidate();
            }
        }
        if changes > 0 {
            tracing::debug!("Background appearance changed {} times, view caches dropped", changes);
        }
        changes
    }

    /// Builds the draw list of a view.
    ///
    /// # Arguments
    ///
    /// * `view` - View to draw; `None` uses the configured auto-locate search
    /// * `viewport` - Host viewport; the widget is placed inside it
    ///
    /// # Returns
    ///
    /// An empty list if no view was found.
    pub fn compose(&mut self, view: Option<ViewId>, viewport: Rect) -> DrawList {
        let Some(view) = self.resolve_view(view) else {
            return DrawList::new();
        };
        let region = self.compositor.config().placement.compute_rect(viewport);
        let now = self.clock.now();
        self.compositor
            .compose_frame(&mut self.tracker, view, self.painter.as_mut(), now, region)
    }

    /// Routes a mouse click to the map.
    ///
    /// # Returns
    ///
    /// True if the click landed on the map of the resolved view.
    pub fn handle_click(&mut self, view: Option<ViewId>, screen: (f32, f32), left_button: bool) -> bool {
        match self.resolve_view(view) {
            Some(view) => self.compositor.handle_click(&mut self.tracker, view, screen, left_button),
            None => false,
        }
    }

    /// Drains pending map notifications.
    pub fn drain_map_events(&mut self) -> Vec<MapEvent> {
        self.compositor.drain_events().collect()
    }

    /// Drains pending notifications of every icon, in registry order.
    pub fn drain_icon_events(&mut self) -> Vec<(IconId, IconEvent)> {
        let mut events = Vec::new();
        for (id, icon) in self.tracker.icons_mut().iter_mut() {
            events.extend(icon.drain_events().map(|event| (id, event)));
        }
        events
    }

    /// Reveal factor at a world position, at the current time.
    ///
    /// # Returns
    ///
    /// `(factor, inside_fog)`, or `(1.0, false)` when no fog covers the point.
    pub fn revealed_factor(&mut self, location: Vec3, require_revealing: bool) -> (f32, bool) {
        let now = self.clock.now();
        self.tracker
            .fog_revealed_factor(self.painter.as_mut(), location, require_revealing, now)
    }

    fn resolve_view(&self, view: Option<ViewId>) -> Option<ViewId> {
        match view {
            Some(view) => self.tracker.views().contains(view).then_some(view),
            None => self.tracker.locate_view(self.settings.session.auto_locate),
        }
    }

    /// Frees every fog buffer and ends the session.
    pub fn shutdown(mut self) {
        let fogs = self.tracker.fogs().handles();
        let released = fogs.len();
        for id in fogs {
            if let Ok(fog) = self.tracker.unregister_fog(id) {
                fog.release(self.painter.as_mut());
            }
        }
        tracing::info!(
            "Minimap session stopped after {} frames, {} fog areas released",
            self.frame_count,
            released
        );
    }
}

//! # Frame Compositor
//!
//! Builds the draw list of one view in a fixed layer order and keeps the
//! per-view icon render state in sync.
//!
//! ```text
//!   region ──► fit aspect ──► canvas
//!                               │
//!   backgrounds (z, priority) ──┤
//!   icons, under-fog pass ──────┤   hidden? size? material? pass?
//!   fog layers ─────────────────┤   broad cull ─► level ─► fog gate
//!   icons, above-fog pass ──────┤   precise test ─► edge arrow
//!   boundary ───────────────────┤
//!   frustum ────────────────────┘──► DrawList
//! ```
//!
//! Composition reads the tracker first and writes icon state afterwards,
//! so every icon sees the same registry snapshot. Hover changes found while
//! composing are applied at the start of the next compose.

use std::collections::HashMap;
use std::f32::consts::{FRAC_1_SQRT_2, TAU};

use serde::{Deserialize, Serialize};

use minimap_core::view::{clamp_into_view, detect_is_in_view, edge_angle};
use minimap_core::{
    CameraPose, FogInteraction, GpuPaint, IconId, IconSizeUnit, MapIcon, MapView, Tracker,
    ViewFrustum, ViewId,
};
use minimap_shared::constants::BOUNDARY_CIRCLE_SEGMENTS;
use minimap_shared::{LinearColor, Vec2, Vec3};

use crate::layout::{fit_aspect, CanvasPlacement, Rect};
use crate::render::{DrawCommand, DrawList};

/// Compositor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Circular map instead of rectangular.
    pub circular: bool,
    /// Widget placement on screen.
    pub placement: CanvasPlacement,
    /// Canvas fill under the backgrounds.
    pub fill_color: LinearColor,
    /// Boundary outline color.
    pub boundary_color: LinearColor,
    /// Boundary outline width in pixels.
    pub boundary_width: f32,
    /// Draw the camera frustum footprint.
    pub show_frustum: bool,
    /// Frustum polygon color.
    pub frustum_color: LinearColor,
    /// Distance of the frustum floor plane below the camera.
    pub frustum_floor_distance: f32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            circular: true,
            placement: CanvasPlacement::default(),
            fill_color: LinearColor::BLACK,
            boundary_color: LinearColor::WHITE,
            boundary_width: 2.0,
            show_frustum: false,
            frustum_color: LinearColor::rgba(1.0, 1.0, 1.0, 0.25),
            frustum_floor_distance: ViewFrustum::DEFAULT_FLOOR_DISTANCE,
        }
    }
}

/// Notifications pushed by the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// The map itself was clicked.
    MapClicked {
        /// View that was clicked.
        view: ViewId,
        /// World position under the cursor.
        world: Vec3,
        /// Left or right button.
        left_button: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IconPass {
    UnderFog,
    AboveFog,
}

impl IconPass {
    const fn accepts(self, policy: FogInteraction) -> bool {
        policy.draws_above_fog() == matches!(self, Self::AboveFog)
    }
}

enum IconOutcome {
    /// Belongs to the other fog pass.
    OtherPass,
    /// Not drawn this frame.
    Culled,
    /// Drawn with this command.
    Drawn(DrawCommand),
}

/// Per-frame facts shared by every icon of one compose.
struct FrameContext<'a> {
    view_id: ViewId,
    view: &'a MapView,
    bounds: Rect,
    circular: bool,
    dpi: f32,
    pixels_per_world: f32,
    now: f64,
}

/// Composes minimap frames.
#[derive(Debug)]
pub struct Compositor {
    config: CompositorConfig,
    mouse: Option<(f32, f32)>,
    camera: Option<CameraPose>,
    /// Canvas of each view's last compose, for clicks.
    canvases: HashMap<ViewId, Rect>,
    /// Hover transitions found in the last compose.
    pending_hover: Vec<(IconId, ViewId, bool)>,
    events: Vec<MapEvent>,
    frames: u64,
}

impl Compositor {
    /// Creates a compositor.
    #[must_use]
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            mouse: None,
            camera: None,
            canvases: HashMap::new(),
            pending_hover: Vec::new(),
            events: Vec::new(),
            frames: 0,
        }
    }

    /// Configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Updates the cursor position used for hover tests.
    pub fn set_mouse_position(&mut self, position: Option<(f32, f32)>) {
        self.mouse = position;
    }

    /// Updates the camera used for the frustum overlay.
    pub fn set_camera(&mut self, camera: Option<CameraPose>) {
        self.camera = camera;
    }

    /// Canvas the view was last composed into.
    #[must_use]
    pub fn canvas(&self, view: ViewId) -> Option<Rect> {
        self.canvases.get(&view).copied()
    }

    /// Number of composed frames.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Drains pending map notifications.
    pub fn drain_events(&mut self) -> impl Iterator<Item = MapEvent> + '_ {
        self.events.drain(..)
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Builds the draw list of `view` inside `region`.
    ///
    /// # Arguments
    ///
    /// * `tracker` - Session registry; icon render state is updated
    /// * `view` - View to compose
    /// * `painter` - Fog readback backend for fog-gated icons
    /// * `now` - Simulation time
    /// * `region` - Screen area; the map is fitted and centered inside it
    ///
    /// # Returns
    ///
    /// An empty list if the view is not registered.
    pub fn compose_frame(
        &mut self,
        tracker: &mut Tracker,
        view: ViewId,
        painter: &mut dyn GpuPaint,
        now: f64,
        region: Rect,
    ) -> DrawList {
        self.apply_hover_changes(tracker);

        let mut list = DrawList::new();
        let mut rendered: Vec<(IconId, bool)> = Vec::new();
        // Expired background caches are refreshed before any icon level test
        tracker.refresh_view(view, now);
        {
            let registry: &Tracker = tracker;
            let Some(map_view) = registry.views().get(view) else {
                tracing::debug!("Compose skipped: view {:?} is not registered", view);
                return list;
            };

            let circular = self.config.circular;
            let aspect = if circular { 1.0 } else { map_view.frame.aspect_ratio() };
            let bounds = fit_aspect(region, aspect);
            self.canvases.insert(view, bounds);

            let context = FrameContext {
                view_id: view,
                view: map_view,
                bounds,
                circular,
                dpi: self.config.placement.dpi_scale,
                pixels_per_world: bounds.width * map_view.frame.uv_per_world(circular),
                now,
            };

            list.push(DrawCommand::Fill {
                bounds,
                color: self.config.fill_color,
                circular,
            });
            Self::push_backgrounds(&mut list, registry, &context);
            self.push_icons(&mut list, &mut rendered, registry, painter, &context, IconPass::UnderFog);
            Self::push_fogs(&mut list, registry, &context);
            self.push_icons(&mut list, &mut rendered, registry, painter, &context, IconPass::AboveFog);
            self.push_boundary(&mut list, bounds);
            self.push_frustum(&mut list, &context);
        }

        for (id, state) in rendered {
            if let Some(icon) = tracker.icons_mut().get_mut(id) {
                icon.mark_rendered_in_view(view, state);
            }
        }

        self.frames += 1;
        tracing::debug!("Composed view {:?}: {} commands", view, list.len());
        list
    }

    fn apply_hover_changes(&mut self, tracker: &mut Tracker) {
        for (id, view, hovered) in self.pending_hover.drain(..) {
            if let Some(icon) = tracker.icons_mut().get_mut(id) {
                icon.set_hovered(view, hovered);
            }
        }
    }

    fn push_backgrounds(list: &mut DrawList, tracker: &Tracker, context: &FrameContext<'_>) {
        let index = &context.view.backgrounds;
        let mut drawn: Vec<_> = tracker
            .backgrounds()
            .iter()
            .filter(|(_, bg)| index.is_drawn(bg))
            .collect();
        drawn.sort_by_key(|(id, bg)| (bg.z_order(), *id));

        for (id, bg) in drawn {
            let Some(level) = index.display_level(id, bg, &context.view.frame) else {
                continue;
            };
            let Some(entry) = bg.levels().get(level) else {
                continue;
            };
            let Some(texture) = entry.active_texture() else {
                continue;
            };
            let Some(uvs) = bg.corner_uvs(level, &context.view.frame, context.view.shows_background(id)) else {
                continue;
            };
            list.push(DrawCommand::Background {
                id,
                texture,
                overlay: entry.overlay,
                bounds: context.bounds,
                uvs,
            });
        }
    }

    fn push_fogs(list: &mut DrawList, tracker: &Tracker, context: &FrameContext<'_>) {
        let corners = context.view.frame.world_corners();
        for (_, fog) in tracker.fogs().iter() {
            let Some((source, staging)) = fog.layer_targets() else {
                continue;
            };
            let uvs = corners.map(|corner| fog.frame().world_to_view(corner, true).uv);
            if !overlaps_unit_square(&uvs) {
                continue;
            }
            list.push(DrawCommand::Fog {
                source,
                staging,
                bounds: context.bounds,
                uvs,
                opacity: fog.opacity(),
            });
        }
    }

    fn push_icons(
        &mut self,
        list: &mut DrawList,
        rendered: &mut Vec<(IconId, bool)>,
        tracker: &Tracker,
        painter: &mut dyn GpuPaint,
        context: &FrameContext<'_>,
        pass: IconPass,
    ) {
        let mut drawn: Vec<(i32, IconId, DrawCommand)> = Vec::new();

        for (id, icon) in tracker.icons().iter() {
            let command = match Self::place_icon(tracker, painter, context, pass, id, icon) {
                IconOutcome::OtherPass => continue,
                IconOutcome::Culled => None,
                IconOutcome::Drawn(command) => Some(command),
            };

            let hovered = command.as_ref().is_some_and(|command| self.is_under_mouse(command));
            if icon.interactable && icon.is_hovered(context.view_id) != hovered {
                self.pending_hover.push((id, context.view_id, hovered));
            }

            rendered.push((id, command.is_some()));
            if let Some(command) = command {
                drawn.push((icon.z_order, id, command));
            }
        }

        drawn.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        list.extend(drawn.into_iter().map(|(_, _, command)| command));
    }

    fn place_icon(
        tracker: &Tracker,
        painter: &mut dyn GpuPaint,
        context: &FrameContext<'_>,
        pass: IconPass,
        id: IconId,
        icon: &MapIcon,
    ) -> IconOutcome {
        // Each icon belongs to exactly one pass, so it is recorded at most once
        if !pass.accepts(icon.fog_policy) {
            return IconOutcome::OtherPass;
        }
        if !icon.is_visible() || icon.size <= 0.0 {
            return IconOutcome::Culled;
        }
        let Some(texture) = icon.material else {
            return IconOutcome::Culled;
        };
        let frame = &context.view.frame;
        if !frame.is_category_visible(&icon.category) {
            return IconOutcome::Culled;
        }

        let (size_px, world_size) = match icon.size_unit {
            IconSizeUnit::ScreenSpace => {
                let px = icon.size * context.dpi;
                let world = if context.pixels_per_world > 0.0 {
                    px / context.pixels_per_world
                } else {
                    0.0
                };
                (px, world)
            }
            IconSizeUnit::WorldSpace => (icon.size * context.pixels_per_world, icon.size),
        };

        if !icon.arrow.enabled && !frame.broad_contains(icon.location, world_size * FRAC_1_SQRT_2) {
            return IconOutcome::Culled;
        }
        if !context.view.is_same_level(icon.location, icon.background_policy, tracker.backgrounds()) {
            return IconOutcome::Culled;
        }
        if tracker.has_fog() {
            if let Some(require_revealing) = icon.fog_policy.gate() {
                let (factor, _) = tracker.fog_revealed_factor(painter, icon.location, require_revealing, context.now);
                if factor < icon.fog_threshold {
                    return IconOutcome::Culled;
                }
            }
        }

        let projection = frame.world_to_view(icon.location, context.circular);
        let above_fog = matches!(pass, IconPass::AboveFog);

        if detect_is_in_view(projection.uv, uv_radius(context.bounds, size_px), context.circular) {
            let rotation = if icon.rotates { frame.world_yaw_to_view(icon.yaw) } else { 0.0 };
            return IconOutcome::Drawn(DrawCommand::Icon {
                id,
                texture,
                center: context.bounds.point_at(projection.uv),
                size: size_px,
                rotation,
                color: icon.color,
                arrow: false,
                above_fog,
            });
        }

        if !icon.arrow.enabled {
            return IconOutcome::Culled;
        }

        let arrow_px = icon.arrow.size * context.dpi;
        let radius = uv_radius(context.bounds, arrow_px).x;
        let edge = clamp_into_view(projection.uv, radius, context.circular);
        let rotation = if icon.arrow.rotates { edge_angle(projection.uv) } else { 0.0 };
        IconOutcome::Drawn(DrawCommand::Icon {
            id,
            texture,
            center: context.bounds.point_at(edge),
            size: arrow_px,
            rotation,
            color: icon.color,
            arrow: true,
            above_fog,
        })
    }

    fn is_under_mouse(&self, command: &DrawCommand) -> bool {
        let (Some((mx, my)), DrawCommand::Icon { center, size, .. }) = (self.mouse, command) else {
            return false;
        };
        let (dx, dy) = (mx - center.0, my - center.1);
        (dx * dx + dy * dy).sqrt() < *size * 0.5
    }

    fn push_boundary(&self, list: &mut DrawList, bounds: Rect) {
        let points = if self.config.circular {
            let (cx, cy) = bounds.center();
            let radius = bounds.width * 0.5;
            (0..BOUNDARY_CIRCLE_SEGMENTS)
                .map(|i| {
                    #[allow(clippy::cast_precision_loss)]
                    let angle = i as f32 / BOUNDARY_CIRCLE_SEGMENTS as f32 * TAU;
                    (cx + angle.cos() * radius, cy + angle.sin() * radius)
                })
                .collect()
        } else {
            vec![
                (bounds.x, bounds.y),
                (bounds.right(), bounds.y),
                (bounds.right(), bounds.bottom()),
                (bounds.x, bounds.bottom()),
            ]
        };
        list.push(DrawCommand::Boundary {
            points,
            color: self.config.boundary_color,
            width: self.config.boundary_width,
        });
    }

    fn push_frustum(&self, list: &mut DrawList, context: &FrameContext<'_>) {
        if !self.config.show_frustum {
            return;
        }
        let Some(camera) = self.camera else {
            return;
        };
        let Some(corners) = ViewFrustum::project(
            &context.view.frame,
            &camera,
            self.config.frustum_floor_distance,
            context.circular,
        ) else {
            return;
        };
        list.push(DrawCommand::Frustum {
            points: corners.map(|uv| context.bounds.point_at(uv)),
            color: self.config.frustum_color,
        });
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Handles a click on the minimap widget.
    ///
    /// Pushes [`MapEvent::MapClicked`] with the world position under the
    /// cursor, and a click event on every interactable icon hovered on the
    /// view.
    ///
    /// # Returns
    ///
    /// False if the view was never composed or the click missed the map.
    pub fn handle_click(&mut self, tracker: &mut Tracker, view: ViewId, screen: (f32, f32), left_button: bool) -> bool {
        let Some(bounds) = self.canvas(view) else {
            return false;
        };
        let Some(map_view) = tracker.views().get(view) else {
            return false;
        };

        let uv = bounds.uv_of(screen.0, screen.1);
        if !detect_is_in_view(uv, Vec2::ZERO, self.config.circular) {
            return false;
        }

        let world = map_view.frame.view_to_world(uv);
        self.events.push(MapEvent::MapClicked { view, world, left_button });

        for (_, icon) in tracker.icons_mut().iter_mut() {
            icon.click(view, left_button);
        }
        true
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(CompositorConfig::default())
    }
}

/// Half of a pixel size in UV units of the canvas, per axis.
fn uv_radius(bounds: Rect, size_px: f32) -> Vec2 {
    let half = size_px * 0.5;
    Vec2::new(
        if bounds.width > 0.0 { half / bounds.width } else { 0.0 },
        if bounds.height > 0.0 { half / bounds.height } else { 0.0 },
    )
}

fn overlaps_unit_square(uvs: &[Vec2; 4]) -> bool {
    let (min, max) = uvs
        .iter()
        .fold((uvs[0], uvs[0]), |(lo, hi), uv| (lo.min(*uv), hi.max(*uv)));
    !(max.x < 0.0 || max.y < 0.0 || min.x > 1.0 || min.y > 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimap_core::{RotationPolicy, SoftwarePainter, ViewFrame};
    use minimap_shared::TextureHandle;

    #[test]
    fn test_pass_routing() {
        assert!(IconPass::UnderFog.accepts(FogInteraction::AlwaysRenderUnderFog));
        assert!(IconPass::UnderFog.accepts(FogInteraction::OnlyRenderWhenRevealing));
        assert!(IconPass::UnderFog.accepts(FogInteraction::OnlyRenderWhenExplored));
        assert!(!IconPass::UnderFog.accepts(FogInteraction::AlwaysRenderAboveFog));
        assert!(IconPass::AboveFog.accepts(FogInteraction::AlwaysRenderAboveFog));
        assert!(!IconPass::AboveFog.accepts(FogInteraction::AlwaysRenderUnderFog));
    }

    #[test]
    fn test_uv_radius_guards_empty_canvas() {
        assert_eq!(uv_radius(Rect::new(0.0, 0.0, 200.0, 100.0), 20.0), Vec2::new(0.05, 0.1));
        assert_eq!(uv_radius(Rect::ZERO, 20.0), Vec2::ZERO);
    }

    #[test]
    fn test_overlap_check() {
        let inside = [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::ONE, Vec2::new(0.0, 1.0)];
        assert!(overlaps_unit_square(&inside));

        let right = inside.map(|uv| uv + Vec2::new(1.5, 0.0));
        assert!(!overlaps_unit_square(&right));
    }

    #[test]
    fn test_default_config() {
        let config = CompositorConfig::default();
        assert!(config.circular);
        assert!(!config.show_frustum);
        assert_eq!(config.frustum_floor_distance, 600.0);
    }

    #[test]
    fn test_culled_icons_recorded_once_per_frame() {
        let mut tracker = Tracker::default();
        let frame = ViewFrame::new(Vec2::splat(1000.0), RotationPolicy::Fixed { yaw: 0.0 });
        let view_id = tracker.register_view(MapView::new(frame, 0.05)).expect("view slot");

        let textured =
            |x: f32| MapIcon::new("npc", Vec3::new(x, 0.0, 0.0)).with_material(TextureHandle::new(7, 32, 32));
        let mut hidden = textured(0.0);
        hidden.set_visible(false);
        let mut empty = textured(100.0);
        empty.size = 0.0;
        let mut above = MapIcon::new("npc", Vec3::new(200.0, 0.0, 0.0));
        above.fog_policy = FogInteraction::AlwaysRenderAboveFog;
        let mut ids = Vec::new();
        for icon in [hidden, empty, above, textured(300.0)] {
            ids.push(tracker.register_icon(icon).expect("icon slot"));
        }

        let mut compositor = Compositor::new(CompositorConfig::default());
        let mut painter = SoftwarePainter::new();
        let mut list = DrawList::new();
        let mut rendered = Vec::new();
        let context = FrameContext {
            view_id,
            view: tracker.views().get(view_id).expect("live view"),
            bounds: Rect::new(0.0, 0.0, 200.0, 200.0),
            circular: false,
            dpi: 1.0,
            pixels_per_world: 0.1,
            now: 0.0,
        };
        for pass in [IconPass::UnderFog, IconPass::AboveFog] {
            compositor.push_icons(&mut list, &mut rendered, &tracker, &mut painter, &context, pass);
        }

        rendered.sort_by_key(|(id, _)| *id);
        let mut expected: Vec<(IconId, bool)> = ids.iter().map(|id| (*id, *id == ids[3])).collect();
        expected.sort_by_key(|(id, _)| *id);
        assert_eq!(rendered, expected);
        assert_eq!(list.len(), 1);
    }
}

//! # Map Icons
//!
//! Icon appearance, visibility policies and per-view render state.
//!
//! Every (icon, view) pair remembers whether the icon was drawn last
//! frame. Enter/leave events fire once per transition; re-marking the same
//! state is free.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use minimap_shared::constants::{DEFAULT_ARROW_SIZE, DEFAULT_FOG_REVEAL_THRESHOLD, DEFAULT_ICON_SIZE};
use minimap_shared::{LinearColor, TextureHandle, Vec3};

use crate::background::BackgroundInteraction;
use crate::memory::Handle;
use crate::view::ViewId;

/// Handle to a registered icon.
pub type IconId = Handle<MapIcon>;

/// Unit of [`MapIcon::size`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconSizeUnit {
    /// Pixels, scaled by the DPI factor.
    #[default]
    ScreenSpace,
    /// World units, scaled with the view.
    WorldSpace,
}

/// How an icon interacts with the fog layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FogInteraction {
    /// Drawn under the fog, never gated.
    #[default]
    AlwaysRenderUnderFog,
    /// Drawn under the fog while the spot is being revealed.
    OnlyRenderWhenRevealing,
    /// Drawn under the fog once the spot was ever revealed.
    OnlyRenderWhenExplored,
    /// Drawn above the fog, never gated.
    AlwaysRenderAboveFog,
}

impl FogInteraction {
    /// True if the icon is drawn in the pass after the fog layer.
    #[inline]
    #[must_use]
    pub const fn draws_above_fog(self) -> bool {
        matches!(self, Self::AlwaysRenderAboveFog)
    }

    /// Fog signal the icon is gated on: `Some(true)` for "revealing now",
    /// `Some(false)` for "ever revealed", None if not gated.
    #[inline]
    #[must_use]
    pub const fn gate(self) -> Option<bool> {
        match self {
            Self::OnlyRenderWhenRevealing => Some(true),
            Self::OnlyRenderWhenExplored => Some(false),
            Self::AlwaysRenderUnderFog | Self::AlwaysRenderAboveFog => None,
        }
    }
}

/// Arrow drawn on the map edge for icons outside the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeArrow {
    /// Whether the arrow is drawn at all.
    pub enabled: bool,
    /// Rotate the arrow to point at the icon.
    pub rotates: bool,
    /// Arrow size in pixels.
    pub size: f32,
}

impl Default for EdgeArrow {
    fn default() -> Self {
        Self {
            enabled: false,
            rotates: true,
            size: DEFAULT_ARROW_SIZE,
        }
    }
}

/// Notifications pushed by an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconEvent {
    /// Started being drawn on a view.
    EnteredView(ViewId),
    /// Stopped being drawn on a view.
    LeftView(ViewId),
    /// Mouse moved onto the icon.
    HoverStarted(ViewId),
    /// Mouse moved off the icon.
    HoverEnded(ViewId),
    /// Hovered icon was clicked.
    Clicked {
        /// View the click happened on.
        view: ViewId,
        /// Left or right button.
        left_button: bool,
    },
}

/// A marker on the minimap.
#[derive(Debug, Clone)]
pub struct MapIcon {
    /// World position.
    pub location: Vec3,
    /// World yaw in degrees.
    pub yaw: f32,
    /// Category name, used for per-view filtering.
    pub category: String,
    /// Rotate the icon with its yaw.
    pub rotates: bool,
    /// Size, in `size_unit`.
    pub size: f32,
    /// Unit of `size`.
    pub size_unit: IconSizeUnit,
    /// Tint.
    pub color: LinearColor,
    /// Draw order among icons.
    pub z_order: i32,
    /// Icon texture. Icons without one are skipped.
    pub material: Option<TextureHandle>,
    /// Edge arrow settings.
    pub arrow: EdgeArrow,
    /// Receives hover and click events.
    pub interactable: bool,
    /// Background level filter.
    pub background_policy: BackgroundInteraction,
    /// Fog layer interaction.
    pub fog_policy: FogInteraction,
    /// Minimum reveal factor for fog-gated icons.
    pub fog_threshold: f32,
    /// Hide the owning entity while it stands in unrevealed fog.
    pub hide_owner_inside_fog: bool,
    visible: bool,
    owner_hidden: bool,
    rendered_in: HashMap<ViewId, bool>,
    hovered_in: HashSet<ViewId>,
    events: Vec<IconEvent>,
}

impl MapIcon {
    /// Creates a visible icon with default appearance.
    #[must_use]
    pub fn new(category: &str, location: Vec3) -> Self {
        Self {
            location,
            yaw: 0.0,
            category: category.to_string(),
            rotates: false,
            size: DEFAULT_ICON_SIZE,
            size_unit: IconSizeUnit::ScreenSpace,
            color: LinearColor::WHITE,
            z_order: 0,
            material: None,
            arrow: EdgeArrow::default(),
            interactable: false,
            background_policy: BackgroundInteraction::AlwaysRender,
            fog_policy: FogInteraction::AlwaysRenderUnderFog,
            fog_threshold: DEFAULT_FOG_REVEAL_THRESHOLD,
            hide_owner_inside_fog: false,
            visible: true,
            owner_hidden: false,
            rendered_in: HashMap::new(),
            hovered_in: HashSet::new(),
            events: Vec::new(),
        }
    }

    /// Returns the icon with a texture assigned.
    #[must_use]
    pub fn with_material(mut self, material: TextureHandle) -> Self {
        self.material = Some(material);
        self
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Whether the icon is drawn at all.
    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the icon. Hiding leaves every view.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.leave_all_views();
        }
    }

    /// Records whether the icon was drawn on a view this frame.
    ///
    /// # Returns
    ///
    /// True if the state changed and an event was pushed.
    pub fn mark_rendered_in_view(&mut self, view: ViewId, rendered: bool) -> bool {
        let previous = self.rendered_in.insert(view, rendered).unwrap_or(false);
        if previous == rendered {
            return false;
        }
        self.events.push(if rendered {
            IconEvent::EnteredView(view)
        } else {
            IconEvent::LeftView(view)
        });
        true
    }

    /// Whether the icon was drawn on `view` last frame.
    #[must_use]
    pub fn is_rendered_in_view(&self, view: ViewId) -> bool {
        self.rendered_in.get(&view).copied().unwrap_or(false)
    }

    /// Forgets a view, leaving it first if the icon was drawn there.
    pub fn forget_view(&mut self, view: ViewId) {
        if self.rendered_in.remove(&view) == Some(true) {
            self.events.push(IconEvent::LeftView(view));
        }
        if self.hovered_in.remove(&view) {
            self.events.push(IconEvent::HoverEnded(view));
        }
    }

    /// Leaves every view the icon is drawn on.
    pub fn leave_all_views(&mut self) {
        let views: HashSet<ViewId> = self
            .rendered_in
            .keys()
            .chain(self.hovered_in.iter())
            .copied()
            .collect();
        for view in views {
            self.forget_view(view);
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Updates the hover state on a view. Events fire only on change.
    pub fn set_hovered(&mut self, view: ViewId, hovered: bool) -> bool {
        let changed = if hovered {
            self.hovered_in.insert(view)
        } else {
            self.hovered_in.remove(&view)
        };
        if changed {
            self.events.push(if hovered {
                IconEvent::HoverStarted(view)
            } else {
                IconEvent::HoverEnded(view)
            });
        }
        changed
    }

    /// Whether the mouse is over the icon on `view`.
    #[must_use]
    pub fn is_hovered(&self, view: ViewId) -> bool {
        self.hovered_in.contains(&view)
    }

    /// Pushes a click if the icon is interactable and hovered on `view`.
    pub fn click(&mut self, view: ViewId, left_button: bool) -> bool {
        if !self.interactable || !self.is_hovered(view) {
            return false;
        }
        self.events.push(IconEvent::Clicked { view, left_button });
        true
    }

    /// Whether the owning entity should currently be hidden.
    #[inline]
    #[must_use]
    pub const fn is_owner_hidden(&self) -> bool {
        self.owner_hidden
    }

    /// Updates the owner-hidden state from a fog reveal test.
    pub fn set_owner_hidden(&mut self, hidden: bool) {
        self.owner_hidden = self.hide_owner_inside_fog && hidden;
    }

    /// Drains pending notifications.
    pub fn drain_events(&mut self) -> impl Iterator<Item = IconEvent> + '_ {
        self.events.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Arena;
    use crate::view::MapView;

    fn views(count: usize) -> Vec<ViewId> {
        let mut arena: Arena<MapView> = Arena::new(count);
        (0..count)
            .map(|_| {
                arena
                    .allocate(MapView::new(
                        crate::view::ViewFrame::new(
                            minimap_shared::Vec2::ONE,
                            crate::view::RotationPolicy::Fixed { yaw: 0.0 },
                        ),
                        0.05,
                    ))
                    .expect("slot")
            })
            .collect()
    }

    #[test]
    fn test_same_state_twice_is_silent() {
        let view = views(1)[0];
        let mut icon = MapIcon::new("enemy", Vec3::ZERO);

        assert!(icon.mark_rendered_in_view(view, true));
        assert!(!icon.mark_rendered_in_view(view, true));
        assert_eq!(icon.drain_events().count(), 1);
    }

    #[test]
    fn test_alternating_states_fire_each_time() {
        let view = views(1)[0];
        let mut icon = MapIcon::new("enemy", Vec3::ZERO);

        icon.mark_rendered_in_view(view, true);
        icon.mark_rendered_in_view(view, false);
        icon.mark_rendered_in_view(view, true);

        let events: Vec<IconEvent> = icon.drain_events().collect();
        assert_eq!(
            events,
            vec![
                IconEvent::EnteredView(view),
                IconEvent::LeftView(view),
                IconEvent::EnteredView(view),
            ]
        );
    }

    #[test]
    fn test_first_mark_false_is_silent() {
        let view = views(1)[0];
        let mut icon = MapIcon::new("enemy", Vec3::ZERO);
        assert!(!icon.mark_rendered_in_view(view, false));
        assert_eq!(icon.drain_events().count(), 0);
    }

    #[test]
    fn test_hiding_leaves_every_view() {
        let ids = views(3);
        let mut icon = MapIcon::new("loot", Vec3::ZERO);
        icon.mark_rendered_in_view(ids[0], true);
        icon.mark_rendered_in_view(ids[1], true);
        icon.mark_rendered_in_view(ids[2], false);
        let _ = icon.drain_events().count();

        icon.set_visible(false);
        let events: Vec<IconEvent> = icon.drain_events().collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, IconEvent::LeftView(_))));
        assert!(!icon.is_rendered_in_view(ids[0]));
    }

    #[test]
    fn test_click_requires_hover_and_interactable() {
        let view = views(1)[0];
        let mut icon = MapIcon::new("npc", Vec3::ZERO);

        assert!(icon.set_hovered(view, true));
        assert!(!icon.set_hovered(view, true));
        assert!(!icon.click(view, true));

        icon.interactable = true;
        assert!(icon.click(view, false));
        assert!(icon.set_hovered(view, false));
        assert!(!icon.click(view, true));

        let events: Vec<IconEvent> = icon.drain_events().collect();
        assert_eq!(
            events,
            vec![
                IconEvent::HoverStarted(view),
                IconEvent::Clicked { view, left_button: false },
                IconEvent::HoverEnded(view),
            ]
        );
    }

    #[test]
    fn test_fog_gates() {
        assert_eq!(FogInteraction::OnlyRenderWhenRevealing.gate(), Some(true));
        assert_eq!(FogInteraction::OnlyRenderWhenExplored.gate(), Some(false));
        assert_eq!(FogInteraction::default().gate(), None);
        assert!(FogInteraction::AlwaysRenderAboveFog.draws_above_fog());
    }

    #[test]
    fn test_owner_hidden_needs_opt_in() {
        let mut icon = MapIcon::new("player", Vec3::ZERO);
        icon.set_owner_hidden(true);
        assert!(!icon.is_owner_hidden());

        icon.hide_owner_inside_fog = true;
        icon.set_owner_hidden(true);
        assert!(icon.is_owner_hidden());
    }
}

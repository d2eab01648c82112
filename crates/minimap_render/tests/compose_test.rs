//! # Compose Tests
//!
//! Layer order, icon culling, fog gating, edge arrows and input handling
//! on a 2000x2000 world footprint drawn into a 200x200 canvas.

use minimap_core::{
    BackgroundInteraction, BackgroundLevel, BackgroundVolume, CameraPose, FogArea, FogConfig, FogInteraction, IconEvent,
    IconId, MapIcon, MapView, RevealMode, Revealer, RotationPolicy, SoftwarePainter, Tracker,
    ViewFrame, ViewId,
};
use minimap_render::{Compositor, CompositorConfig, DrawCommand, DrawLayer, DrawList, MapEvent, Rect};
use minimap_shared::{Rotator, TextureHandle, Transform, Vec2, Vec3};

const REGION: Rect = Rect::new(0.0, 0.0, 200.0, 200.0);

fn setup() -> (Tracker, ViewId) {
    let mut tracker = Tracker::default();
    let frame = ViewFrame::new(Vec2::splat(1000.0), RotationPolicy::Fixed { yaw: 0.0 });
    let view = tracker.register_view(MapView::new(frame, 0.05)).expect("view slot");
    (tracker, view)
}

fn rectangular() -> Compositor {
    Compositor::new(CompositorConfig {
        circular: false,
        ..CompositorConfig::default()
    })
}

fn icon_at(x: f32, y: f32) -> MapIcon {
    MapIcon::new("npc", Vec3::new(x, y, 0.0)).with_material(TextureHandle::new(7, 32, 32))
}

fn add(tracker: &mut Tracker, icon: MapIcon) -> IconId {
    tracker.register_icon(icon).expect("icon slot")
}

fn add_fog(tracker: &mut Tracker, painter: &mut SoftwarePainter) {
    let fog = FogArea::new(
        Transform::IDENTITY,
        Vec2::splat(3000.0),
        &FogConfig { resolution: 256, ..FogConfig::default() },
        0.0,
        painter,
    );
    tracker.register_fog(fog).expect("fog slot");
}

fn icon_command(list: &DrawList, id: IconId) -> Option<&DrawCommand> {
    list.commands()
        .iter()
        .find(|command| matches!(command, DrawCommand::Icon { id: drawn, .. } if *drawn == id))
}

fn events(tracker: &mut Tracker, id: IconId) -> Vec<IconEvent> {
    tracker.icons_mut().get_mut(id).expect("live icon").drain_events().collect()
}

/// Test: Layers come out in the fixed order.
#[test]
fn test_layer_order_is_fixed() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();

    let mut bg = BackgroundVolume::new(Transform::IDENTITY, Vec3::new(2000.0, 2000.0, 500.0));
    bg.set_levels(vec![BackgroundLevel::with_texture(0.0, TextureHandle::new(1, 512, 512))]);
    tracker.register_background(bg).expect("background slot");
    add_fog(&mut tracker, &mut painter);

    let mut above = icon_at(0.0, 500.0);
    above.fog_policy = FogInteraction::AlwaysRenderAboveFog;
    add(&mut tracker, above);
    add(&mut tracker, icon_at(500.0, 0.0));

    tracker.tick_fogs(&mut painter, 0.0);
    tracker.refresh_views(0.0);

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);

    let layers: Vec<DrawLayer> = list.commands().iter().map(DrawCommand::layer).collect();
    assert!(layers.windows(2).all(|pair| pair[0] <= pair[1]), "{layers:?}");
    for layer in [
        DrawLayer::Canvas,
        DrawLayer::Background,
        DrawLayer::IconsUnderFog,
        DrawLayer::Fog,
        DrawLayer::IconsAboveFog,
        DrawLayer::Boundary,
    ] {
        assert_eq!(list.count(layer), 1, "{layer:?}");
    }
    assert_eq!(list.count(DrawLayer::Frustum), 0);
}

/// Test: Icons land at their projected screen position.
#[test]
fn test_icon_screen_position() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    let id = add(&mut tracker, icon_at(500.0, 0.0));

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);

    let Some(DrawCommand::Icon { center, size, arrow, .. }) = icon_command(&list, id) else {
        panic!("icon not drawn");
    };
    assert!((center.0 - 150.0).abs() < 1e-3);
    assert!((center.1 - 100.0).abs() < 1e-3);
    assert_eq!(*size, 32.0);
    assert!(!arrow);
}

/// Test: Hidden, empty, untextured and far icons are skipped.
#[test]
fn test_icon_culling() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();

    let mut hidden = icon_at(0.0, 0.0);
    hidden.set_visible(false);
    let hidden = add(&mut tracker, hidden);

    let mut empty = icon_at(0.0, 0.0);
    empty.size = 0.0;
    let empty = add(&mut tracker, empty);

    let untextured = add(&mut tracker, MapIcon::new("npc", Vec3::ZERO));
    let far = add(&mut tracker, icon_at(0.0, 5000.0));
    let drawn = add(&mut tracker, icon_at(-200.0, 300.0));

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    let icons: Vec<IconId> = list.icons().collect();

    assert_eq!(icons, vec![drawn]);
    for id in [hidden, empty, untextured, far] {
        assert!(!tracker.icons().get(id).expect("live").is_rendered_in_view(view));
    }
    assert!(tracker.icons().get(drawn).expect("live").is_rendered_in_view(view));
}

/// Test: Out-of-view icons with an edge arrow are pinned to the border.
#[test]
fn test_edge_arrow_fallback() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();

    let mut icon = icon_at(5000.0, 0.0);
    icon.arrow.enabled = true;
    let id = add(&mut tracker, icon);

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);

    let Some(DrawCommand::Icon { center, size, rotation, arrow, .. }) = icon_command(&list, id) else {
        panic!("arrow not drawn");
    };
    assert!(*arrow);
    assert_eq!(*size, 50.0);
    assert!((center.0 - 175.0).abs() < 1e-3);
    assert!((center.1 - 100.0).abs() < 1e-3);
    assert!(rotation.abs() < 1e-3);
}

/// Test: Fog-gated icons follow the reveal signal they are gated on.
#[test]
fn test_fog_gated_icons() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    add_fog(&mut tracker, &mut painter);
    tracker
        .register_revealer(Revealer::new(Vec3::new(-500.0, 0.0, 0.0)).with_mode(RevealMode::Temporary))
        .expect("revealer slot");

    let mut revealing = icon_at(-500.0, 0.0);
    revealing.fog_policy = FogInteraction::OnlyRenderWhenRevealing;
    let revealing = add(&mut tracker, revealing);

    let mut explored = icon_at(-500.0, 0.0);
    explored.fog_policy = FogInteraction::OnlyRenderWhenExplored;
    let explored = add(&mut tracker, explored);

    let mut dark = icon_at(500.0, 0.0);
    dark.fog_policy = FogInteraction::OnlyRenderWhenRevealing;
    let dark = add(&mut tracker, dark);

    let ungated = add(&mut tracker, icon_at(500.0, 0.0));

    tracker.tick_fogs(&mut painter, 0.0);
    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    let icons: Vec<IconId> = list.icons().collect();

    assert!(icons.contains(&revealing));
    assert!(!icons.contains(&explored), "temporary reveal counted as explored");
    assert!(!icons.contains(&dark));
    assert!(icons.contains(&ungated));
}

/// Test: Enter and leave events fire once per transition.
#[test]
fn test_view_events_fire_once() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    let id = add(&mut tracker, icon_at(100.0, 100.0));
    let mut compositor = rectangular();

    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.1, REGION);
    assert_eq!(events(&mut tracker, id), vec![IconEvent::EnteredView(view)]);

    tracker.icons_mut().get_mut(id).expect("live").location = Vec3::new(0.0, 9000.0, 0.0);
    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.2, REGION);
    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.3, REGION);
    assert_eq!(events(&mut tracker, id), vec![IconEvent::LeftView(view)]);
    assert_eq!(compositor.frame_count(), 4);
}

/// Test: Only the active priority is drawn, in z-order.
#[test]
fn test_backgrounds_by_priority_and_z_order() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();

    let mut ids = Vec::new();
    for (priority, z_order) in [(5, 2), (1, 0), (5, 1)] {
        let mut bg = BackgroundVolume::new(Transform::IDENTITY, Vec3::new(1500.0, 1500.0, 500.0));
        bg.set_priority(priority);
        bg.set_z_order(z_order);
        bg.set_levels(vec![BackgroundLevel::with_texture(0.0, TextureHandle::new(10, 64, 64))]);
        ids.push(tracker.register_background(bg).expect("background slot"));
    }
    tracker.refresh_views(0.0);

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    let drawn: Vec<_> = list
        .commands()
        .iter()
        .filter_map(|command| match command {
            DrawCommand::Background { id, .. } => Some(*id),
            _ => None,
        })
        .collect();

    assert_eq!(drawn, vec![ids[2], ids[0]]);
}

/// Test: Hidden categories are not drawn on the view.
#[test]
fn test_hidden_category() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    add(&mut tracker, icon_at(0.0, 0.0));
    tracker
        .views_mut()
        .get_mut(view)
        .expect("live view")
        .frame
        .set_category_visible("npc", false);

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert_eq!(list.icons().count(), 0);
}

/// Test: Clicks report the world position under the cursor.
#[test]
fn test_click_on_map() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    let mut compositor = Compositor::default();

    // Not composed yet
    assert!(!compositor.handle_click(&mut tracker, view, (100.0, 100.0), true));

    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert!(compositor.handle_click(&mut tracker, view, (150.0, 100.0), false));

    let events: Vec<MapEvent> = compositor.drain_events().collect();
    let [MapEvent::MapClicked { world, left_button, .. }] = events.as_slice() else {
        panic!("expected one click, got {events:?}");
    };
    assert!(!left_button);
    assert!((world.x - 500.0).abs() < 1e-2);
    assert!(world.y.abs() < 1e-2);

    // Corner of the square, outside the circle
    assert!(!compositor.handle_click(&mut tracker, view, (2.0, 2.0), true));
}

/// Test: Hover is applied on the next compose, then clicks reach the icon.
#[test]
fn test_hover_then_click() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    let mut icon = icon_at(500.0, 0.0);
    icon.interactable = true;
    let id = add(&mut tracker, icon);

    let mut compositor = rectangular();
    compositor.set_mouse_position(Some((150.0, 101.0)));

    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert!(!tracker.icons().get(id).expect("live").is_hovered(view));

    let _ = compositor.compose_frame(&mut tracker, view, &mut painter, 0.1, REGION);
    assert!(tracker.icons().get(id).expect("live").is_hovered(view));

    assert!(compositor.handle_click(&mut tracker, view, (150.0, 101.0), true));
    assert_eq!(
        events(&mut tracker, id),
        vec![
            IconEvent::EnteredView(view),
            IconEvent::HoverStarted(view),
            IconEvent::Clicked { view, left_button: true },
        ]
    );
}

/// Test: The frustum overlay is drawn when enabled and a camera is set.
#[test]
fn test_frustum_overlay() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    let mut compositor = Compositor::new(CompositorConfig {
        circular: false,
        show_frustum: true,
        ..CompositorConfig::default()
    });

    let list = compositor.compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert_eq!(list.count(DrawLayer::Frustum), 0);

    compositor.set_camera(Some(CameraPose {
        location: Vec3::new(0.0, 0.0, 1000.0),
        rotation: Rotator::new(-90.0, 0.0, 0.0),
        fov_degrees: 90.0,
        aspect: 1.0,
    }));
    let list = compositor.compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert_eq!(list.count(DrawLayer::Frustum), 1);

    let Some(DrawCommand::Frustum { points, .. }) = list.commands().last() else {
        panic!("frustum is the last layer");
    };
    for (x, y) in points {
        assert!((x - 40.0).abs() < 0.1 || (x - 160.0).abs() < 0.1);
        assert!((y - 40.0).abs() < 0.1 || (y - 160.0).abs() < 0.1);
    }
}

/// Test: Unknown views compose to an empty list.
#[test]
fn test_unknown_view() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    tracker.unregister_view(view).expect("live view");

    let list = rectangular().compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert!(list.is_empty());
}

/// Test: The icon level filter follows the view into another area without a
/// separate cache refresh.
#[test]
fn test_level_filter_refreshes_on_compose() {
    let mut painter = SoftwarePainter::new();
    let (mut tracker, view) = setup();
    for (x, priority) in [(-300.0, 1), (300.0, 5)] {
        let mut bg = BackgroundVolume::new(Transform::from_location(Vec3::new(x, 0.0, 0.0)), Vec3::splat(200.0));
        bg.set_priority(priority);
        tracker.register_background(bg).expect("background slot");
    }
    let mut icon = icon_at(300.0, 0.0);
    icon.background_policy = BackgroundInteraction::OnlyRenderInSameVolume;
    let id = add(&mut tracker, icon);

    let mut compositor = rectangular();
    let owner = |x: f32| Transform::from_location(Vec3::new(x, 0.0, 0.0));
    tracker.views_mut().get_mut(view).expect("live view").set_owner_transform(owner(-300.0));
    let list = compositor.compose_frame(&mut tracker, view, &mut painter, 0.0, REGION);
    assert!(icon_command(&list, id).is_none());

    tracker.views_mut().get_mut(view).expect("live view").set_owner_transform(owner(300.0));
    let list = compositor.compose_frame(&mut tracker, view, &mut painter, 0.01, REGION);
    assert!(icon_command(&list, id).is_none());

    let list = compositor.compose_frame(&mut tracker, view, &mut painter, 0.1, REGION);
    assert!(icon_command(&list, id).is_some());
    assert_eq!(tracker.views().get(view).expect("live view").backgrounds.active_priority(), 5);
}

//! # Fog Area
//!
//! A world region with its own fog buffer and revealer list.
//!
//! The revealer list is derived from the registry once at attach time and
//! then kept current from registry events; it is never polled.

use crossbeam_channel::Receiver;

use minimap_shared::{Transform, Vec2, Vec3};

use crate::config::{FogConfig, FogOpacity};
use crate::memory::Arena;
use crate::tracker::{EntryId, RegistryEvent};
use crate::view::{RotationPolicy, ViewFrame};

use super::buffer::{FogBuffer, FogChannel};
use super::gpu::{GpuPaint, RenderTargetId};
use super::revealer::{compute_shape, Revealer};
use super::RevealerId;

/// A fog-of-war region.
#[derive(Debug)]
pub struct FogArea {
    frame: ViewFrame,
    extent: Vec2,
    buffer: Option<FogBuffer>,
    opacity: FogOpacity,
    revealers: Vec<RevealerId>,
    registry: Option<Receiver<RegistryEvent>>,
}

impl FogArea {
    /// Creates a fog area and allocates its buffers.
    ///
    /// # Arguments
    ///
    /// * `transform` - Area transform; scale is folded into `extent`
    /// * `extent` - Unscaled half-extent
    /// * `config` - Resolution, combine policy and opacities
    /// * `read_lifetime` - Seconds a CPU copy of a buffer stays valid
    /// * `painter` - GPU backend
    pub fn new(
        transform: Transform,
        extent: Vec2,
        config: &FogConfig,
        read_lifetime: f64,
        painter: &mut dyn GpuPaint,
    ) -> Self {
        let extent = extent.mul_elements(transform.scale.xy());
        let mut frame = ViewFrame::new(extent, RotationPolicy::Fixed { yaw: transform.rotation.yaw });
        frame.set_owner_transform(Transform::from_location(transform.location));

        Self {
            frame,
            extent,
            buffer: FogBuffer::new(painter, config.resolution, config.combine, read_lifetime),
            opacity: config.opacity,
            revealers: Vec::new(),
            registry: None,
        }
    }

    /// Binds the area to the registry.
    ///
    /// # Arguments
    ///
    /// * `revealers` - Every revealer registered right now
    /// * `events` - Registry notifications from then on
    pub fn attach(&mut self, revealers: Vec<RevealerId>, events: Receiver<RegistryEvent>) {
        self.revealers = revealers;
        self.registry = Some(events);
    }

    fn sync_registry(&mut self) {
        let Some(events) = &self.registry else {
            return;
        };
        for event in events.try_iter() {
            match event {
                RegistryEvent::Registered(EntryId::Revealer(id)) => {
                    if !self.revealers.contains(&id) {
                        self.revealers.push(id);
                    }
                }
                RegistryEvent::Unregistered(EntryId::Revealer(id)) => {
                    self.revealers.retain(|known| *known != id);
                }
                _ => {}
            }
        }
    }

    /// Runs one fog frame: clear, paint every active revealer, combine.
    ///
    /// # Returns
    ///
    /// Number of stamps painted.
    pub fn tick(&mut self, painter: &mut dyn GpuPaint, revealers: &Arena<Revealer>, now: f64) -> usize {
        self.sync_registry();
        let world_to_pixel = self.world_to_pixel_ratio();
        let Some(buffer) = self.buffer.as_mut() else {
            return 0;
        };

        #[allow(clippy::cast_precision_loss)]
        let canvas = buffer.resolution() as f32;
        buffer.begin_frame(painter);

        let mut painted = 0;
        for id in &self.revealers {
            let Some(revealer) = revealers.get(*id) else {
                continue;
            };
            if let Some(shape) = compute_shape(revealer, &self.frame, canvas, world_to_pixel) {
                if buffer.paint(painter, &shape.quad(), &shape.material()) {
                    painted += 1;
                }
            }
        }

        buffer.combine(painter);
        buffer.end_frame(now);
        painted
    }

    /// Reveal factor at a world position.
    ///
    /// # Returns
    ///
    /// None if the point is outside the area or the fog is disabled.
    pub fn query_point(
        &self,
        painter: &mut dyn GpuPaint,
        world: Vec3,
        require_revealing: bool,
        now: f64,
    ) -> Option<f32> {
        let buffer = self.buffer.as_ref()?;
        let projection = self.frame.world_to_view(world, true);
        if !projection.in_view {
            return None;
        }
        let channel = if require_revealing {
            FogChannel::Revealing
        } else {
            FogChannel::Explored
        };
        buffer.query_uv(painter, projection.uv, channel, now)
    }

    /// True if the point is inside the area's forced-rectangular footprint.
    #[must_use]
    pub fn contains(&self, world: Vec3) -> bool {
        self.frame.world_to_view(world, true).in_view
    }

    /// Fog pixels per world unit, or 1 for a degenerate area.
    #[must_use]
    pub fn world_to_pixel_ratio(&self) -> f32 {
        let Some(buffer) = &self.buffer else {
            return 1.0;
        };
        let span = 2.0 * self.extent.x;
        if span == 0.0 {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let size = buffer.resolution() as f32;
            size / span
        }
    }

    /// Frame mapping the area onto the fog texture.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    /// Fog buffers, or None when disabled.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> Option<&FogBuffer> {
        self.buffer.as_ref()
    }

    /// Source and staging targets for drawing the fog layer.
    #[must_use]
    pub fn layer_targets(&self) -> Option<(RenderTargetId, RenderTargetId)> {
        self.buffer
            .as_ref()
            .map(|buffer| (buffer.source_target(), buffer.staging_target()))
    }

    /// Minimap layer opacities.
    #[inline]
    #[must_use]
    pub const fn opacity(&self) -> FogOpacity {
        self.opacity
    }

    /// Revealers painted by this area.
    #[must_use]
    pub fn revealers(&self) -> &[RevealerId] {
        &self.revealers
    }

    /// Frees the GPU buffers.
    pub fn release(self, painter: &mut dyn GpuPaint) {
        if let Some(buffer) = self.buffer {
            buffer.release(painter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fog::{RevealMode, SoftwarePainter};

    fn area(painter: &mut SoftwarePainter) -> FogArea {
        FogArea::new(
            Transform::IDENTITY,
            Vec2::new(1000.0, 1000.0),
            &FogConfig { resolution: 64, ..FogConfig::default() },
            0.0,
            painter,
        )
    }

    #[test]
    fn test_disabled_fog_never_answers() {
        let mut painter = SoftwarePainter::new();
        let fog = FogArea::new(
            Transform::IDENTITY,
            Vec2::new(100.0, 100.0),
            &FogConfig { resolution: 0, ..FogConfig::default() },
            0.05,
            &mut painter,
        );
        assert!(fog.buffer().is_none());
        assert!(fog.query_point(&mut painter, Vec3::ZERO, false, 0.0).is_none());
        assert_eq!(fog.world_to_pixel_ratio(), 1.0);
    }

    #[test]
    fn test_revealer_list_follows_registry() {
        let mut painter = SoftwarePainter::new();
        let mut fog = area(&mut painter);
        let mut revealers = Arena::new(4);
        let first = revealers.allocate(Revealer::new(Vec3::ZERO)).expect("slot");

        let (tx, rx) = crossbeam_channel::unbounded();
        fog.attach(vec![first], rx);

        let second = revealers
            .allocate(Revealer::new(Vec3::new(500.0, 0.0, 0.0)))
            .expect("slot");
        tx.send(RegistryEvent::Registered(EntryId::Revealer(second))).expect("send");
        assert_eq!(fog.tick(&mut painter, &revealers, 0.0), 2);

        tx.send(RegistryEvent::Unregistered(EntryId::Revealer(first))).expect("send");
        revealers.free(first).expect("freed");
        assert_eq!(fog.tick(&mut painter, &revealers, 0.1), 1);
        assert_eq!(fog.revealers(), &[second]);
    }

    #[test]
    fn test_query_around_revealer() {
        let mut painter = SoftwarePainter::new();
        let mut fog = area(&mut painter);
        let mut revealers = Arena::new(4);
        let id = revealers
            .allocate(Revealer::new(Vec3::new(-400.0, 300.0, 0.0)).with_mode(RevealMode::Permanent))
            .expect("slot");
        fog.attach(vec![id], crossbeam_channel::never());

        fog.tick(&mut painter, &revealers, 0.0);

        let near = Vec3::new(-400.0, 300.0, 0.0);
        let far = Vec3::new(600.0, -600.0, 0.0);
        assert_eq!(fog.query_point(&mut painter, near, true, 1.0), Some(1.0));
        assert_eq!(fog.query_point(&mut painter, near, false, 1.0), Some(1.0));
        assert_eq!(fog.query_point(&mut painter, far, false, 1.0), Some(0.0));
        assert!(fog.query_point(&mut painter, Vec3::new(5000.0, 0.0, 0.0), false, 1.0).is_none());
    }

    #[test]
    fn test_world_to_pixel_ratio() {
        let mut painter = SoftwarePainter::new();
        let fog = area(&mut painter);
        assert!((fog.world_to_pixel_ratio() - 0.032).abs() < 1e-6);
        assert!(fog.contains(Vec3::new(999.0, -999.0, 0.0)));
    }

    #[test]
    fn test_release_frees_targets() {
        let mut painter = SoftwarePainter::new();
        let fog = area(&mut painter);
        assert_eq!(painter.target_count(), 3);
        fog.release(&mut painter);
        assert_eq!(painter.target_count(), 0);
    }
}

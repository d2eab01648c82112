//! # Fog Buffer
//!
//! Persistent reveal accumulator with ping-pong permanent buffers.
//!
//! ```text
//!          ┌─────────┐  clear   ┌──────────┐  paint   ┌───────────┐
//!   tick ─►│  Idle   ├─────────►│ Painting ├─────────►│ Combining │
//!          └────▲────┘          └──────────┘          └─────┬─────┘
//!               │  invalidate stale reads ┌────────┐        │ dst = f(src, staging)
//!               └─────────────────────────┤ Ready  │◄───────┘ swap roles
//!                                         └────────┘
//! ```
//!
//! - **Staging**: this frame's revealer paint, cleared every frame
//! - **Permanent A/B**: one is the source (last frame's state), the other
//!   receives the combine. Roles flip exactly once per frame, after the
//!   combine draw is queued.
//!
//! Readbacks are cached per target and repeated at most once per
//! `read_lifetime` seconds, however many queries arrive.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

use minimap_shared::constants::MIN_FOG_RESOLUTION;
use minimap_shared::{LinearColor, Vec2};

use super::gpu::{FogMaterial, GpuPaint, PaintQuad, RenderTargetId};

/// How staging paint is folded into the permanent state.
///
/// Both policies only look at the staging R channel, so `Temporary`
/// stamps never reach the permanent buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CombinePolicy {
    /// Keep the brightest value ever painted.
    #[default]
    Accumulate,
    /// Move toward the painted value by at most `step` per frame.
    GradualFill {
        /// Largest increase per frame.
        step: f32,
    },
}

impl CombinePolicy {
    /// Combines one pixel. The result is mirrored into every color channel.
    #[must_use]
    pub fn combine(self, previous: LinearColor, staging: LinearColor) -> LinearColor {
        let target = previous.r.max(staging.r);
        let value = match self {
            Self::Accumulate => target,
            Self::GradualFill { step } => previous.r + (target - previous.r).min(step.max(0.0)),
        };
        LinearColor::rgb(value, value, value)
    }
}

/// Which permanent buffer is the source this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Buffer A holds the accumulated state.
    A,
    /// Buffer B holds the accumulated state.
    B,
}

impl BufferRole {
    /// The other buffer.
    #[inline]
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Position in the per-frame fog cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogPhase {
    /// Between frames.
    Idle,
    /// Staging cleared, accepting revealer paint.
    Painting,
    /// Combine queued, roles not yet swapped.
    Combining,
    /// Roles swapped, waiting for cache maintenance.
    Ready,
}

/// Which signal a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogChannel {
    /// Staging: revealed this frame.
    Revealing,
    /// Source permanent buffer: revealed at some point.
    Explored,
}

#[derive(Debug, Default)]
struct ReadCache {
    pixels: Vec<LinearColor>,
    read_at: Option<f64>,
}

impl ReadCache {
    fn is_fresh(&self, now: f64, lifetime: f64) -> bool {
        self.read_at.is_some_and(|at| now - at <= lifetime)
    }
}

const STAGING: usize = 2;

/// Double-buffered fog texture set of one fog area.
#[derive(Debug)]
pub struct FogBuffer {
    resolution: u32,
    /// Permanent A, permanent B, staging.
    targets: [RenderTargetId; 3],
    source: BufferRole,
    phase: FogPhase,
    policy: CombinePolicy,
    read_lifetime: f64,
    caches: [RefCell<ReadCache>; 3],
    readbacks: Cell<u64>,
    frames: u64,
}

impl FogBuffer {
    /// Allocates the three render targets.
    ///
    /// # Arguments
    ///
    /// * `painter` - GPU backend owning the targets
    /// * `resolution` - Square size; 1 is raised to 2
    /// * `policy` - Combine rule
    /// * `read_lifetime` - Seconds a CPU copy stays valid
    ///
    /// # Returns
    ///
    /// None for a zero resolution: the fog stays disabled.
    pub fn new(
        painter: &mut dyn GpuPaint,
        resolution: u32,
        policy: CombinePolicy,
        read_lifetime: f64,
    ) -> Option<Self> {
        if resolution == 0 {
            tracing::warn!("Fog resolution 0: fog disabled");
            return None;
        }
        let clamped = resolution.max(MIN_FOG_RESOLUTION);
        if clamped != resolution {
            tracing::warn!("Fog resolution {} clamped to {}", resolution, clamped);
        }

        let targets = [(); 3].map(|()| painter.create_target(clamped, clamped));
        for target in targets {
            painter.clear(target, LinearColor::BLACK);
        }

        Some(Self {
            resolution: clamped,
            targets,
            source: BufferRole::A,
            phase: FogPhase::Idle,
            policy,
            read_lifetime,
            caches: Default::default(),
            readbacks: Cell::new(0),
            frames: 0,
        })
    }

    // =========================================================================
    // Frame cycle
    // =========================================================================

    /// Clears staging and starts accepting paint.
    pub fn begin_frame(&mut self, painter: &mut dyn GpuPaint) {
        painter.clear(self.targets[STAGING], LinearColor::BLACK);
        self.phase = FogPhase::Painting;
    }

    /// Paints one revealer stamp into staging.
    ///
    /// # Returns
    ///
    /// False if the buffer is not in the painting phase.
    pub fn paint(&mut self, painter: &mut dyn GpuPaint, quad: &PaintQuad, material: &FogMaterial) -> bool {
        if self.phase != FogPhase::Painting {
            return false;
        }
        painter.draw_quad(self.targets[STAGING], quad, material);
        true
    }

    /// Combines source and staging into the destination, then swaps roles.
    pub fn combine(&mut self, painter: &mut dyn GpuPaint) {
        self.phase = FogPhase::Combining;

        let destination = self.source.flipped();
        let material = FogMaterial::Combine {
            previous: self.targets[self.source.index()],
            staging: self.targets[STAGING],
            policy: self.policy,
        };
        painter.draw_quad(
            self.targets[destination.index()],
            &PaintQuad::full_target(self.resolution),
            &material,
        );

        self.source = destination;
        self.phase = FogPhase::Ready;
        tracing::debug!("Fog roles swapped: source now {:?}", self.source);
    }

    /// Drops CPU copies older than the read lifetime and closes the frame.
    pub fn end_frame(&mut self, now: f64) {
        for cache in &self.caches {
            let mut cache = cache.borrow_mut();
            if !cache.is_fresh(now, self.read_lifetime) {
                cache.read_at = None;
                cache.pixels.clear();
            }
        }
        self.phase = FogPhase::Idle;
        self.frames += 1;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Reads the reveal factor at a fog UV.
    ///
    /// # Returns
    ///
    /// None if `uv` is outside the unit square or the readback was unusable.
    pub fn query_uv(&self, painter: &mut dyn GpuPaint, uv: Vec2, channel: FogChannel, now: f64) -> Option<f32> {
        if uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 {
            return None;
        }

        let slot = match channel {
            FogChannel::Revealing => STAGING,
            FogChannel::Explored => self.source.index(),
        };
        let mut cache = self.caches[slot].borrow_mut();
        if !cache.is_fresh(now, self.read_lifetime) {
            cache.pixels = painter.read_back_pixels(self.targets[slot]);
            cache.read_at = Some(now);
            self.readbacks.set(self.readbacks.get() + 1);
            tracing::debug!("Fog readback of target {:?}", self.targets[slot]);
        }

        let size = self.resolution as usize;
        if cache.pixels.len() != size * size {
            tracing::warn!(
                "Fog readback returned {} pixels, expected {}",
                cache.pixels.len(),
                size * size
            );
            return None;
        }

        let x = pixel_coordinate(uv.x, size);
        let y = pixel_coordinate(uv.y, size);
        cache.pixels.get(y * size + x).map(|pixel| pixel.reveal_factor())
    }

    /// Number of GPU readbacks performed.
    #[inline]
    #[must_use]
    pub fn readback_count(&self) -> u64 {
        self.readbacks.get()
    }

    /// Completed frames.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Square resolution in pixels.
    #[inline]
    #[must_use]
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Permanent buffer currently holding the accumulated state.
    #[inline]
    #[must_use]
    pub const fn source_role(&self) -> BufferRole {
        self.source
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> FogPhase {
        self.phase
    }

    /// Render target of the accumulated state.
    #[inline]
    #[must_use]
    pub const fn source_target(&self) -> RenderTargetId {
        self.targets[self.source.index()]
    }

    /// Render target of this frame's paint.
    #[inline]
    #[must_use]
    pub const fn staging_target(&self) -> RenderTargetId {
        self.targets[STAGING]
    }

    /// Frees every render target.
    pub fn release(self, painter: &mut dyn GpuPaint) {
        for target in self.targets {
            painter.release_target(target);
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn pixel_coordinate(unit: f32, size: usize) -> usize {
    ((unit * size as f32).round() as usize).min(size - 1)
}

//! CPU implementation of [`GpuPaint`].
//!
//! Rasterizes quads at pixel centers and evaluates the fog materials per
//! pixel. Used by tests, benches and headless tools; it also counts draws
//! and readbacks so callers can verify rate limiting.

use std::collections::HashMap;

use minimap_shared::{LinearColor, Vec2};

use super::gpu::{FogMaterial, GpuPaint, PaintQuad, RenderTargetId};

#[derive(Debug, Clone)]
struct SoftwareTarget {
    width: u32,
    height: u32,
    pixels: Vec<LinearColor>,
}

/// In-memory render targets.
#[derive(Debug, Default)]
pub struct SoftwarePainter {
    targets: HashMap<RenderTargetId, SoftwareTarget>,
    next_id: u32,
    draws: u64,
    readbacks: u64,
}

impl SoftwarePainter {
    /// Creates a painter with no targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of quads drawn.
    #[inline]
    #[must_use]
    pub const fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Number of readbacks served.
    #[inline]
    #[must_use]
    pub const fn readback_count(&self) -> u64 {
        self.readbacks
    }

    /// Number of live targets.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Reads one pixel without counting a readback.
    #[must_use]
    pub fn pixel(&self, target: RenderTargetId, x: u32, y: u32) -> Option<LinearColor> {
        let target = self.targets.get(&target)?;
        if x >= target.width || y >= target.height {
            return None;
        }
        target.pixels.get((y * target.width + x) as usize).copied()
    }

    fn draw_reveal(target: &mut SoftwareTarget, quad: &PaintQuad, paint: impl Fn(Vec2) -> LinearColor) {
        let corners = quad.vertices.map(|v| Vec2::new(v.position[0], v.position[1]));
        let uvs = quad.vertices.map(|v| Vec2::new(v.uv[0], v.uv[1]));

        for triangle in [[0, 1, 2], [0, 2, 3]] {
            let [a, b, c] = triangle.map(|i| corners[i]);
            let [ua, ub, uc] = triangle.map(|i| uvs[i]);

            let area = edge(a, b, c);
            if area.abs() <= f32::EPSILON {
                continue;
            }

            let (min, max) = (a.min(b).min(c), a.max(b).max(c));
            let (x0, x1) = pixel_span(min.x, max.x, target.width);
            let (y0, y1) = pixel_span(min.y, max.y, target.height);

            for y in y0..y1 {
                for x in x0..x1 {
                    #[allow(clippy::cast_precision_loss)]
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let w0 = edge(b, c, p) / area;
                    let w1 = edge(c, a, p) / area;
                    let w2 = edge(a, b, p) / area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }

                    let uv = ua * w0 + ub * w1 + uc * w2;
                    let index = (y * target.width + x) as usize;
                    if let Some(pixel) = target.pixels.get_mut(index) {
                        *pixel = pixel.max(paint(uv));
                    }
                }
            }
        }
    }
}

impl GpuPaint for SoftwarePainter {
    fn create_target(&mut self, width: u32, height: u32) -> RenderTargetId {
        self.next_id += 1;
        let id = RenderTargetId(self.next_id);
        self.targets.insert(
            id,
            SoftwareTarget {
                width,
                height,
                pixels: vec![LinearColor::TRANSPARENT; (width * height) as usize],
            },
        );
        id
    }

    fn release_target(&mut self, target: RenderTargetId) {
        self.targets.remove(&target);
    }

    fn clear(&mut self, target: RenderTargetId, color: LinearColor) {
        if let Some(target) = self.targets.get_mut(&target) {
            target.pixels.fill(color);
        }
    }

    fn draw_quad(&mut self, target: RenderTargetId, quad: &PaintQuad, material: &FogMaterial) {
        self.draws += 1;
        match *material {
            FogMaterial::Reveal { mask, drop_off } => {
                if let Some(target) = self.targets.get_mut(&target) {
                    Self::draw_reveal(target, quad, |uv| mask.apply(falloff(uv, drop_off)));
                }
            }
            FogMaterial::Combine { previous, staging, policy } => {
                // Full-target blend: the quad always covers the whole target
                let (Some(previous), Some(staging)) = (
                    self.targets.get(&previous).map(|t| t.pixels.clone()),
                    self.targets.get(&staging).map(|t| t.pixels.clone()),
                ) else {
                    return;
                };
                if let Some(target) = self.targets.get_mut(&target) {
                    for ((out, old), new) in target.pixels.iter_mut().zip(previous).zip(staging) {
                        *out = policy.combine(old, new);
                    }
                }
            }
        }
    }

    fn read_back_pixels(&mut self, target: RenderTargetId) -> Vec<LinearColor> {
        self.readbacks += 1;
        self.targets
            .get(&target)
            .map(|t| t.pixels.clone())
            .unwrap_or_default()
    }
}

/// Signed double area of triangle (a, b, p).
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Pixel rows or columns whose centers may fall in `[min, max]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_span(min: f32, max: f32, size: u32) -> (u32, u32) {
    let start = (min - 0.5).ceil().max(0.0) as u32;
    let end = ((max - 0.5).floor() + 1.0).max(0.0) as u32;
    (start.min(size), end.min(size))
}

/// Soft-edged stamp intensity at a quad UV.
///
/// Full intensity inside the hard extent, linear ramp to zero at the quad
/// border. The weaker axis wins.
#[must_use]
pub fn falloff(uv: Vec2, hard: Vec2) -> f32 {
    let axis = |coordinate: f32, hard: f32| {
        let distance = (coordinate - 0.5).abs() * 2.0;
        if distance <= hard {
            1.0
        } else {
            ((1.0 - distance) / (1.0 - hard)).clamp(0.0, 1.0)
        }
    };
    axis(uv.x, hard.x).min(axis(uv.y, hard.y))
}

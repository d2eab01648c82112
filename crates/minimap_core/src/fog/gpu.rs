//! GPU paint seam.
//!
//! Fog buffers live on the GPU. The engine only queues textured quads into
//! render targets and, rarely, reads a target back to the CPU.

use bytemuck::{Pod, Zeroable};

use minimap_shared::{ChannelMask, LinearColor, Vec2};

use super::buffer::CombinePolicy;

/// Opaque id of a render target owned by a [`GpuPaint`] backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u32);

/// Quad corner in target pixel space.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PaintVertex {
    /// Pixel position.
    pub position: [f32; 2],
    /// Texture coordinate passed to the material.
    pub uv: [f32; 2],
}

/// Four corners in winding order. UVs run (0,0), (1,0), (1,1), (0,1).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PaintQuad {
    /// Corner vertices.
    pub vertices: [PaintVertex; 4],
}

impl PaintQuad {
    const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    /// Builds a quad from pixel-space corners.
    #[must_use]
    pub fn from_corners(corners: [Vec2; 4]) -> Self {
        let mut vertices = [PaintVertex::default(); 4];
        for ((vertex, corner), uv) in vertices.iter_mut().zip(corners).zip(Self::UVS) {
            *vertex = PaintVertex {
                position: corner.to_array(),
                uv,
            };
        }
        Self { vertices }
    }

    /// Quad covering a whole `size` x `size` target.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn full_target(size: u32) -> Self {
        let s = size as f32;
        Self::from_corners([
            Vec2::ZERO,
            Vec2::new(s, 0.0),
            Vec2::new(s, s),
            Vec2::new(0.0, s),
        ])
    }
}

/// Material applied when drawing a quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogMaterial {
    /// Revealer stamp: masked intensity with a soft border.
    Reveal {
        /// Channels the stamp writes.
        mask: ChannelMask,
        /// Hard extent over total extent, per axis.
        drop_off: Vec2,
    },
    /// Folds staging paint into the previous permanent state.
    Combine {
        /// Previous permanent buffer.
        previous: RenderTargetId,
        /// This frame's staging buffer.
        staging: RenderTargetId,
        /// Blend rule.
        policy: CombinePolicy,
    },
}

/// GPU operations the fog engine needs.
///
/// Draws are queued and never block. Readbacks are expensive and must be
/// rate-limited by the caller.
pub trait GpuPaint {
    /// Allocates a render target.
    fn create_target(&mut self, width: u32, height: u32) -> RenderTargetId;

    /// Frees a render target.
    fn release_target(&mut self, target: RenderTargetId);

    /// Fills a target with one color.
    fn clear(&mut self, target: RenderTargetId, color: LinearColor);

    /// Draws a textured quad into a target.
    fn draw_quad(&mut self, target: RenderTargetId, quad: &PaintQuad, material: &FogMaterial);

    /// Copies a target's pixels to the CPU, row-major.
    fn read_back_pixels(&mut self, target: RenderTargetId) -> Vec<LinearColor>;
}

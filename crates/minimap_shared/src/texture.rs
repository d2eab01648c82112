//! Opaque handles to textures owned by the host renderer.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A texture or render target owned by the GPU backend.
///
/// The minimap never touches pixel data through this handle; it only
/// needs the id to reference the texture in draw commands and the size to
/// compute sampling rectangles.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct TextureHandle {
    /// Backend texture id.
    pub id: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TextureHandle {
    /// Creates a new texture handle.
    #[must_use]
    pub const fn new(id: u32, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    /// Size in pixels as floats.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size(&self) -> crate::math::Vec2 {
        crate::math::Vec2::new(self.width as f32, self.height as f32)
    }
}

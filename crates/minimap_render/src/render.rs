//! Draw list produced by the compositor.
//!
//! Commands are plain data in submission order. Texture UV corners follow
//! the view's corner order: (0,0), (1,0), (1,1), (0,1).

use minimap_core::{BackgroundId, FogOpacity, IconId, RenderTargetId};
use minimap_shared::{LinearColor, TextureHandle, Vec2};

use crate::layout::Rect;

/// Fixed layers of a minimap frame, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DrawLayer {
    /// Canvas fill and clip setup.
    Canvas,
    /// Background areas.
    Background,
    /// Icons drawn below the fog.
    IconsUnderFog,
    /// Fog areas.
    Fog,
    /// Icons drawn above the fog.
    IconsAboveFog,
    /// Map boundary outline.
    Boundary,
    /// Camera frustum overlay.
    Frustum,
}

/// A single minimap draw command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Canvas fill, clipped to the map shape.
    Fill {
        /// Canvas bounds.
        bounds: Rect,
        /// Fill color.
        color: LinearColor,
        /// Inscribed circle instead of the rectangle.
        circular: bool,
    },
    /// One level of a background area.
    Background {
        /// Source area.
        id: BackgroundId,
        /// Level texture.
        texture: TextureHandle,
        /// Optional overlay drawn with the same UVs.
        overlay: Option<TextureHandle>,
        /// Canvas bounds.
        bounds: Rect,
        /// Texture UVs at the canvas corners.
        uvs: [Vec2; 4],
    },
    /// A fog area: permanent and current reveal signals.
    Fog {
        /// Permanent buffer to sample.
        source: RenderTargetId,
        /// Current-frame reveal buffer.
        staging: RenderTargetId,
        /// Canvas bounds.
        bounds: Rect,
        /// Fog texture UVs at the canvas corners.
        uvs: [Vec2; 4],
        /// Layer opacities.
        opacity: FogOpacity,
    },
    /// An icon or its edge arrow.
    Icon {
        /// Source icon.
        id: IconId,
        /// Icon texture.
        texture: TextureHandle,
        /// Screen-space center.
        center: (f32, f32),
        /// Screen-space size in pixels.
        size: f32,
        /// Rotation in degrees.
        rotation: f32,
        /// Tint.
        color: LinearColor,
        /// Drawn as an edge arrow.
        arrow: bool,
        /// Drawn in the pass after the fog.
        above_fog: bool,
    },
    /// Map outline as a closed polyline.
    Boundary {
        /// Screen-space points.
        points: Vec<(f32, f32)>,
        /// Stroke color.
        color: LinearColor,
        /// Line width.
        width: f32,
    },
    /// Camera footprint polygon.
    Frustum {
        /// Screen-space corners.
        points: [(f32, f32); 4],
        /// Fill color.
        color: LinearColor,
    },
}

impl DrawCommand {
    /// Layer the command belongs to.
    #[must_use]
    pub const fn layer(&self) -> DrawLayer {
        match self {
            Self::Fill { .. } => DrawLayer::Canvas,
            Self::Background { .. } => DrawLayer::Background,
            Self::Icon { above_fog: false, .. } => DrawLayer::IconsUnderFog,
            Self::Fog { .. } => DrawLayer::Fog,
            Self::Icon { above_fog: true, .. } => DrawLayer::IconsAboveFog,
            Self::Boundary { .. } => DrawLayer::Boundary,
            Self::Frustum { .. } => DrawLayer::Frustum,
        }
    }

    /// Rotated screen-space quad of an icon command.
    ///
    /// # Returns
    ///
    /// None for every other command.
    #[must_use]
    pub fn icon_quad(&self) -> Option<[DrawVertex; 4]> {
        let Self::Icon { center, size, rotation, color, .. } = self else {
            return None;
        };
        let half = *size * 0.5;
        let color = color.to_array();
        let corners = [(-half, -half, 0.0, 0.0), (half, -half, 1.0, 0.0), (half, half, 1.0, 1.0), (-half, half, 0.0, 1.0)];

        Some(corners.map(|(x, y, u, v)| {
            let offset = Vec2::new(x, y).rotate(*rotation);
            DrawVertex::new(center.0 + offset.x, center.1 + offset.y, u, v, color)
        }))
    }
}

/// Commands of one composed frame, in submission order.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: Vec::with_capacity(256),
        }
    }

    /// Appends a command.
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Appends multiple commands.
    pub fn extend(&mut self, commands: impl IntoIterator<Item = DrawCommand>) {
        self.commands.extend(commands);
    }

    /// All commands.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if nothing was drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Icons drawn this frame, in draw order.
    pub fn icons(&self) -> impl Iterator<Item = IconId> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Icon { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Number of commands on a layer.
    #[must_use]
    pub fn count(&self, layer: DrawLayer) -> usize {
        self.commands.iter().filter(|command| command.layer() == layer).count()
    }
}

/// Vertex for icon quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawVertex {
    /// Position (x, y).
    pub position: [f32; 2],
    /// UV coordinates.
    pub uv: [f32; 2],
    /// Color (RGBA).
    pub color: [f32; 4],
}

impl DrawVertex {
    /// Creates a new vertex.
    #[must_use]
    pub const fn new(x: f32, y: f32, u: f32, v: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
            color,
        }
    }
}

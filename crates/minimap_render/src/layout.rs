//! Canvas placement for the minimap widget.

use serde::{Deserialize, Serialize};

use minimap_shared::constants::DEFAULT_MINIMAP_SIZE;
use minimap_shared::Vec2;

/// A rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// X position (left edge).
    pub x: f32,
    /// Y position (top edge).
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// A zero-sized rect at the origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns the center point.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Returns true if the point is inside the rectangle.
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Screen position of a map UV inside this rectangle.
    #[must_use]
    pub fn point_at(&self, uv: Vec2) -> (f32, f32) {
        (self.x + uv.x * self.width, self.y + uv.y * self.height)
    }

    /// Map UV of a screen position. A degenerate axis maps to its center.
    #[must_use]
    pub fn uv_of(&self, x: f32, y: f32) -> Vec2 {
        let u = if self.width == 0.0 { 0.5 } else { (x - self.x) / self.width };
        let v = if self.height == 0.0 { 0.5 } else { (y - self.y) / self.height };
        Vec2::new(u, v)
    }
}

/// Horizontal anchor of the minimap inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlignment {
    /// Anchor to the left edge.
    Left,
    /// Centered.
    Center,
    /// Anchor to the right edge.
    #[default]
    Right,
    /// Stretch between the margins.
    Fill,
}

/// Vertical anchor of the minimap inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    /// Anchor to the top edge.
    #[default]
    Top,
    /// Centered.
    Center,
    /// Anchor to the bottom edge.
    Bottom,
    /// Stretch between the margins.
    Fill,
}

/// Where the minimap widget sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasPlacement {
    /// Horizontal anchor.
    pub horizontal: HorizontalAlignment,
    /// Vertical anchor.
    pub vertical: VerticalAlignment,
    /// Distance from the anchored edges, in pixels.
    pub margin: f32,
    /// Widget size before DPI scaling, in pixels.
    pub size: Vec2,
    /// DPI scale applied to the widget and to screen-space icons.
    pub dpi_scale: f32,
}

impl Default for CanvasPlacement {
    fn default() -> Self {
        Self {
            horizontal: HorizontalAlignment::Right,
            vertical: VerticalAlignment::Top,
            margin: 16.0,
            size: Vec2::splat(DEFAULT_MINIMAP_SIZE),
            dpi_scale: 1.0,
        }
    }
}

impl CanvasPlacement {
    /// Widget rectangle inside a viewport.
    #[must_use]
    pub fn compute_rect(&self, viewport: Rect) -> Rect {
        let size = self.size * self.dpi_scale;
        let margin = self.margin;

        let (x, width) = match self.horizontal {
            HorizontalAlignment::Left => (viewport.x + margin, size.x),
            HorizontalAlignment::Center => (viewport.x + (viewport.width - size.x) * 0.5, size.x),
            HorizontalAlignment::Right => (viewport.right() - margin - size.x, size.x),
            HorizontalAlignment::Fill => (viewport.x + margin, (viewport.width - 2.0 * margin).max(0.0)),
        };
        let (y, height) = match self.vertical {
            VerticalAlignment::Top => (viewport.y + margin, size.y),
            VerticalAlignment::Center => (viewport.y + (viewport.height - size.y) * 0.5, size.y),
            VerticalAlignment::Bottom => (viewport.bottom() - margin - size.y, size.y),
            VerticalAlignment::Fill => (viewport.y + margin, (viewport.height - 2.0 * margin).max(0.0)),
        };

        Rect::new(x, y, width, height)
    }
}

/// Largest sub-rectangle of `region` with the given width/height ratio,
/// centered in it.
///
/// A non-positive aspect returns the region unchanged.
#[must_use]
pub fn fit_aspect(region: Rect, aspect: f32) -> Rect {
    if aspect.is_nan() || aspect <= 0.0 || region.height <= 0.0 {
        return region;
    }

    let (width, height) = if region.width / region.height > aspect {
        (region.height * aspect, region.height)
    } else {
        (region.width, region.width / aspect)
    };

    Rect::new(
        region.x + (region.width - width) * 0.5,
        region.y + (region.height - height) * 0.5,
        width,
        height,
    )
}

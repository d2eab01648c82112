//! Map-shape helpers shared by the compositor and icon queries.
//!
//! [`ViewFrame::world_to_view`](super::ViewFrame::world_to_view) always
//! answers "inside the rectangle". These helpers add the circular shape and
//! the icon's own footprint on top of that.

use minimap_shared::Vec2;

/// Returns true if any part of an icon at `uv` is inside the map shape.
///
/// # Arguments
///
/// * `uv` - Icon center in map space
/// * `outer_radius_uv` - Icon half-size converted to UV units per axis
/// * `circular` - Test against the inscribed circle instead of the square
#[must_use]
pub fn detect_is_in_view(uv: Vec2, outer_radius_uv: Vec2, circular: bool) -> bool {
    if circular {
        let reach = 0.5 + outer_radius_uv.x;
        (uv - Vec2::HALF).length_squared() < reach * reach
    } else {
        uv.x > -outer_radius_uv.x
            && uv.x < 1.0 + outer_radius_uv.x
            && uv.y > -outer_radius_uv.y
            && uv.y < 1.0 + outer_radius_uv.y
    }
}

/// Moves `uv` onto the map edge, keeping its direction from the center.
///
/// The result keeps an icon of radius `outer_radius_uv` fully inside the
/// shape. A point exactly at the center is returned unchanged.
#[must_use]
pub fn clamp_into_view(uv: Vec2, outer_radius_uv: f32, circular: bool) -> Vec2 {
    let centered = uv - Vec2::HALF;
    let limit = 0.5 - outer_radius_uv;

    if circular {
        let angle = centered.y.atan2(centered.x);
        let (sin, cos) = angle.sin_cos();
        return Vec2::new(0.5 + cos * limit, 0.5 + sin * limit);
    }

    if centered.x.abs() > centered.y.abs() {
        // Pin to the left/right edge, slide along it to keep the direction
        let clamped_x = centered.x.signum() * limit;
        Vec2::new(0.5 + clamped_x, 0.5 + centered.y / centered.x * clamped_x)
    } else if centered.y != 0.0 {
        let clamped_y = centered.y.signum() * limit;
        Vec2::new(0.5 + centered.x / centered.y * clamped_y, 0.5 + clamped_y)
    } else {
        uv
    }
}

/// Angle in degrees from the map center toward `uv`, for edge arrows.
#[must_use]
pub fn edge_angle(uv: Vec2) -> f32 {
    (uv.y - 0.5).atan2(uv.x - 0.5).to_degrees()
}

//! Camera frustum footprint on the minimap.
//!
//! Intersects the four corner rays of a perspective camera with a virtual
//! floor plane below it, then projects the hits into a view. Only works
//! while the camera looks down steeply enough for every ray to hit the
//! floor.

use minimap_shared::{Rotator, Vec2, Vec3};

use super::ViewFrame;

/// Pose and lens of the player camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Camera location.
    pub location: Vec3,
    /// Camera rotation.
    pub rotation: Rotator,
    /// Horizontal field of view in degrees.
    pub fov_degrees: f32,
    /// Viewport width over height.
    pub aspect: f32,
}

/// Frustum projection onto a floor plane.
pub struct ViewFrustum;

impl ViewFrustum {
    /// Default distance of the virtual floor below the camera.
    pub const DEFAULT_FLOOR_DISTANCE: f32 = 600.0;

    /// Cameras pitched above this (degrees) look too close to the horizon.
    pub const MAX_PITCH: f32 = -40.0;

    /// World positions where the corner rays hit the floor.
    ///
    /// Corners are ordered top-left, top-right, bottom-right, bottom-left
    /// in screen space.
    ///
    /// # Returns
    ///
    /// None if the camera looks toward the horizon or any ray points up.
    #[must_use]
    pub fn floor_corners(camera: &CameraPose, floor_distance: f32) -> Option<[Vec3; 4]> {
        if Rotator::normalize_axis(camera.rotation.pitch) >= Self::MAX_PITCH {
            return None;
        }

        let forward = camera.rotation.forward();
        let (sin_yaw, cos_yaw) = camera.rotation.yaw.to_radians().sin_cos();
        let right = Vec3::new(-sin_yaw, cos_yaw, 0.0);
        let up = forward.cross(right);

        let tan_h = (camera.fov_degrees.to_radians() * 0.5).tan();
        let tan_v = if camera.aspect > 0.0 { tan_h / camera.aspect } else { tan_h };
        let floor_z = camera.location.z - floor_distance;

        let mut corners = [Vec3::ZERO; 4];
        for (corner, (sx, sy)) in corners
            .iter_mut()
            .zip([(-1.0, 1.0), (1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)])
        {
            let dir = forward + right * (sx * tan_h) + up * (sy * tan_v);
            if dir.z >= 0.0 {
                return None;
            }
            let t = (floor_z - camera.location.z) / dir.z;
            *corner = camera.location + dir * t;
        }
        Some(corners)
    }

    /// Frustum corners in the view's UV space.
    #[must_use]
    pub fn project(
        view: &ViewFrame,
        camera: &CameraPose,
        floor_distance: f32,
        circular: bool,
    ) -> Option<[Vec2; 4]> {
        let corners = Self::floor_corners(camera, floor_distance)?;
        Some(corners.map(|corner| view.world_to_view(corner, circular).uv))
    }
}

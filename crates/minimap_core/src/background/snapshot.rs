//! Top-down scene capture seam.
//!
//! The engine owns the actual renderer; backgrounds only describe what to
//! capture and keep the returned texture.

use minimap_shared::{TextureHandle, Vec3};

/// One orthographic top-down capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest<'a> {
    /// World position of the capture camera.
    pub center: Vec3,
    /// Yaw of the capture camera in degrees.
    pub yaw: f32,
    /// Half-width of the square orthographic footprint.
    pub radius: f32,
    /// Square pixel size of the capture.
    pub resolution: u32,
    /// Target to reuse, if the level already has one.
    pub target: Option<TextureHandle>,
    /// Entities excluded from the capture.
    pub hidden: &'a [u64],
}

/// Renders scene captures for backgrounds without static textures.
pub trait SceneSnapshot {
    /// Captures the scene.
    ///
    /// # Returns
    ///
    /// The texture holding the capture, or None if nothing was rendered.
    fn capture(&mut self, request: &CaptureRequest<'_>) -> Option<TextureHandle>;
}

/// Owned copy of a [`CaptureRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCapture {
    /// Camera position.
    pub center: Vec3,
    /// Camera yaw.
    pub yaw: f32,
    /// Footprint half-width.
    pub radius: f32,
    /// Pixel size.
    pub resolution: u32,
    /// Hidden entity ids.
    pub hidden: Vec<u64>,
}

/// In-memory [`SceneSnapshot`] that records every request.
///
/// Hands out fresh square textures, or reuses the request's target.
#[derive(Debug, Default)]
pub struct RecordingSnapshot {
    requests: Vec<RecordedCapture>,
    next_id: u32,
}

impl RecordingSnapshot {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request seen so far.
    #[must_use]
    pub fn requests(&self) -> &[RecordedCapture] {
        &self.requests
    }
}

impl SceneSnapshot for RecordingSnapshot {
    fn capture(&mut self, request: &CaptureRequest<'_>) -> Option<TextureHandle> {
        self.requests.push(RecordedCapture {
            center: request.center,
            yaw: request.yaw,
            radius: request.radius,
            resolution: request.resolution,
            hidden: request.hidden.to_vec(),
        });

        let target = request.target.unwrap_or_else(|| {
            self.next_id += 1;
            TextureHandle::new(0x1000 + self.next_id, request.resolution, request.resolution)
        });
        Some(target)
    }
}

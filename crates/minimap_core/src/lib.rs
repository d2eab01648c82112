//! # MINIMAP Core Engine
//!
//! View transform and fog/reveal engine for a real-time 2D minimap:
//! - World <-> map projection under fixed or inherited-yaw rotation
//! - Height-banded background areas with priority tie-breaking
//! - Double-buffered fog of war with rate-limited GPU readback
//!
//! ## Architecture Rules
//!
//! 1. **Lazy caches** - Transforms, background levels and fog reads are
//!    recomputed only when their input changed or their lifetime expired
//! 2. **Push, never poll** - Registry changes reach caches through channels
//! 3. **Queries never fail loudly** - Missing data means "not visible"
//!
//! ```text
//!   Tracker ──► MapView ──► ViewFrame ──────────────► UVs
//!      │           └──────► BackgroundIndex ───────► active priority / level
//!      └──► FogArea ──► FogBuffer (A/B + staging) ──► reveal factor
//!              ▲
//!           Revealer stamps
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use minimap_core::{Tracker, MapView, ViewFrame, RotationPolicy};
//!
//! let mut tracker = Tracker::default();
//! let view = tracker.register_view(MapView::new(
//!     ViewFrame::new(Vec2::splat(1024.0), RotationPolicy::InheritYaw { offset: 90.0 }),
//!     0.05,
//! ))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod background;
pub mod clock;
pub mod config;
pub mod error;
pub mod fog;
pub mod icon;
pub mod level;
pub mod memory;
pub mod tracker;
pub mod view;

pub use background::{
    BackgroundEvent, BackgroundId, BackgroundIndex, BackgroundInteraction, BackgroundLevel,
    BackgroundVolume, CaptureRequest, RecordingSnapshot, SceneSnapshot,
};
pub use clock::{ManualClock, SimClock, SystemClock};
pub use config::{BackgroundConfig, CacheConfig, FogConfig, FogOpacity, TrackerConfig, ViewConfig};
pub use error::{MinimapError, MinimapResult};
pub use fog::{
    CombinePolicy, FogArea, FogBuffer, FogChannel, FogId, FogMaterial, GpuPaint, RenderTargetId,
    RevealMode, Revealer, RevealerId, SoftwarePainter,
};
pub use icon::{EdgeArrow, FogInteraction, IconEvent, IconId, IconSizeUnit, MapIcon};
pub use memory::{Arena, Handle};
pub use tracker::{EntryId, RegistryEvent, Tracker, ViewSearch};
pub use view::{
    CameraPose, MapView, RotationPolicy, ViewFrame, ViewFrustum, ViewId, ViewKind, ViewProjection,
};

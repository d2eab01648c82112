//! # MINIMAP
//!
//! Host-facing crate: settings and the per-widget session.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             MINIMAP SESSION                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐    │
//! │  │   shared        │     │   core          │     │   render        │    │
//! │  │                 │────>│                 │────>│                 │    │
//! │  │  • Vec2 / Vec3  │     │  • Tracker      │     │  • Placement    │    │
//! │  │  • Transform    │     │  • ViewFrame    │     │  • Compositor   │    │
//! │  │  • Colors       │     │  • Backgrounds  │     │  • DrawList     │    │
//! │  │  • Textures     │     │  • Fog buffers  │     │                 │    │
//! │  └─────────────────┘     └─────────────────┘     └─────────────────┘    │
//! │                                                                         │
//! │   host ──► SimClock / GpuPaint / SceneSnapshot ──► MinimapSession       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `settings`: TOML settings for every engine table
//! - `session`: Frame driver owning the registry and the injected backends

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod session;
pub mod settings;

// Re-export the layers
pub use minimap_core as core;
pub use minimap_render as render;
pub use minimap_shared as shared;

pub use session::{FrameStats, MinimapSession};
pub use settings::{MinimapSettings, SessionConfig, DEFAULT_FRAME_BUDGET_MS};

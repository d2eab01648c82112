//! # MINIMAP Render
//!
//! Frame composition for the minimap widget:
//! - Canvas placement and aspect-correct fitting
//! - A fixed-order draw list of plain commands
//! - Icon culling, edge arrows, hover and click handling
//!
//! ## Layer Order
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  fill                                        │
//! │  backgrounds (z-order, active priority)      │
//! │  icons under fog                             │
//! │  fog layers                                  │
//! │  icons above fog                             │
//! │  boundary (circle / rectangle)               │
//! │  frustum overlay                             │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The host renderer owns textures and pipelines; this crate only decides
//! what goes where.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod compositor;
pub mod layout;
pub mod render;

pub use compositor::{Compositor, CompositorConfig, MapEvent};
pub use layout::{fit_aspect, CanvasPlacement, HorizontalAlignment, Rect, VerticalAlignment};
pub use render::{DrawCommand, DrawLayer, DrawList, DrawVertex};

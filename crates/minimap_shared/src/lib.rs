//! # MINIMAP Shared Types
//!
//! Types used by every layer of the minimap engine.
//!
//! - `math`: vectors, rotators and owner transforms
//! - `color`: linear colors and fog channel masks
//! - `texture`: opaque handles to GPU textures and render targets
//! - `constants`: default tuning values

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod color;
pub mod constants;
pub mod math;
pub mod texture;

pub use color::{ChannelMask, LinearColor};
pub use math::{Rotator, Transform, Vec2, Vec3};
pub use texture::TextureHandle;

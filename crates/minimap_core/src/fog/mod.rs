//! # Fog of War
//!
//! - **gpu**: the paint/readback seam
//! - **software**: CPU implementation of that seam
//! - **buffer**: double-buffered accumulation and cached readback
//! - **revealer**: revealer state and stamp geometry
//! - **area**: a fog region tying the above together

mod area;
mod buffer;
mod gpu;
mod revealer;
mod software;

pub use area::FogArea;
pub use buffer::{BufferRole, CombinePolicy, FogBuffer, FogChannel, FogPhase};
pub use gpu::{FogMaterial, GpuPaint, PaintQuad, PaintVertex, RenderTargetId};
pub use revealer::{compute_shape, RevealMode, RevealShape, Revealer};
pub use software::{falloff, SoftwarePainter};

use crate::memory::Handle;

/// Handle to a registered fog area.
pub type FogId = Handle<FogArea>;

/// Handle to a registered revealer.
pub type RevealerId = Handle<Revealer>;

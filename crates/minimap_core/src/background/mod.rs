//! # Background Areas
//!
//! - **volume**: world regions with per-level background textures
//! - **index**: per-view active priority and level cache
//! - **snapshot**: top-down scene capture seam

mod index;
mod snapshot;
mod volume;

pub use index::{BackgroundIndex, BackgroundInteraction};
pub use snapshot::{CaptureRequest, RecordedCapture, RecordingSnapshot, SceneSnapshot};
pub use volume::{BackgroundEvent, BackgroundLevel, BackgroundVolume};

use crate::memory::Handle;

/// Handle to a registered background area.
pub type BackgroundId = Handle<BackgroundVolume>;
